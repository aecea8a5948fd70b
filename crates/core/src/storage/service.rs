//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use opendal::{Operator, services};
use uchwala_shared::StorageProvider;
use uchwala_shared::types::{BusinessProfileId, RevocationRequestId};
use uuid::Uuid;

use super::config::{DocumentKind, StorageConfig};
use super::error::StorageError;

/// Identifies where a revocation document lives.
#[derive(Debug, Clone)]
pub struct DocumentKey {
    /// Owning business profile.
    pub business_profile_id: BusinessProfileId,
    /// Revocation request the document belongs to.
    pub request_id: RevocationRequestId,
    /// Distinguishes successive uploads to the same request.
    pub upload_id: Uuid,
    /// Original filename.
    pub filename: String,
}

impl DocumentKey {
    /// Key for a new upload; every call yields a distinct object.
    #[must_use]
    pub fn new(
        business_profile_id: BusinessProfileId,
        request_id: RevocationRequestId,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            business_profile_id,
            request_id,
            upload_id: Uuid::now_v7(),
            filename: filename.into(),
        }
    }
}

/// A document written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key.
    pub key: String,
    /// URL handed out to clients.
    pub url: String,
    /// Canonical MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Storage service for revocation documents.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider.name())
            .field("bucket", &self.config.provider.bucket())
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder).map(opendal::OperatorBuilder::finish)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                Operator::new(builder).map(opendal::OperatorBuilder::finish)
            }
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root))
                    .map(opendal::OperatorBuilder::finish)
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Validates a document against size, type and content rules.
    ///
    /// Returns the canonical document kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is empty, too large, of a
    /// disallowed type, or its bytes contradict the declared type.
    pub fn validate_document(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<DocumentKind, StorageError> {
        let size = content.len() as u64;
        if size == 0 {
            return Err(StorageError::Empty);
        }
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }

        let declared = DocumentKind::from_mime_type(content_type)
            .ok_or_else(|| StorageError::invalid_mime_type(content_type))?;

        if DocumentKind::sniff(content) != Some(declared) {
            return Err(StorageError::ContentMismatch {
                declared: declared.mime_type().to_string(),
            });
        }

        Ok(declared)
    }

    /// Generate storage key for a document.
    ///
    /// Format: `{business_profile_id}/revocations/{request_id}/{upload_id}/{sanitized_filename}`
    #[must_use]
    pub fn generate_storage_key(key: &DocumentKey) -> String {
        format!(
            "{}/revocations/{}/{}/{}",
            key.business_profile_id,
            key.request_id,
            key.upload_id,
            sanitize_filename(&key.filename)
        )
    }

    /// Validates and writes a document, returning where it can be fetched.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the underlying storage failure.
    pub async fn put_document(
        &self,
        key: &DocumentKey,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let kind = self.validate_document(content_type, &content)?;
        let storage_key = Self::generate_storage_key(key);
        let size = content.len() as u64;

        let mut write = self.operator.write_with(&storage_key, content);
        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            write = write.content_type(kind.mime_type());
        }
        write.await?;

        let url = self.url_for(&storage_key).await?;

        Ok(StoredObject {
            key: storage_key,
            url,
            content_type: kind.mime_type().to_string(),
            size,
        })
    }

    /// Reads a document back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let buffer = self.operator.read(key).await?;
        Ok(buffer.to_vec())
    }

    /// Delete a file from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Check if a file exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.stat(key).await.is_ok()
    }

    /// URL for a stored key.
    ///
    /// Uses the public base URL when configured, a `file://` URL for the
    /// local provider, and a presigned read URL otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if presigning fails.
    pub async fn url_for(&self, key: &str) -> Result<String, StorageError> {
        if let Some(base) = &self.config.public_base_url {
            return Ok(format!("{base}/{key}"));
        }

        if let StorageProvider::LocalFs { root } = &self.config.provider {
            return Ok(format!("file://{}", root.join(key).display()));
        }

        let ttl = Duration::from_secs(self.config.presign_download_ttl_secs);
        let presigned = self.operator.presign_read(key, ttl).await?;
        Ok(presigned.uri().to_string())
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

/// Sanitize filename for storage key.
///
/// Only ASCII alphanumerics, dots, hyphens and underscores survive; a name
/// that sanitizes to nothing becomes `document`.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF";

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("uchwala-storage-{}", Uuid::new_v4()))
    }

    fn local_service(root: PathBuf) -> StorageService {
        StorageService::from_config(StorageConfig::new(StorageProvider::LocalFs { root }))
            .expect("should create service")
    }

    fn document_key(filename: &str) -> DocumentKey {
        DocumentKey {
            business_profile_id: BusinessProfileId::from_uuid(
                Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").expect("valid uuid"),
            ),
            request_id: RevocationRequestId::from_uuid(
                Uuid::parse_str("6ba7b811-9dad-11d1-80b4-00c04fd430c8").expect("valid uuid"),
            ),
            upload_id: Uuid::parse_str("01890a5d-ac96-774b-bcce-b302099a8057").expect("valid uuid"),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("uchwala.pdf"), "uchwala.pdf");
        assert_eq!(sanitize_filename("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\skan.png"), "skan.png");
        assert_eq!(sanitize_filename("uchwała.pdf"), "uchwa_a.pdf");
        assert_eq!(sanitize_filename(".."), "document");
        assert_eq!(sanitize_filename(""), "document");
    }

    #[test]
    fn test_generate_storage_key() {
        let key = StorageService::generate_storage_key(&document_key("odwolanie.pdf"));
        assert_eq!(
            key,
            "550e8400-e29b-41d4-a716-446655440000/revocations/\
             6ba7b811-9dad-11d1-80b4-00c04fd430c8/\
             01890a5d-ac96-774b-bcce-b302099a8057/odwolanie.pdf"
        );
    }

    #[test]
    fn test_same_filename_gets_distinct_keys() {
        let bp = BusinessProfileId::new();
        let request = RevocationRequestId::new();

        let first = StorageService::generate_storage_key(&DocumentKey::new(bp, request, "a.pdf"));
        let second = StorageService::generate_storage_key(&DocumentKey::new(bp, request, "a.pdf"));

        assert_ne!(first, second);
        assert!(first.ends_with("/a.pdf") && second.ends_with("/a.pdf"));
    }

    #[test]
    fn test_validate_document_size() {
        let config = StorageConfig::new(StorageProvider::LocalFs {
            root: "./test".into(),
        })
        .with_max_file_size(16);
        let service = StorageService::from_config(config).expect("should create service");

        assert!(service.validate_document("application/pdf", b"%PDF-1.4").is_ok());
        assert!(matches!(
            service.validate_document("application/pdf", PDF),
            Err(StorageError::FileTooLarge { .. })
        ));
        assert!(matches!(
            service.validate_document("application/pdf", b""),
            Err(StorageError::Empty)
        ));
    }

    #[test]
    fn test_validate_document_type() {
        let service = local_service("./test".into());

        assert_eq!(
            service.validate_document("application/pdf", PDF).unwrap(),
            DocumentKind::Pdf
        );
        assert!(matches!(
            service.validate_document("application/msword", PDF),
            Err(StorageError::InvalidMimeType { .. })
        ));
        assert!(matches!(
            service.validate_document("image/png", PDF),
            Err(StorageError::ContentMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_put_read_delete_roundtrip_on_local_fs() {
        let root = temp_root();
        let service = local_service(root.clone());
        let key = document_key("odwolanie.pdf");

        let stored = service
            .put_document(&key, "application/pdf", PDF.to_vec())
            .await
            .expect("should store document");

        assert_eq!(stored.size, PDF.len() as u64);
        assert_eq!(stored.content_type, "application/pdf");
        assert!(stored.url.starts_with("file://"));
        assert!(stored.url.ends_with("odwolanie.pdf"));
        assert!(service.exists(&stored.key).await);

        let content = service.read(&stored.key).await.expect("should read back");
        assert_eq!(content, PDF);

        service.delete(&stored.key).await.expect("should delete");
        assert!(!service.exists(&stored.key).await);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_public_base_url_used_when_configured() {
        let root = temp_root();
        let config = StorageConfig::new(StorageProvider::LocalFs { root: root.clone() })
            .with_public_base_url("https://cdn.example.com/docs");
        let service = StorageService::from_config(config).expect("should create service");

        let url = service.url_for("a/b.pdf").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/docs/a/b.pdf");

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_read_missing_key() {
        let root = temp_root();
        let service = local_service(root.clone());

        assert!(matches!(
            service.read("missing/file.pdf").await,
            Err(StorageError::NotFound { .. })
        ));

        let _ = std::fs::remove_dir_all(root);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_sanitized_filename_safe_chars(filename in ".*") {
            let sanitized = sanitize_filename(&filename);

            prop_assert!(!sanitized.is_empty());
            for c in sanitized.chars() {
                let is_safe = c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_';
                prop_assert!(is_safe, "Unexpected character in sanitized filename: {}", c);
            }
        }

        #[test]
        fn prop_file_size_validation(
            max_size in 1024u64..65_536,
            file_size in 1usize..131_072,
        ) {
            let config = StorageConfig::new(StorageProvider::LocalFs { root: "./test".into() })
                .with_max_file_size(max_size);
            let service = StorageService::from_config(config).expect("should create service");

            let mut content = b"%PDF-1.7\n".to_vec();
            content.resize(file_size.max(content.len()), b' ');
            let result = service.validate_document("application/pdf", &content);

            if content.len() as u64 <= max_size {
                prop_assert!(result.is_ok(), "Expected Ok for valid file size");
            } else {
                let is_too_large = matches!(result, Err(StorageError::FileTooLarge { .. }));
                prop_assert!(is_too_large, "Expected FileTooLarge error");
            }
        }
    }
}
