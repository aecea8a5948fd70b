//! HTTP client for the signature verification service.
//!
//! The service takes the raw document as the request body, with its MIME
//! type in `Content-Type`, and answers with a [`VerificationReport`].

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use tracing::{debug, warn};

use uchwala_core::signature::{SignatureError, SignatureVerifier, VerificationReport};
use uchwala_shared::config::VerifierConfig;

/// Signature verifier reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSignatureVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpSignatureVerifier {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SignatureError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignatureError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            verify_url: format!("{}/verify", base_url.trim_end_matches('/')),
        })
    }

    /// Creates a client from the `[verifier]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, SignatureError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Full URL documents are posted to.
    #[must_use]
    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }
}

impl SignatureVerifier for HttpSignatureVerifier {
    async fn verify(
        &self,
        content: Vec<u8>,
        content_type: String,
    ) -> Result<VerificationReport, SignatureError> {
        let size = content.len();
        let response = self
            .client
            .post(&self.verify_url)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %self.verify_url, "Signature verifier unreachable");
                SignatureError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignatureError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(SignatureError::Unavailable(format!(
                "verifier returned {status}"
            )));
        }

        let report: VerificationReport = response
            .json()
            .await
            .map_err(|e| SignatureError::InvalidResponse(e.to_string()))?;

        debug!(
            size,
            signatures = report.signatures.len(),
            "Signature verifier report received"
        );
        Ok(report)
    }
}
