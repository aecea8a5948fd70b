//! Revocation service: loads requests, runs engine transitions and persists
//! them together with the document store and signature verifier.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uchwala_shared::types::{BusinessProfileId, DecisionId, RevocationRequestId, UserId};

use super::engine::RevocationEngine;
use super::error::RevocationError;
use super::store::RevocationStore;
use super::types::{
    DocumentRef, NewRevocationRequest, RevocationAction, RevocationRequest, Transition,
};
use crate::signature::{SignatureVerification, SignatureVerifier};
use crate::storage::{DocumentKey, StorageService};

/// A document received from a client.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Client-supplied filename.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File content.
    pub content: Vec<u8>,
}

/// Input for opening a revocation request.
#[derive(Debug, Clone)]
pub struct CreateRevocationInput {
    /// Tenant scope.
    pub business_profile_id: BusinessProfileId,
    /// Decision to revoke.
    pub decision_id: DecisionId,
    /// Justification.
    pub reason: String,
    /// Who opens the request.
    pub requested_by: UserId,
    /// Approvers who must all sign off.
    pub required_approvers: Vec<UserId>,
    /// Revoking-resolution document, if already available.
    pub document: Option<DocumentUpload>,
}

/// Service for driving revocation requests.
pub struct RevocationService<S: RevocationStore, V: SignatureVerifier> {
    store: Arc<S>,
    storage: Arc<StorageService>,
    verifier: Arc<V>,
}

impl<S: RevocationStore, V: SignatureVerifier> RevocationService<S, V> {
    /// Create a new revocation service.
    #[must_use]
    pub fn new(store: Arc<S>, storage: Arc<StorageService>, verifier: Arc<V>) -> Self {
        Self {
            store,
            storage,
            verifier,
        }
    }

    /// Open a revocation request and mark the decision `revoke_requested`.
    ///
    /// The request is validated before any document is written. If the
    /// database write fails afterwards, the stored document is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Decision does not exist or cannot be revoked
    /// - Reason or approvers are missing
    /// - Document is rejected or storage fails
    /// - Database operation fails
    pub async fn create(
        &self,
        input: CreateRevocationInput,
    ) -> Result<RevocationRequest, RevocationError> {
        let decision = self
            .store
            .find_decision(input.business_profile_id, input.decision_id)
            .await?
            .ok_or(RevocationError::DecisionNotFound(input.decision_id))?;

        let now = Utc::now();
        let id = RevocationRequestId::new();
        let draft = RevocationEngine::create(
            &decision,
            NewRevocationRequest {
                id,
                decision_id: input.decision_id,
                business_profile_id: input.business_profile_id,
                reason: input.reason,
                requested_by: input.requested_by,
                required_approvers: input.required_approvers,
                document: None,
            },
            now,
        )?;

        let transition = match input.document {
            None => draft,
            Some(upload) => {
                let document = self
                    .store_document(input.business_profile_id, id, input.requested_by, upload)
                    .await?;
                let attached = RevocationEngine::attach_document(draft.request, document, now)?;
                Transition {
                    request: attached.request,
                    decision_status: draft.decision_status,
                }
            }
        };

        let stored_key = transition
            .request
            .document
            .as_ref()
            .map(|d| d.storage_key.clone());

        match self.store.insert(transition).await {
            Ok(request) => {
                info!(
                    revocation_id = %request.id,
                    decision_id = %request.decision_id,
                    status = %request.status,
                    "Revocation request created"
                );
                Ok(request)
            }
            Err(err) => {
                if let Some(key) = stored_key {
                    self.discard_document(&key).await;
                }
                Err(err)
            }
        }
    }

    /// Get a request by ID.
    ///
    /// # Errors
    ///
    /// Returns `RevocationError::NotFound` if it does not exist in the
    /// business profile.
    pub async fn get(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
    ) -> Result<RevocationRequest, RevocationError> {
        self.store
            .find(business_profile_id, id)
            .await?
            .ok_or(RevocationError::NotFound(id))
    }

    /// List the requests of a decision, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RevocationError::DecisionNotFound` if the decision does not
    /// exist in the business profile.
    pub async fn list_for_decision(
        &self,
        business_profile_id: BusinessProfileId,
        decision_id: DecisionId,
    ) -> Result<Vec<RevocationRequest>, RevocationError> {
        if self
            .store
            .find_decision(business_profile_id, decision_id)
            .await?
            .is_none()
        {
            return Err(RevocationError::DecisionNotFound(decision_id));
        }
        self.store
            .list_for_decision(business_profile_id, decision_id)
            .await
    }

    /// Attach or replace the revoking-resolution document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not awaiting a document, the
    /// document is rejected, storage fails, or the request changed
    /// concurrently.
    pub async fn upload_document(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
        uploaded_by: UserId,
        upload: DocumentUpload,
    ) -> Result<RevocationRequest, RevocationError> {
        let request = self.get(business_profile_id, id).await?;
        RevocationEngine::ensure_allowed(&request, RevocationAction::UploadDocument)?;

        let previous_key = request.document.as_ref().map(|d| d.storage_key.clone());
        let document = self
            .store_document(business_profile_id, id, uploaded_by, upload)
            .await?;
        let new_key = document.storage_key.clone();

        // The previous object stays in place until the new reference is committed.
        let transition = RevocationEngine::attach_document(request, document, Utc::now())?;
        match self.store.update(transition).await {
            Ok(request) => {
                if let Some(old) = previous_key {
                    self.discard_document(&old).await;
                }
                info!(revocation_id = %id, storage_key = %new_key, "Revocation document uploaded");
                Ok(request)
            }
            Err(err) => {
                self.discard_document(&new_key).await;
                Err(err)
            }
        }
    }

    /// Read the stored document, run it through the signature verifier and
    /// store the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not awaiting verification, the
    /// document cannot be read, or the verifier fails.
    pub async fn verify_document(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
    ) -> Result<RevocationRequest, RevocationError> {
        let request = self.get(business_profile_id, id).await?;
        let status = RevocationEngine::ensure_allowed(&request, RevocationAction::StoreVerification)?;
        let document = request.document.as_ref().ok_or_else(|| {
            RevocationError::invalid_transition(status, RevocationAction::StoreVerification)
        })?;

        let content = self.storage.read(&document.storage_key).await?;
        let report = self
            .verifier
            .verify(content, document.content_type.clone())
            .await?;
        let verification = SignatureVerification::from_report(&report, Utc::now());

        self.apply_verification(request, verification).await
    }

    /// Store an externally produced verification result.
    ///
    /// The snapshot is trusted as given; only the verification service may
    /// reach this.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not awaiting verification or the
    /// request changed concurrently.
    pub async fn store_verification(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
        verification: SignatureVerification,
    ) -> Result<RevocationRequest, RevocationError> {
        let request = self.get(business_profile_id, id).await?;
        self.apply_verification(request, verification).await
    }

    /// Record an approval; the last required approval revokes the decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not verified, the user is not a
    /// pending approver, or the document signature is not valid.
    pub async fn approve(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
        user_id: UserId,
        signature: Option<String>,
    ) -> Result<RevocationRequest, RevocationError> {
        let request = self.get(business_profile_id, id).await?;
        let transition = RevocationEngine::approve(request, user_id, signature, Utc::now())?;
        let request = self.store.update(transition).await?;

        info!(
            revocation_id = %id,
            approver = %user_id,
            status = %request.status,
            pending = request.pending_approvers().len(),
            "Revocation request approved by user"
        );
        Ok(request)
    }

    /// Reject the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not open or the user is not a
    /// required approver.
    pub async fn reject(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
        user_id: UserId,
        notes: Option<String>,
    ) -> Result<RevocationRequest, RevocationError> {
        let request = self.get(business_profile_id, id).await?;
        let transition = RevocationEngine::reject(request, user_id, notes, Utc::now())?;
        let request = self.store.update(transition).await?;

        info!(revocation_id = %id, rejected_by = %user_id, "Revocation request rejected");
        Ok(request)
    }

    /// Cancel the request, returning the decision to `active`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not open or the user is not the
    /// requester.
    pub async fn cancel(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
        user_id: UserId,
    ) -> Result<RevocationRequest, RevocationError> {
        let request = self.get(business_profile_id, id).await?;
        let transition = RevocationEngine::cancel(request, user_id, Utc::now())?;
        let request = self.store.update(transition).await?;

        info!(revocation_id = %id, cancelled_by = %user_id, "Revocation request cancelled");
        Ok(request)
    }

    async fn apply_verification(
        &self,
        request: RevocationRequest,
        verification: SignatureVerification,
    ) -> Result<RevocationRequest, RevocationError> {
        let id = request.id;
        let valid = verification.is_valid();
        let transition = RevocationEngine::record_verification(request, verification, Utc::now())?;
        let request = self.store.update(transition).await?;

        info!(
            revocation_id = %id,
            signature_valid = valid,
            status = %request.status,
            "Revocation document verified"
        );
        Ok(request)
    }

    async fn store_document(
        &self,
        business_profile_id: BusinessProfileId,
        request_id: RevocationRequestId,
        uploaded_by: UserId,
        upload: DocumentUpload,
    ) -> Result<DocumentRef, RevocationError> {
        let key = DocumentKey::new(business_profile_id, request_id, upload.filename.clone());
        let stored = self
            .storage
            .put_document(&key, &upload.content_type, upload.content)
            .await?;

        Ok(DocumentRef {
            url: stored.url,
            name: upload.filename,
            storage_key: stored.key,
            content_type: stored.content_type,
            size: stored.size,
            uploaded_by,
            uploaded_at: Utc::now(),
        })
    }

    async fn discard_document(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(storage_key = %key, error = %e, "Failed to remove orphaned revocation document");
        }
    }
}
