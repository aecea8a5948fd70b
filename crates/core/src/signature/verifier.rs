//! Signature verifier contract.

use std::future::Future;

use thiserror::Error;

use super::types::VerificationReport;

/// Errors reported by a signature verifier.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The verifier could not be reached or timed out.
    #[error("signature verifier unavailable: {0}")]
    Unavailable(String),

    /// The verifier answered with something that is not a report.
    #[error("invalid verifier response: {0}")]
    InvalidResponse(String),

    /// The verifier refused the document.
    #[error("document rejected by verifier: {0}")]
    Rejected(String),
}

/// Inspects a document for embedded electronic signatures.
///
/// Implemented by the api crate on top of an HTTP verification service.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signatures embedded in `content`.
    fn verify(
        &self,
        content: Vec<u8>,
        content_type: String,
    ) -> impl Future<Output = Result<VerificationReport, SignatureError>> + Send;
}
