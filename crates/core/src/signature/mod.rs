//! Electronic signature verification.
//!
//! The verifier itself is an external collaborator; this module defines its
//! contract and reduces its report to the snapshot stored on a revocation
//! request.

mod types;
mod verifier;

pub use types::{EmbeddedSignature, SignatureStatus, SignatureVerification, Signer, VerificationReport};
pub use verifier::{SignatureError, SignatureVerifier};
