//! Decision revocation workflow.
//!
//! A revocation request moves a decision from `active` to `revoked` through
//! document upload, signature verification and a quorum of approvals. The
//! request's status is projected onto the decision in the same write.

mod engine;
mod error;
mod projector;
mod service;
mod store;
mod types;

#[cfg(test)]
mod engine_props;

pub use engine::RevocationEngine;
pub use error::RevocationError;
pub use projector::project;
pub use service::{CreateRevocationInput, DocumentUpload, RevocationService};
pub use store::RevocationStore;
pub use types::{
    Approval, DocumentRef, NewRevocationRequest, RevocationAction, RevocationRequest,
    RevocationStatus, Transition,
};
