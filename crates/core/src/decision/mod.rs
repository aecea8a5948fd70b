//! Corporate decisions (uchwały).
//!
//! A decision is the record a revocation request targets. Its status is
//! owned by the revocation workflow once a revocation has been requested.

mod error;
mod types;

pub use error::DecisionError;
pub use types::{CreateDecisionInput, Decision, DecisionStatus};
