//! Document storage using Apache OpenDAL.
//!
//! Revocation documents are written once and read back for signature
//! verification. Supported backends:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! Keys have the shape
//! `{business_profile_id}/revocations/{request_id}/{upload_id}/{sanitized_filename}`,
//! so a new upload never overwrites the object a request still points to.

mod config;
mod error;
mod service;

pub use config::{DocumentKind, StorageConfig};
pub use error::StorageError;
pub use service::{DocumentKey, StorageService, StoredObject};
pub use uchwala_shared::StorageProvider;
