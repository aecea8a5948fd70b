//! Core business logic for Uchwala.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence and signature verification are reached through traits that the
//! db and api crates implement.
//!
//! # Modules
//!
//! - `decision` - Corporate decisions (uchwały) and their lifecycle status
//! - `revocation` - Revocation request state machine, projector and service
//! - `signature` - Signature verifier contract and report reduction
//! - `storage` - Document storage on top of Apache OpenDAL

pub mod decision;
pub mod revocation;
pub mod signature;
pub mod storage;
