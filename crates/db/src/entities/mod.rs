//! `SeaORM` entities.

pub mod decisions;
pub mod revocation_requests;
pub mod sea_orm_active_enums;
