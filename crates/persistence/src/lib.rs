//! Persistence layer for the warehouse audit trail.
//!
//! This crate contains:
//! - Database connection management
//! - Storage backends (PostgreSQL and in-memory) behind the `AuditBackend` trait
//! - The lazily initialized storage adapter (`AuditStore`)
//! - The audit writer/reader (`AuditLogRepository`)

pub mod backends;
pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use store::{AuditStore, RetryPolicy, StoreState};
