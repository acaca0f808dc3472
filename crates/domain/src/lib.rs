//! Domain layer for the warehouse audit trail.
//!
//! This crate contains:
//! - Audit entry, query and role models
//! - The request audit context and entry helpers used by business handlers
//! - The `AuditWriter` seam implemented by the persistence layer

pub mod models;
pub mod services;
