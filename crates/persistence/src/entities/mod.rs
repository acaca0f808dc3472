//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod audit_log;

pub use audit_log::AuditLogEntity;
