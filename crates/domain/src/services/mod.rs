//! Domain services for the warehouse audit trail.

pub mod audit;

pub use audit::{action_for_operation, audit_helpers, AuditContext, AuditWriter};
