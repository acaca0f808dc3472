//! Domain models for the warehouse audit trail.

pub mod audit_log;
pub mod user;

pub use audit_log::{
    AuditAction, AuditEntry, AuditLogPage, AuditLogQuery, AuditedEntity, ListAuditLogsParams,
    NewAuditEntry, AUDIT_RETENTION_DAYS, AUDIT_RETENTION_SECS,
};
pub use user::UserRole;
