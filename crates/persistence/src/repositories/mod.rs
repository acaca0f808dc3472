//! Repository implementations for audit storage.

pub mod audit_log;

pub use audit_log::AuditLogRepository;
