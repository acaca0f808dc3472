//! Custom Axum extractors.

pub mod audit_context;

pub use audit_context::RequestAuditContext;
