//! Audit log entity.

use chrono::{DateTime, Utc};
use domain::models::AuditEntry;
use sqlx::FromRow;
use uuid::Uuid;

/// Column list shared by every audit log SELECT/RETURNING clause.
pub const AUDIT_LOG_COLUMNS: &str = "id, timestamp, correlation_id, entity_type, entity_id, \
     action, user_id, user_email, ip_address, method, path, before, after, metadata";

/// Database entity for audit logs.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntity {
    /// Unique identifier, assigned by the database.
    pub id: Uuid,

    /// When the audited operation happened.
    pub timestamp: DateTime<Utc>,

    /// Groups entries produced by one request.
    pub correlation_id: Option<String>,

    /// Type of the affected business entity.
    pub entity_type: String,

    /// Identifier of the affected business entity.
    pub entity_id: String,

    /// Action performed (CREATE, UPDATE, DELETE, DOMAIN_EVENT).
    pub action: String,

    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub ip_address: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,

    /// Entity state before the operation.
    pub before: Option<serde_json::Value>,

    /// Entity state after the operation.
    pub after: Option<serde_json::Value>,

    /// Free-form operation context.
    pub metadata: Option<serde_json::Value>,
}

impl From<AuditLogEntity> for AuditEntry {
    fn from(entity: AuditLogEntity) -> Self {
        AuditEntry {
            id: entity.id,
            timestamp: entity.timestamp,
            correlation_id: entity.correlation_id,
            entity_type: entity.entity_type,
            entity_id: entity.entity_id,
            action: entity.action,
            user_id: entity.user_id,
            user_email: entity.user_email,
            ip_address: entity.ip_address,
            method: entity.method,
            path: entity.path,
            before: entity.before,
            after: entity.after,
            metadata: entity.metadata,
        }
    }
}
