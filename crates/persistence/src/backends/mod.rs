//! Storage backends for audit entries.
//!
//! A backend owns the physical collection. Readiness, retries and failure
//! policy live in [`crate::store::AuditStore`]; backends only execute.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use domain::models::{AuditEntry, AuditLogQuery, NewAuditEntry, AUDIT_RETENTION_SECS};
use sqlx::PgPool;

use crate::error::StoreError;

pub use memory::{FaultConfig, InMemoryAuditBackend};
pub use postgres::PgAuditBackend;

/// Key ordering within an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One key of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKey {
    pub field: &'static str,
    pub direction: SortDirection,
}

const fn asc(field: &'static str) -> IndexKey {
    IndexKey {
        field,
        direction: SortDirection::Ascending,
    }
}

const fn desc(field: &'static str) -> IndexKey {
    IndexKey {
        field,
        direction: SortDirection::Descending,
    }
}

/// Declarative index definition applied during store initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    /// Suffix appended to the collection name.
    pub name: &'static str,
    pub keys: &'static [IndexKey],
    /// Entries expire this many seconds after their indexed timestamp.
    pub expire_after_secs: Option<u64>,
}

/// Indexes and retention policy of the audit collection.
pub const AUDIT_INDEXES: &[IndexSpec] = &[
    IndexSpec {
        name: "entity_idx",
        keys: &[asc("entity_type"), asc("entity_id"), desc("timestamp")],
        expire_after_secs: None,
    },
    IndexSpec {
        name: "user_idx",
        keys: &[asc("user_id"), desc("timestamp")],
        expire_after_secs: None,
    },
    IndexSpec {
        name: "action_idx",
        keys: &[asc("action"), desc("timestamp")],
        expire_after_secs: None,
    },
    IndexSpec {
        name: "correlation_idx",
        keys: &[asc("correlation_id")],
        expire_after_secs: None,
    },
    IndexSpec {
        name: "timestamp_idx",
        keys: &[desc("timestamp")],
        expire_after_secs: None,
    },
    IndexSpec {
        name: "retention_idx",
        keys: &[asc("timestamp")],
        expire_after_secs: Some(AUDIT_RETENTION_SECS),
    },
];

/// Physical storage for audit entries.
#[async_trait::async_trait]
pub trait AuditBackend: Send + Sync {
    /// Backend label for logs and health output.
    fn name(&self) -> &'static str;

    /// Acquire the collection, creating it when absent.
    async fn prepare(&self) -> Result<(), StoreError>;

    /// Create one index. Existing indexes are not an error.
    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError>;

    /// Insert an entry with its final timestamp and return the stored form.
    async fn insert(
        &self,
        entry: NewAuditEntry,
        timestamp: DateTime<Utc>,
    ) -> Result<AuditEntry, StoreError>;

    /// Matching entries, newest first, restricted to the query's page.
    async fn find(&self, query: &AuditLogQuery) -> Result<Vec<AuditEntry>, StoreError>;

    /// Number of entries matching the query's filters, ignoring pagination.
    async fn count(&self, query: &AuditLogQuery) -> Result<u64, StoreError>;

    /// Delete entries with a timestamp strictly before `cutoff`.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Connection pool, for backends that have one.
    fn pool(&self) -> Option<&PgPool> {
        None
    }
}
