//! PostgreSQL audit backend.
//!
//! Entries live in one table with JSONB state columns. PostgreSQL has no
//! native TTL, so the retention index is a plain ascending index on
//! `timestamp` and expiry is carried out by [`AuditBackend::purge_expired`].

use chrono::{DateTime, Utc};
use domain::models::{AuditEntry, AuditLogQuery, NewAuditEntry};
use shared::validation::validate_identifier;
use sqlx::PgPool;
use tracing::debug;

use super::{AuditBackend, IndexSpec};
use crate::entities::audit_log::{AuditLogEntity, AUDIT_LOG_COLUMNS};
use crate::error::StoreError;
use crate::metrics::QueryTimer;

/// Default audit table name.
pub const DEFAULT_TABLE: &str = "audit_logs";

/// Rows deleted per purge statement.
const PURGE_BATCH_SIZE: i64 = 10_000;

/// Escape LIKE metacharacters and wrap the term for a substring match.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Condition matching when any scalar leaf of a JSONB column contains the
/// pattern bound at `$n`. Object keys and JSON nulls never match.
fn json_leaf_condition(column: &str, n: usize) -> String {
    format!(
        "EXISTS (SELECT 1 FROM jsonb_path_query({column}, 'strict $.**') AS leaf \
         WHERE jsonb_typeof(leaf) NOT IN ('object', 'array', 'null') \
         AND leaf #>> '{{}}' ILIKE ${n})"
    )
}

/// Helper struct for building dynamic WHERE clauses from audit log filters.
/// Tracks conditions and parameter positions so the find and count
/// statements bind identically.
struct AuditLogFilterBuilder {
    conditions: Vec<String>,
    param_count: usize,
}

impl AuditLogFilterBuilder {
    fn build(query: &AuditLogQuery) -> Self {
        let mut filter = Self {
            conditions: Vec::new(),
            param_count: 0,
        };

        if query.entity_type.is_some() {
            filter.push(|n| format!("entity_type = ${}", n));
        }
        if query.entity_id.is_some() {
            filter.push(|n| format!("entity_id = ${}", n));
        }
        if query.action.is_some() {
            filter.push(|n| format!("action = ${}", n));
        }
        if query.user_id.is_some() {
            filter.push(|n| format!("user_id = ${}", n));
        }
        if query.start_date.is_some() {
            filter.push(|n| format!("timestamp >= ${}", n));
        }
        if query.end_date.is_some() {
            filter.push(|n| format!("timestamp <= ${}", n));
        }
        if query.search.is_some() {
            filter.push(|n| {
                format!(
                    "({} OR {} OR {} OR path ILIKE ${n})",
                    json_leaf_condition("before", n),
                    json_leaf_condition("after", n),
                    json_leaf_condition("metadata", n),
                )
            });
        }

        filter
    }

    fn push(&mut self, condition: impl FnOnce(usize) -> String) {
        self.param_count += 1;
        self.conditions.push(condition(self.param_count));
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            "TRUE".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    fn param_count(&self) -> usize {
        self.param_count
    }
}

/// Bind the optional filter values in the order `AuditLogFilterBuilder`
/// numbered them.
macro_rules! bind_query_filters {
    ($builder:expr, $query:expr, $pattern:expr) => {{
        let mut b = $builder;
        if let Some(ref entity_type) = $query.entity_type {
            b = b.bind(entity_type);
        }
        if let Some(ref entity_id) = $query.entity_id {
            b = b.bind(entity_id);
        }
        if let Some(ref action) = $query.action {
            b = b.bind(action);
        }
        if let Some(ref user_id) = $query.user_id {
            b = b.bind(user_id);
        }
        if let Some(start) = $query.start_date {
            b = b.bind(start);
        }
        if let Some(end) = $query.end_date {
            b = b.bind(end);
        }
        if let Some(ref pattern) = $pattern {
            b = b.bind(pattern);
        }
        b
    }};
}

/// Audit backend storing entries in PostgreSQL.
#[derive(Clone)]
pub struct PgAuditBackend {
    pool: PgPool,
    table: String,
}

impl PgAuditBackend {
    /// Backend over the default `audit_logs` table.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Backend over a custom table. The name must be a plain identifier.
    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        validate_identifier(&table)
            .map_err(|_| StoreError::Unavailable(format!("invalid audit table name '{}'", table)))?;
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                correlation_id TEXT,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                action TEXT NOT NULL,
                user_id TEXT,
                user_email TEXT,
                ip_address TEXT,
                method TEXT,
                path TEXT,
                before JSONB,
                after JSONB,
                metadata JSONB
            )
            "#,
            table = self.table
        )
    }

    fn create_index_sql(&self, spec: &IndexSpec) -> String {
        let keys = spec
            .keys
            .iter()
            .map(|key| format!("{} {}", key.field, key.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE INDEX IF NOT EXISTS {table}_{name} ON {table} ({keys})",
            table = self.table,
            name = spec.name,
            keys = keys
        )
    }
}

#[async_trait::async_trait]
impl AuditBackend for PgAuditBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn prepare(&self) -> Result<(), StoreError> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        if let Some(ttl) = spec.expire_after_secs {
            debug!(
                index = spec.name,
                expire_after_secs = ttl,
                "Retention enforced by periodic sweep"
            );
        }
        sqlx::query(&self.create_index_sql(spec))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert(
        &self,
        entry: NewAuditEntry,
        timestamp: DateTime<Utc>,
    ) -> Result<AuditEntry, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                timestamp, correlation_id, entity_type, entity_id, action,
                user_id, user_email, ip_address, method, path,
                before, after, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            self.table, AUDIT_LOG_COLUMNS
        );

        let timer = QueryTimer::new("audit_insert");
        let entity = sqlx::query_as::<_, AuditLogEntity>(&sql)
            .bind(timestamp)
            .bind(&entry.correlation_id)
            .bind(&entry.entity_type)
            .bind(&entry.entity_id)
            .bind(&entry.action)
            .bind(&entry.user_id)
            .bind(&entry.user_email)
            .bind(&entry.ip_address)
            .bind(&entry.method)
            .bind(&entry.path)
            .bind(&entry.before)
            .bind(&entry.after)
            .bind(&entry.metadata)
            .fetch_one(&self.pool)
            .await;
        timer.record();

        Ok(entity?.into())
    }

    async fn find(&self, query: &AuditLogQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let filter = AuditLogFilterBuilder::build(query);
        let pattern = query.search.as_deref().map(like_pattern);
        let param_count = filter.param_count();

        let sql = format!(
            r#"
            SELECT {}
            FROM {}
            WHERE {}
            ORDER BY timestamp DESC, id DESC
            LIMIT ${} OFFSET ${}
            "#,
            AUDIT_LOG_COLUMNS,
            self.table,
            filter.where_clause(),
            param_count + 1,
            param_count + 2
        );

        let timer = QueryTimer::new("audit_find");
        let builder = sqlx::query_as::<_, AuditLogEntity>(&sql);
        let builder = bind_query_filters!(builder, query, pattern);
        let entities = builder
            .bind(i64::from(query.limit))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok(entities?.into_iter().map(AuditEntry::from).collect())
    }

    async fn count(&self, query: &AuditLogQuery) -> Result<u64, StoreError> {
        let filter = AuditLogFilterBuilder::build(query);
        let pattern = query.search.as_deref().map(like_pattern);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            self.table,
            filter.where_clause()
        );

        let timer = QueryTimer::new("audit_count");
        let builder = sqlx::query_scalar::<_, i64>(&sql);
        let builder = bind_query_filters!(builder, query, pattern);
        let total = builder.fetch_one(&self.pool).await;
        timer.record();

        Ok(u64::try_from(total?).unwrap_or_default())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let sql = format!(
            r#"
            WITH to_delete AS (
                SELECT id FROM {table}
                WHERE timestamp < $1
                LIMIT $2
            )
            DELETE FROM {table}
            WHERE id IN (SELECT id FROM to_delete)
            "#,
            table = self.table
        );

        let mut total_deleted: u64 = 0;
        loop {
            let result = sqlx::query(&sql)
                .bind(cutoff)
                .bind(PURGE_BATCH_SIZE)
                .execute(&self.pool)
                .await?;

            let deleted = result.rows_affected();
            total_deleted += deleted;

            if deleted < PURGE_BATCH_SIZE as u64 {
                break;
            }

            tokio::task::yield_now().await;
        }

        Ok(total_deleted)
    }

    fn pool(&self) -> Option<&PgPool> {
        Some(&self.pool)
    }
}
