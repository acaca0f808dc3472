//! Audit log writer and reader.
//!
//! Writes are best-effort: a failed or skipped write is logged and counted,
//! never returned. Reads surface storage errors but degrade to an empty page
//! while the store is unavailable.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{AuditLogPage, AuditLogQuery, AuditedEntity, NewAuditEntry};
use domain::services::AuditWriter;
use shared::pagination::Paginated;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::metrics::{self, QueryTimer};
use crate::store::AuditStore;

/// Repository for audit log operations.
#[derive(Clone, Debug)]
pub struct AuditLogRepository {
    store: Arc<AuditStore>,
}

impl AuditLogRepository {
    /// Create a new repository instance.
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AuditStore> {
        &self.store
    }

    /// Record an audit entry.
    ///
    /// Stamps the current time when the entry carries none. Returns once the
    /// attempt is over, whether or not the entry was stored.
    pub async fn write(&self, entry: NewAuditEntry) {
        if !self.store.ensure_ready().await {
            debug!(
                entity_type = %entry.entity_type,
                entity_id = %entry.entity_id,
                "Audit store not ready, dropping entry"
            );
            metrics::record_entry_dropped("not_ready");
            return;
        }

        if !AuditedEntity::is_known(&entry.entity_type) {
            debug!(entity_type = %entry.entity_type, "Auditing entity type outside the documented set");
        }

        let timestamp = entry.timestamp.unwrap_or_else(Utc::now);
        let entity_type = entry.entity_type.clone();
        let entity_id = entry.entity_id.clone();

        match self.store.insert(entry, timestamp).await {
            Ok(_) => metrics::record_entry_written(),
            Err(e) => {
                error!(
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    error = %e,
                    "Failed to insert audit log"
                );
                metrics::record_entry_dropped(e.kind());
            }
        }
    }

    /// Record an audit entry asynchronously (fire and forget).
    /// Uses tokio::spawn so the caller does not wait for initialization.
    pub fn write_detached(&self, entry: NewAuditEntry) {
        let repo = self.clone();
        tokio::spawn(async move {
            repo.write(entry).await;
        });
    }

    /// List audit entries matching `query`, newest first.
    ///
    /// `total` is the full match count. An unavailable store yields an empty
    /// page; errors from a ready store are returned.
    pub async fn query(&self, query: &AuditLogQuery) -> Result<AuditLogPage, StoreError> {
        if !self.store.ensure_ready().await {
            return Ok(Paginated::empty(query.page, query.limit));
        }

        let timer = QueryTimer::new("audit_query");
        let results = self.store.find(query).await;
        let total = self.store.count(query).await;
        metrics::record_audit_query_duration(timer.elapsed_secs());

        let (results, total) = (results?, total?);
        Ok(Paginated::new(query.page, query.limit, total, results))
    }
}

#[async_trait::async_trait]
impl AuditWriter for AuditLogRepository {
    async fn write(&self, entry: NewAuditEntry) {
        AuditLogRepository::write(self, entry).await
    }

    fn write_detached(&self, entry: NewAuditEntry) {
        AuditLogRepository::write_detached(self, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FaultConfig, InMemoryAuditBackend};
    use crate::store::RetryPolicy;
    use chrono::{DateTime, Duration, TimeZone};
    use domain::services::audit_helpers;
    use domain::services::AuditContext;
    use serde_json::json;

    fn repo_with(backend: Arc<InMemoryAuditBackend>) -> AuditLogRepository {
        AuditLogRepository::new(Arc::new(AuditStore::new(backend)))
    }

    fn failed_repo() -> AuditLogRepository {
        let store = AuditStore::with_retry_policy(
            Arc::new(InMemoryAuditBackend::unreachable()),
            RetryPolicy::new(2, std::time::Duration::from_millis(1)),
        );
        AuditLogRepository::new(Arc::new(store))
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_write_stamps_missing_timestamp() {
        let repo = repo_with(Arc::new(InMemoryAuditBackend::new()));
        let before = Utc::now();

        repo.write(NewAuditEntry::new("Product", "p1", "CREATE").with_after(json!({"sku": "X"})))
            .await;

        let page = repo.query(&AuditLogQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        let stored = &page.results[0];
        assert!(stored.timestamp >= before);
        assert!(stored.timestamp <= Utc::now());
        assert_eq!(stored.after, Some(json!({"sku": "X"})));
    }

    #[tokio::test]
    async fn test_write_keeps_explicit_timestamp() {
        let repo = repo_with(Arc::new(InMemoryAuditBackend::new()));
        let ts = at(2025, 6, 1);

        repo.write(NewAuditEntry::new("Product", "p1", "CREATE").with_timestamp(ts))
            .await;

        let page = repo.query(&AuditLogQuery::default()).await.unwrap();
        assert_eq!(page.results[0].timestamp, ts);
    }

    #[tokio::test]
    async fn test_write_swallows_insert_failures() {
        let backend = Arc::new(InMemoryAuditBackend::with_faults(FaultConfig {
            fail_inserts: true,
            ..FaultConfig::default()
        }));
        let repo = repo_with(backend.clone());

        repo.write(NewAuditEntry::new("Product", "p1", "CREATE")).await;
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_write_accepts_unknown_entity_and_action() {
        let repo = repo_with(Arc::new(InMemoryAuditBackend::new()));

        repo.write(NewAuditEntry::new("PurchaseOrder", "po-1", "APPROVE")).await;
        repo.write(NewAuditEntry::default()).await;

        let page = repo.query(&AuditLogQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_not_ready_write_and_query_degrade() {
        let repo = failed_repo();

        repo.write(NewAuditEntry::new("Product", "p1", "CREATE")).await;
        let page = repo.query(&AuditLogQuery::default()).await.unwrap();

        assert_eq!(page, Paginated::empty(1, 50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_backend_does_not_stall_writers() {
        let backend = Arc::new(InMemoryAuditBackend::with_faults(FaultConfig {
            hang_prepares: true,
            ..FaultConfig::default()
        }));
        let repo = repo_with(backend.clone());
        let budget = RetryPolicy::default().budget();

        let started = tokio::time::Instant::now();
        repo.write(NewAuditEntry::new("Product", "p1", "CREATE")).await;
        assert!(started.elapsed() <= budget + std::time::Duration::from_millis(10));

        let page = repo.query(&AuditLogQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_not_ready_query_echoes_pagination() {
        let repo = failed_repo();
        let query = AuditLogQuery::default().paged(3, 20).with_search("anything");

        let page = repo.query(&query).await.unwrap();
        assert_eq!((page.page, page.limit, page.total), (3, 20, 0));
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let backend = Arc::new(InMemoryAuditBackend::new());
        let repo = repo_with(backend.clone());
        repo.write(NewAuditEntry::new("Product", "p1", "CREATE")).await;

        backend.set_faults(FaultConfig {
            fail_reads: true,
            ..FaultConfig::default()
        });

        let result = repo.query(&AuditLogQuery::default()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_query_pagination_total_and_ranking() {
        let repo = repo_with(Arc::new(InMemoryAuditBackend::new()));
        let base = at(2025, 1, 1);
        for i in 0..7 {
            repo.write(
                NewAuditEntry::new("Product", format!("p{}", i), "CREATE")
                    .with_timestamp(base + Duration::hours(i)),
            )
            .await;
        }

        let all = repo.query(&AuditLogQuery::default()).await.unwrap();
        let page2 = repo
            .query(&AuditLogQuery::default().paged(2, 3))
            .await
            .unwrap();

        assert_eq!(page2.total, 7);
        assert_eq!(page2.results.len(), 3);
        assert_eq!(page2.results, all.results[3..6].to_vec());
        assert!(all
            .results
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_audit_writer_seam() {
        let repo = repo_with(Arc::new(InMemoryAuditBackend::new()));
        let writer: Arc<dyn AuditWriter> = Arc::new(repo.clone());
        let ctx = AuditContext {
            user_id: Some("user-1".into()),
            correlation_id: Some("corr-9".into()),
            ..AuditContext::default()
        };

        writer
            .write(audit_helpers::entity_deleted(
                &ctx,
                "Warehouse",
                "w1",
                Some(json!({"name": "North"})),
            ))
            .await;

        let page = repo
            .query(&AuditLogQuery::default().with_action("DELETE"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].correlation_id.as_deref(), Some("corr-9"));
        assert!(page.results[0].after.is_none());
    }

    #[tokio::test]
    async fn test_write_detached_eventually_stored() {
        let backend = Arc::new(InMemoryAuditBackend::new());
        let repo = repo_with(backend.clone());

        repo.write_detached(NewAuditEntry::new("Location", "l1", "CREATE"));

        for _ in 0..100 {
            if !backend.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(backend.len(), 1);
    }
}
