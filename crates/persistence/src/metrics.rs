//! Database and audit metrics collection.
//!
//! Provides functions for recording storage-related metrics.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record database query duration.
///
/// Call this function after executing a query to record its duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Record database connection pool metrics.
///
/// Call this function periodically to track pool health.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Count an audit entry that reached the store.
pub fn record_entry_written() {
    counter!("audit_entries_written_total").increment(1);
}

/// Count an audit entry that was dropped, labelled by reason.
pub fn record_entry_dropped(reason: &'static str) {
    counter!("audit_entries_dropped_total", "reason" => reason).increment(1);
}

/// Count entries removed by the retention sweep.
pub fn record_entries_expired(count: u64) {
    counter!("audit_entries_expired_total").increment(count);
}

/// Record how long an audit query took, including the count.
pub fn record_audit_query_duration(duration_secs: f64) {
    histogram!("audit_query_duration_seconds").record(duration_secs);
}

/// A helper to time storage operations and record metrics.
///
/// Usage:
/// ```ignore
/// let timer = QueryTimer::new("audit_find");
/// let result = sqlx::query_as::<_, AuditLogEntity>(...).fetch_all(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    /// Create a new timer for the given query name.
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since the timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        record_query_duration(&self.query_name, self.elapsed_secs());
    }
}
