//! Lazily initialized audit storage adapter.
//!
//! The first caller of [`AuditStore::ensure_ready`] acquires the collection
//! and applies the index plan, retrying a bounded number of times. Every
//! concurrent caller awaits that same attempt. The outcome is fixed for the
//! lifetime of the store: once initialization has given up, operations report
//! [`StoreError::NotReady`] instead of trying again.
//!
//! Attempts start at a fixed cadence of [`RetryPolicy::delay`] and each one is
//! cut off after [`RetryPolicy::attempt_timeout`], so an unreachable backend
//! is given up on after roughly `max_attempts * delay`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::models::{AuditEntry, AuditLogQuery, NewAuditEntry};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::backends::{AuditBackend, AUDIT_INDEXES};
use crate::error::StoreError;
use crate::metrics;

/// Default number of initialization attempts.
pub const DEFAULT_INIT_ATTEMPTS: u32 = 10;

/// Default pause between initialization attempts.
pub const DEFAULT_INIT_DELAY: Duration = Duration::from_millis(500);

/// Default upper bound on a single initialization attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);

/// Bounded, fixed-delay retry policy for store initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Time from the start of one attempt to the start of the next.
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_INIT_ATTEMPTS,
            delay: DEFAULT_INIT_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Worst-case time spent before initialization gives up.
    pub fn budget(&self) -> Duration {
        let cadence = self.delay.max(self.attempt_timeout);
        cadence * (self.max_attempts.max(1) - 1) + self.attempt_timeout
    }
}

/// Observable readiness of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    /// No initialization attempt has completed yet.
    Uninitialized,
    Ready,
    /// Initialization gave up; the store stays unavailable.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ready,
    Failed,
}

/// Shared storage adapter over an [`AuditBackend`].
pub struct AuditStore {
    backend: Arc<dyn AuditBackend>,
    policy: RetryPolicy,
    outcome: OnceCell<Outcome>,
}

impl AuditStore {
    pub fn new(backend: Arc<dyn AuditBackend>) -> Self {
        Self::with_retry_policy(backend, RetryPolicy::default())
    }

    pub fn with_retry_policy(backend: Arc<dyn AuditBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            outcome: OnceCell::new(),
        }
    }

    /// Initialize the store if needed and report whether it is usable.
    ///
    /// Never fails; an unreachable backend yields `false` once the retry
    /// budget is spent.
    pub async fn ensure_ready(&self) -> bool {
        let outcome = self.outcome.get_or_init(|| self.initialize()).await;
        *outcome == Outcome::Ready
    }

    async fn initialize(&self) -> Outcome {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let prepared = tokio::time::timeout(self.policy.attempt_timeout, self.backend.prepare())
                .await
                .unwrap_or_else(|_| {
                    Err(StoreError::Unavailable(format!(
                        "prepare timed out after {}ms",
                        self.policy.attempt_timeout.as_millis()
                    )))
                });

            match prepared {
                Ok(()) => {
                    self.apply_indexes().await;
                    info!(
                        backend = self.backend.name(),
                        attempt,
                        "Audit store ready"
                    );
                    return Outcome::Ready;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        backend = self.backend.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Audit store not available, retrying"
                    );
                    tokio::time::sleep(self.policy.delay.saturating_sub(started.elapsed())).await;
                }
                Err(e) => {
                    error!(
                        backend = self.backend.name(),
                        attempts = max_attempts,
                        error = %e,
                        "Failed to initialize audit store after retries"
                    );
                }
            }
        }

        Outcome::Failed
    }

    async fn apply_indexes(&self) {
        let mut failed = 0usize;
        for spec in AUDIT_INDEXES {
            match tokio::time::timeout(self.policy.attempt_timeout, self.backend.create_index(spec))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(index = spec.name, error = %e, "Audit index may already exist");
                }
                Err(_) => {
                    failed += 1;
                    warn!(index = spec.name, "Audit index creation timed out");
                }
            }
        }
        if failed == 0 {
            info!(
                count = AUDIT_INDEXES.len(),
                retention_days = self.retention().num_days(),
                "Audit indexes created"
            );
        }
    }

    pub fn state(&self) -> StoreState {
        match self.outcome.get() {
            None => StoreState::Uninitialized,
            Some(Outcome::Ready) => StoreState::Ready,
            Some(Outcome::Failed) => StoreState::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == StoreState::Ready
    }

    /// Retention window declared by the TTL index.
    pub fn retention(&self) -> chrono::Duration {
        AUDIT_INDEXES
            .iter()
            .find_map(|spec| spec.expire_after_secs)
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
            .unwrap_or_else(chrono::Duration::zero)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Connection pool of the backend, when it has one.
    pub fn pool(&self) -> Option<&PgPool> {
        self.backend.pool()
    }

    async fn ready(&self) -> Result<&dyn AuditBackend, StoreError> {
        if self.ensure_ready().await {
            Ok(self.backend.as_ref())
        } else {
            Err(StoreError::NotReady)
        }
    }

    pub async fn insert(
        &self,
        entry: NewAuditEntry,
        timestamp: DateTime<Utc>,
    ) -> Result<AuditEntry, StoreError> {
        self.ready().await?.insert(entry, timestamp).await
    }

    pub async fn find(&self, query: &AuditLogQuery) -> Result<Vec<AuditEntry>, StoreError> {
        self.ready().await?.find(query).await
    }

    pub async fn count(&self, query: &AuditLogQuery) -> Result<u64, StoreError> {
        self.ready().await?.count(query).await
    }

    /// Delete entries that fell out of the retention window as of `now`.
    ///
    /// Does nothing when the store is not ready.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        if !self.ensure_ready().await {
            return Ok(0);
        }
        let expired = self.backend.purge_expired(now - self.retention()).await?;
        metrics::record_entries_expired(expired);
        Ok(expired)
    }
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore")
            .field("backend", &self.backend.name())
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish()
    }
}
