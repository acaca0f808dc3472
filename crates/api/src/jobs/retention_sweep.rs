//! Background job that expires audit entries past the retention window.

use std::sync::Arc;

use chrono::Utc;
use persistence::AuditStore;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

/// Deletes audit entries older than the store's retention window.
///
/// A store that is not ready makes this a no-op.
pub struct RetentionSweepJob {
    store: Arc<AuditStore>,
    interval_minutes: u64,
}

impl RetentionSweepJob {
    pub fn new(store: Arc<AuditStore>, interval_minutes: u64) -> Self {
        Self {
            store,
            interval_minutes: interval_minutes.max(1),
        }
    }
}

#[async_trait::async_trait]
impl Job for RetentionSweepJob {
    fn name(&self) -> &'static str {
        "audit_retention_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    fn run_on_start(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        let expired = self
            .store
            .sweep_expired(Utc::now())
            .await
            .map_err(|e| format!("Retention sweep failed: {}", e))?;

        if expired > 0 {
            info!(
                expired,
                retention_days = self.store.retention().num_days(),
                "Expired audit entries removed"
            );
        }
        Ok(())
    }
}
