//! Background job scheduler and job implementations.

mod pool_metrics;
mod retention_sweep;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use retention_sweep::RetentionSweepJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
