use async_trait::async_trait;
use apim_sdk::{ApimError, ApimResult, UsagePublisher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Usage publisher that only records the published windows in the log.
///
/// Stands in for a billing integration in development deployments.
#[derive(Debug, Default)]
pub struct LoggingUsagePublisher {
    published: AtomicU64,
}

impl LoggingUsagePublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of windows published so far.
    pub fn published_windows(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UsagePublisher for LoggingUsagePublisher {
    async fn publish_usage(&self, from: i64, to: i64) -> ApimResult<()> {
        if from > to {
            return Err(ApimError::invalid_argument(format!(
                "usage window starts after it ends ({from} > {to})"
            )));
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::info!(from = from, to = to, "Published monetization usage window");
        Ok(())
    }
}
