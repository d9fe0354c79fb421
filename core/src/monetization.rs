//! Monetization usage publishing: the trigger/status service and the background job it runs.

use apim_sdk::{
    AdminProvider, ApimError, PublishState, PublishStatus, UsagePublishInfo, UsagePublisher,
    USAGE_PUBLISH_JOB_NAME,
};
use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::worker::{JobHandle, PoolError, WorkerPool};

/// Lookback used to seed the first publish window when none is configured.
pub const DEFAULT_TIME_GAP_DAYS: u32 = 1;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Provider(#[from] ApimError),

    #[error("could not schedule usage publish job: {0}")]
    Schedule(#[from] PoolError),
}

/// Summary of one finished publish job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub from: i64,
    pub to: i64,
    pub status: PublishStatus,
}

/// Result of a trigger request.
#[derive(Debug)]
pub enum PublishOutcome {
    /// A job was queued; the handle resolves when it finishes.
    Accepted(JobHandle<PublishReport>),
    /// A job is already running; nothing was queued.
    AlreadyRunning(UsagePublishInfo),
}

/// Epoch milliseconds truncated to whole seconds.
#[must_use]
pub fn to_epoch_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp() * 1000
}

pub struct UsagePublishService {
    admin: Arc<dyn AdminProvider>,
    publisher: Arc<dyn UsagePublisher>,
    pool: Arc<WorkerPool>,
    time_gap_days: u32,
    trigger_lock: Mutex<()>,
}

impl UsagePublishService {
    #[must_use]
    pub fn new(
        admin: Arc<dyn AdminProvider>,
        publisher: Arc<dyn UsagePublisher>,
        pool: Arc<WorkerPool>,
        time_gap_days: Option<u32>,
    ) -> Self {
        Self {
            admin,
            publisher,
            pool,
            time_gap_days: time_gap_days.unwrap_or(DEFAULT_TIME_GAP_DAYS),
            trigger_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn time_gap_days(&self) -> u32 {
        self.time_gap_days
    }

    pub async fn start_publish(&self) -> Result<PublishOutcome, PublishError> {
        self.start_publish_at(Utc::now()).await
    }

    /// Trigger a publish run as of `now`.
    ///
    /// Creates the publish record on first use, seeding the last publish time
    /// `time_gap_days` before `now`. The running check and the state change are
    /// serialized, so concurrent triggers start at most one job.
    pub async fn start_publish_at(&self, now: DateTime<Utc>) -> Result<PublishOutcome, PublishError> {
        let _guard = self.trigger_lock.lock().await;

        let info = match self.admin.get_usage_publish_info().await? {
            Some(info) => info,
            None => {
                let info = self.initial_record(now)?;
                self.admin.add_usage_publish_info(&info).await?;
                tracing::info!(
                    last_publish_time = info.last_publish_time,
                    gap_days = self.time_gap_days,
                    "Created monetization usage publish record"
                );
                info
            }
        };

        if info.is_running() {
            tracing::warn!(started_time = info.started_time, "Usage publish job already running");
            return Ok(PublishOutcome::AlreadyRunning(info));
        }

        let running = UsagePublishInfo {
            state: PublishState::Running,
            status: PublishStatus::InProgress,
            started_time: to_epoch_millis(now),
            ..info.clone()
        };
        self.admin.update_usage_publish_info(&running).await?;

        let job = PublishJob {
            admin: self.admin.clone(),
            publisher: self.publisher.clone(),
            info: running,
        };
        match self.pool.submit(job.run()) {
            Ok(handle) => Ok(PublishOutcome::Accepted(handle)),
            Err(e) => {
                if let Err(revert) = self.admin.update_usage_publish_info(&info).await {
                    tracing::error!(error = %revert, "Failed to restore usage publish record");
                }
                Err(e.into())
            }
        }
    }

    pub async fn status(&self) -> Result<Option<UsagePublishInfo>, PublishError> {
        Ok(self.admin.get_usage_publish_info().await?)
    }

    fn initial_record(&self, now: DateTime<Utc>) -> Result<UsagePublishInfo, ApimError> {
        let from = Duration::try_days(i64::from(self.time_gap_days))
            .and_then(|gap| now.checked_sub_signed(gap))
            .ok_or_else(|| {
                ApimError::invalid_argument(format!(
                    "publish time gap of {} days reaches before the supported time range",
                    self.time_gap_days
                ))
            })?;
        Ok(UsagePublishInfo {
            id: USAGE_PUBLISH_JOB_NAME.to_string(),
            state: PublishState::Initiated,
            status: PublishStatus::InProgress,
            started_time: to_epoch_millis(now),
            last_publish_time: to_epoch_millis(from),
        })
    }
}

/// One background publish run over `[last_publish_time, now]`.
struct PublishJob {
    admin: Arc<dyn AdminProvider>,
    publisher: Arc<dyn UsagePublisher>,
    info: UsagePublishInfo,
}

impl PublishJob {
    async fn run(self) -> PublishReport {
        let from = self.info.last_publish_time;
        let to = to_epoch_millis(Utc::now()).max(from);
        tracing::info!(from = from, to = to, "Publishing monetization usage");

        let mut info = self.info;
        info.state = PublishState::Idle;
        let published = AssertUnwindSafe(self.publisher.publish_usage(from, to))
            .catch_unwind()
            .await;
        match published {
            Ok(Ok(())) => {
                info.status = PublishStatus::Accepted;
                info.last_publish_time = to;
                tracing::info!(from = from, to = to, "Monetization usage published");
            }
            Ok(Err(e)) => {
                info.status = PublishStatus::Error;
                tracing::error!(error = %e, from = from, to = to, "Monetization usage publishing failed");
            }
            Err(_) => {
                info.status = PublishStatus::Error;
                tracing::error!(from = from, to = to, "Usage publisher panicked");
            }
        }

        if let Err(e) = self.admin.update_usage_publish_info(&info).await {
            tracing::error!(error = %e, "Failed to record usage publish result");
        }

        PublishReport {
            from,
            to,
            status: info.status,
        }
    }
}
