use apim_core::{Providers, UsagePublishService, WorkerPool};
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppState {
    pub providers: Providers,
    pub publish: UsagePublishService,
    pub pool: Arc<WorkerPool>,
    /// Root of extracted service bundles; hashing is disabled when `None`.
    pub catalog_root: Option<PathBuf>,
}

impl AppState {
    #[must_use]
    pub fn new(providers: Providers, pool: Arc<WorkerPool>, publish_gap_days: Option<u32>) -> Self {
        let publish = UsagePublishService::new(
            providers.admin.clone(),
            providers.usage_publisher.clone(),
            pool.clone(),
            publish_gap_days,
        );

        Self {
            providers,
            publish,
            pool,
            catalog_root: None,
        }
    }

    #[must_use]
    pub fn with_catalog_root(mut self, root: Option<PathBuf>) -> Self {
        self.catalog_root = root;
        self
    }
}
