#![allow(missing_docs)]

pub mod catalog;
pub mod monetization;
pub mod providers;
pub mod worker;

pub use apim_sdk;
pub use catalog::{generate_hash, hash_bundle, CatalogError, ServiceHashes, ServiceMetadata};
pub use monetization::{
    PublishError, PublishOutcome, PublishReport, UsagePublishService, DEFAULT_TIME_GAP_DAYS,
};
pub use providers::{
    default_registry, LoggingUsagePublisher, MemoryAdmin, MemoryGatewayPolicies, ProviderConfig,
    ProviderFactory, ProviderRegistry, Providers,
};
pub use worker::{JobHandle, PoolError, WorkerPool};
