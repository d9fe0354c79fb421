pub mod memory;
pub mod publisher;
pub mod registry;

pub use memory::{MemoryAdmin, MemoryGatewayPolicies};
pub use publisher::LoggingUsagePublisher;
pub use registry::{default_registry, ProviderConfig, ProviderFactory, ProviderRegistry, Providers};
