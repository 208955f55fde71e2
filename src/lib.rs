//! EasyBox Connect Library
//!
//! Polls a router for a configured set of attributes with one batched read
//! per cycle and hands every value to the consumer tracking that attribute.

pub mod config;
pub mod consumer;
pub mod consumer_registry;
pub mod device_descriptor;
pub mod easybox_api;
pub mod error;
pub mod hints;
pub mod key_catalog;
pub mod polling_coordinator;
pub mod remote_reader;
pub mod setup;
pub mod snapshot;

#[cfg(test)]
mod test_support;

/// Integration domain, prefix of every unique id
pub const DOMAIN: &str = "easybox_connect";

// Re-export commonly used types for easier access
pub use config::{PollSettings, Settings};
pub use consumer::{AttributeConsumer, SnapshotSink};
pub use consumer_registry::ConsumerRegistry;
pub use device_descriptor::{DeviceDescriptor, DeviceRegistry};
pub use easybox_api::EasyBoxApi;
pub use error::{CatalogLoadError, ConfigurationMismatchError, FetchError, RefreshFailed, SetupError};
pub use key_catalog::{KeyCatalog, KeyDefinition};
pub use polling_coordinator::{CoordinatorState, PollingCoordinator, RefreshStatus};
pub use remote_reader::RemoteReader;
pub use setup::{setup_device, setup_with_catalog, Integration};
pub use snapshot::Snapshot;
