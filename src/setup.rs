use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{PollSettings, Settings};
use crate::consumer::{AttributeConsumer, SnapshotSink};
use crate::device_descriptor::{refresh_device_registry, DeviceRegistry};
use crate::error::SetupError;
use crate::key_catalog::{KeyCatalog, QUERY_KEYS};
use crate::polling_coordinator::PollingCoordinator;
use crate::remote_reader::RemoteReader;
use crate::DOMAIN;

/// A fully set up router: coordinator, device identity and one consumer per polled key
pub struct Integration {
    pub catalog: KeyCatalog,
    pub coordinator: Arc<PollingCoordinator>,
    pub devices: DeviceRegistry,
    pub consumers: Vec<Arc<AttributeConsumer>>,
}

impl Integration {
    /// Starts the scheduled refreshes. Abort the handle to tear polling down.
    pub fn start_polling(&self) -> JoinHandle<()> {
        self.coordinator.clone().spawn()
    }

    pub fn consumer(&self, key: &str) -> Option<&Arc<AttributeConsumer>> {
        self.consumers.iter().find(|c| c.key() == key)
    }
}

/// Loads the catalog named in `settings` and sets the router up
pub async fn setup_device(
    settings: &Settings,
    reader: Arc<dyn RemoteReader>,
) -> Result<Integration, SetupError> {
    let catalog = KeyCatalog::load(&settings.catalog_path)?;
    setup_with_catalog(catalog, reader, &settings.device_id, settings.poll).await
}

/// Sets the router up from an already loaded catalog.
///
/// Consumers are only created once the first refresh succeeded; any error
/// leaves nothing registered.
pub async fn setup_with_catalog(
    catalog: KeyCatalog,
    reader: Arc<dyn RemoteReader>,
    device_id: &str,
    poll: PollSettings,
) -> Result<Integration, SetupError> {
    info!("Setting up router `{}`", device_id);

    let devices = DeviceRegistry::new();
    refresh_device_registry(
        &devices,
        &catalog,
        reader.as_ref(),
        device_id,
        poll.fetch_timeout,
    )
    .await?;

    let coordinator = Arc::new(PollingCoordinator::from_catalog(
        DOMAIN, &catalog, reader, poll,
    )?);
    coordinator.refresh().await?;

    let consumers = catalog
        .section(QUERY_KEYS)?
        .iter()
        .map(|definition| {
            AttributeConsumer::new(&coordinator, definition, devices.clone()).map(Arc::new)
        })
        .collect::<Result<Vec<_>, _>>()?;

    coordinator
        .register_all(
            consumers
                .iter()
                .map(|c| c.clone() as Arc<dyn SnapshotSink>)
                .collect(),
        )
        .await?;
    debug!("Registered {} consumers", consumers.len());

    info!(
        "Router `{}` ready with {} attributes",
        device_id,
        consumers.len()
    );
    Ok(Integration {
        catalog,
        coordinator,
        devices,
        consumers,
    })
}
