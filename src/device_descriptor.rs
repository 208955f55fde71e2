use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SetupError;
use crate::hints::FIRMWARE_VERSION_TAG;
use crate::key_catalog::{KeyCatalog, ROUTER_INFO};
use crate::remote_reader::{with_timeout, RemoteReader};
use crate::DOMAIN;

/// Version reported when the catalog tags no key as the firmware version
pub const DEFAULT_SW_VERSION: &str = "0.01";
pub const MANUFACTURER: &str = "Vodafone";
pub const MODEL: &str = "EasyBox";

/// Identity of the managed router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// `(domain, device id)` pair, unique across integrations
    pub identifier: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

/// Shared lookup for the current descriptor.
///
/// Consumers hold a clone of the registry, not of the descriptor, so a later
/// `publish` is visible to all of them.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    current: Arc<ArcSwapOption<DeviceDescriptor>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, descriptor: DeviceDescriptor) {
        info!(
            "Device `{}` registered (sw {})",
            descriptor.name, descriptor.sw_version
        );
        self.current.store(Some(Arc::new(descriptor)));
    }

    pub fn lookup(&self) -> Option<Arc<DeviceDescriptor>> {
        self.current.load_full()
    }
}

/// Reads the router's identity once: `routerInfo` values for the firmware
/// version, plus the separate name query.
pub async fn resolve_device_descriptor(
    catalog: &KeyCatalog,
    reader: &dyn RemoteReader,
    device_id: &str,
    fetch_timeout: Duration,
) -> Result<DeviceDescriptor, SetupError> {
    let router_info = catalog.section(ROUTER_INFO).map_err(SetupError::from)?;
    let info_keys: Vec<String> = router_info.iter().map(|d| d.key.clone()).collect();
    debug!("Querying router info keys {:?}", info_keys);

    let values = with_timeout(fetch_timeout, reader.fetch(&info_keys))
        .await
        .map_err(SetupError::DeviceUnavailable)?;

    let mut sw_version = DEFAULT_SW_VERSION.to_string();
    if let Some(tagged) = router_info
        .iter()
        .find(|d| d.unit_hint.as_deref() == Some(FIRMWARE_VERSION_TAG))
    {
        match values.get(&tagged.key) {
            Some(version) => sw_version = version.clone(),
            None => warn!(
                "Firmware key `{}` missing from router answer, using {}",
                tagged.key, DEFAULT_SW_VERSION
            ),
        }
    }

    let name = with_timeout(fetch_timeout, reader.resolve_device_name())
        .await
        .map_err(SetupError::DeviceUnavailable)?;

    Ok(DeviceDescriptor {
        identifier: (DOMAIN.to_string(), device_id.to_string()),
        name,
        manufacturer: MANUFACTURER.to_string(),
        model: MODEL.to_string(),
        sw_version,
    })
}

/// Resolves the descriptor and publishes it. Also the entry point for a
/// later re-resolution of the device identity.
pub async fn refresh_device_registry(
    registry: &DeviceRegistry,
    catalog: &KeyCatalog,
    reader: &dyn RemoteReader,
    device_id: &str,
    fetch_timeout: Duration,
) -> Result<(), SetupError> {
    let descriptor = resolve_device_descriptor(catalog, reader, device_id, fetch_timeout).await?;
    registry.publish(descriptor);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::test_support::{values, ScriptedReader};

    const CATALOG: &str = r#"
        {
            "routerInfo": [
                { "key": "sys_serial", "name": "Serial" },
                { "key": "sys_fw_version", "name": "Firmware", "hsType": "sw_version" }
            ],
            "queryKeys": []
        }
    "#;

    #[tokio::test]
    async fn test_tagged_firmware_key_sets_version() {
        let catalog = KeyCatalog::from_json_str(CATALOG).unwrap();
        let reader = ScriptedReader::new("EasyBox 804");
        reader.push_ok(values(&[("sys_serial", "X1"), ("sys_fw_version", "20.02.266")]));

        let descriptor =
            resolve_device_descriptor(&catalog, &reader, "dev01", Duration::from_secs(1))
                .await
                .unwrap();

        assert_eq!(descriptor.sw_version, "20.02.266");
        assert_eq!(descriptor.name, "EasyBox 804");
        assert_eq!(
            descriptor.identifier,
            (DOMAIN.to_string(), "dev01".to_string())
        );
        assert_eq!(
            reader.requested_keys(),
            vec![vec!["sys_serial".to_string(), "sys_fw_version".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_untagged_catalog_uses_default_version() {
        let catalog = KeyCatalog::from_json_str(
            r#"{ "routerInfo": [ { "key": "sys_serial", "name": "Serial" } ], "queryKeys": [] }"#,
        )
        .unwrap();
        let reader = ScriptedReader::new("box");
        reader.push_ok(values(&[("sys_serial", "X1")]));

        let descriptor =
            resolve_device_descriptor(&catalog, &reader, "dev01", Duration::from_secs(1))
                .await
                .unwrap();

        assert_eq!(descriptor.sw_version, DEFAULT_SW_VERSION);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_retryable() {
        let catalog = KeyCatalog::from_json_str(CATALOG).unwrap();
        let reader = ScriptedReader::new("box");
        reader.push_err(FetchError::Unavailable("down".to_string()));

        let result =
            resolve_device_descriptor(&catalog, &reader, "dev01", Duration::from_secs(1)).await;

        let err = result.unwrap_err();
        assert!(matches!(err, SetupError::DeviceUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_registry_lookup_sees_republished_descriptor() {
        let catalog = KeyCatalog::from_json_str(CATALOG).unwrap();
        let registry = DeviceRegistry::new();
        let reader_view = registry.clone();
        assert!(reader_view.lookup().is_none());

        let reader = ScriptedReader::new("box");
        reader.push_ok(values(&[("sys_fw_version", "1.0")]));
        refresh_device_registry(&registry, &catalog, &reader, "dev01", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reader_view.lookup().unwrap().sw_version, "1.0");

        reader.push_ok(values(&[("sys_fw_version", "2.0")]));
        refresh_device_registry(&registry, &catalog, &reader, "dev01", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reader_view.lookup().unwrap().sw_version, "2.0");
    }
}
