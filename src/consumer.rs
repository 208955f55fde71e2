use arc_swap::ArcSwapOption;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::device_descriptor::{DeviceDescriptor, DeviceRegistry};
use crate::error::ConfigurationMismatchError;
use crate::hints::{DeviceClass, UnitOfMeasurement};
use crate::key_catalog::KeyDefinition;
use crate::polling_coordinator::{PollingCoordinator, RefreshStatus};
use crate::DOMAIN;

/// Receives the value of one key from every successful poll cycle
pub trait SnapshotSink: Send + Sync {
    /// Key this sink is interested in
    fn key(&self) -> &str;

    /// Called once per cycle in which the snapshot holds a value for `key()`
    fn on_snapshot_updated(&self, value: &str);
}

/// One managed router attribute and its latest known value
pub struct AttributeConsumer {
    key: String,
    name: String,
    unique_id: String,
    unit: Option<UnitOfMeasurement>,
    device_class: Option<DeviceClass>,
    last_value: ArcSwapOption<String>,
    fresh: AtomicBool,
    status: watch::Receiver<RefreshStatus>,
    devices: DeviceRegistry,
}

impl AttributeConsumer {
    /// Builds the consumer for `definition` and seeds it from the
    /// coordinator's current snapshot, if there is one.
    pub fn new(
        coordinator: &PollingCoordinator,
        definition: &KeyDefinition,
        devices: DeviceRegistry,
    ) -> Result<Self, ConfigurationMismatchError> {
        coordinator.ensure_active_key(&definition.key)?;

        let last_value = coordinator.current_value(&definition.key);
        debug!(
            "Consumer for `{}` starts with {:?}",
            definition.key, last_value
        );

        Ok(Self {
            key: definition.key.clone(),
            name: definition.display_name.clone(),
            unique_id: format!("{}.{}", DOMAIN, definition.key),
            unit: UnitOfMeasurement::from_hint(definition.unit_hint.as_deref()),
            device_class: DeviceClass::from_hint(definition.class_hint.as_deref()),
            fresh: AtomicBool::new(last_value.is_some()),
            last_value: ArcSwapOption::new(last_value.map(Arc::new)),
            status: coordinator.subscribe_status(),
            devices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn unit(&self) -> Option<UnitOfMeasurement> {
        self.unit
    }

    pub fn device_class(&self) -> Option<DeviceClass> {
        self.device_class
    }

    pub fn last_value(&self) -> Option<String> {
        self.last_value.load_full().map(|v| v.as_ref().clone())
    }

    /// True while the coordinator's last refresh succeeded
    pub fn available(&self) -> bool {
        self.status.borrow().last_update_success
    }

    /// Returns whether a value arrived since the last call, and clears the mark
    pub fn take_fresh(&self) -> bool {
        self.fresh.swap(false, Ordering::AcqRel)
    }

    /// Integration-internal attributes exposed next to the value
    pub fn extra_state_attributes(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([("idx", self.key.clone())])
    }

    pub fn device_info(&self) -> Option<Arc<DeviceDescriptor>> {
        self.devices.lookup()
    }
}

impl SnapshotSink for AttributeConsumer {
    fn key(&self) -> &str {
        &self.key
    }

    fn on_snapshot_updated(&self, value: &str) {
        self.last_value.store(Some(Arc::new(value.to_string())));
        self.fresh.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollSettings;
    use crate::test_support::{values, ScriptedReader};

    fn definition(key: &str, unit: Option<&str>, class: Option<&str>) -> KeyDefinition {
        KeyDefinition {
            key: key.to_string(),
            display_name: format!("{key} name"),
            unit_hint: unit.map(str::to_string),
            class_hint: class.map(str::to_string),
        }
    }

    fn coordinator(reader: Arc<ScriptedReader>) -> PollingCoordinator {
        PollingCoordinator::new(
            DOMAIN,
            reader,
            vec!["temp".to_string(), "dsl_downstream".to_string()],
            PollSettings::default(),
        )
    }

    #[test]
    fn test_key_outside_active_set_fails_fast() {
        let coordinator = coordinator(Arc::new(ScriptedReader::new("box")));
        let result = AttributeConsumer::new(
            &coordinator,
            &definition("uptime", None, None),
            DeviceRegistry::new(),
        );

        let err = result.err().unwrap();
        assert_eq!(err.key, "uptime");
    }

    #[test]
    fn test_consumer_before_first_snapshot_has_no_value() {
        let coordinator = coordinator(Arc::new(ScriptedReader::new("box")));
        let consumer = AttributeConsumer::new(
            &coordinator,
            &definition("temp", None, None),
            DeviceRegistry::new(),
        )
        .unwrap();

        assert_eq!(consumer.last_value(), None);
        assert!(!consumer.take_fresh());
        assert!(!consumer.available());
        assert!(consumer.device_info().is_none());
    }

    #[tokio::test]
    async fn test_consumer_reads_current_snapshot_eagerly() {
        let reader = Arc::new(ScriptedReader::new("box"));
        reader.push_ok(values(&[("temp", "21"), ("dsl_downstream", "100000")]));
        let coordinator = coordinator(reader);
        coordinator.refresh().await.unwrap();

        let consumer = AttributeConsumer::new(
            &coordinator,
            &definition(
                "dsl_downstream",
                Some("UnitOfDataRate.KILOBITS_PER_SECOND"),
                Some("SensorDeviceClass.DATA_RATE"),
            ),
            DeviceRegistry::new(),
        )
        .unwrap();

        assert_eq!(consumer.last_value().as_deref(), Some("100000"));
        assert!(consumer.available());
        assert!(consumer.take_fresh());
        assert!(!consumer.take_fresh());
        assert_eq!(consumer.unit(), Some(UnitOfMeasurement::KilobitsPerSecond));
        assert_eq!(consumer.device_class(), Some(DeviceClass::DataRate));
        assert_eq!(consumer.unique_id(), "easybox_connect.dsl_downstream");
        assert_eq!(consumer.name(), "dsl_downstream name");
        assert_eq!(
            consumer.extra_state_attributes().get("idx").map(String::as_str),
            Some("dsl_downstream")
        );
    }

    #[test]
    fn test_update_overwrites_value_and_marks_fresh() {
        let coordinator = coordinator(Arc::new(ScriptedReader::new("box")));
        let consumer = AttributeConsumer::new(
            &coordinator,
            &definition("temp", Some("unknown"), None),
            DeviceRegistry::new(),
        )
        .unwrap();
        assert_eq!(consumer.unit(), None);

        consumer.on_snapshot_updated("22");
        assert_eq!(consumer.last_value().as_deref(), Some("22"));
        assert!(consumer.take_fresh());

        consumer.on_snapshot_updated("23");
        assert_eq!(consumer.last_value().as_deref(), Some("23"));
    }

    #[test]
    fn test_device_info_is_a_lookup() {
        let coordinator = coordinator(Arc::new(ScriptedReader::new("box")));
        let devices = DeviceRegistry::new();
        let consumer =
            AttributeConsumer::new(&coordinator, &definition("temp", None, None), devices.clone())
                .unwrap();

        devices.publish(DeviceDescriptor {
            identifier: (DOMAIN.to_string(), "dev01".to_string()),
            name: "EasyBox 804".to_string(),
            manufacturer: "Vodafone".to_string(),
            model: "EasyBox".to_string(),
            sw_version: "1.0".to_string(),
        });

        assert_eq!(consumer.device_info().unwrap().name, "EasyBox 804");
    }
}
