// Hint strings in the catalog name host-side semantic classes. They are
// resolved once, when a consumer is built; anything unrecognised is absent.

/// Tag on a `routerInfo` entry marking it as the firmware version
pub const FIRMWARE_VERSION_TAG: &str = "sw_version";

/// Semantic class of a polled attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    DataRate,
}

impl DeviceClass {
    pub fn from_hint(hint: Option<&str>) -> Option<Self> {
        match hint? {
            "SensorDeviceClass.DATA_RATE" => Some(Self::DataRate),
            _ => None,
        }
    }
}

/// Unit a polled attribute is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfMeasurement {
    KilobitsPerSecond,
}

impl UnitOfMeasurement {
    pub fn from_hint(hint: Option<&str>) -> Option<Self> {
        match hint? {
            "UnitOfDataRate.KILOBITS_PER_SECOND" => Some(Self::KilobitsPerSecond),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::KilobitsPerSecond => "kbit/s",
        }
    }
}
