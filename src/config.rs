//! Build-time constants and cloud identity.
//!
//! Timing and identity values the kit reports are fixed at build time. The
//! cloud identity is provisioned as a small JSON document and parsed
//! without allocation:
//!
//! ```rust
//! use cryptoauth_kit::config::CloudConfig;
//!
//! let json = br#"{
//!     "project_id": "demo",
//!     "region_id": "us-central1",
//!     "registry_id": "kits",
//!     "device_id": "kit-01"
//! }"#;
//! let config = CloudConfig::from_json(json).unwrap();
//!
//! assert_eq!(config.host, "mqtt.googleapis.com");
//! assert_eq!(config.publish_topic().unwrap(), "/devices/kit-01/events");
//! ```

use core::fmt::Write;

use heapless::String;
use serde::Deserialize;

/// Period of the system tick.
pub const TICK_PERIOD_MS: u32 = 10;

/// How long the kit protocol owns the I2C bus after each received line.
pub const KIT_HOLDOFF_MS: u32 = 5000;

/// Default 8-bit I2C address of the crypto device.
pub const DEFAULT_I2C_ADDRESS: u8 = 0xB0;

/// Key slot holding the device's signing key.
pub const SIGNING_KEY_SLOT: u16 = 0;

/// Name and version triples reported by the board `f` command, by index.
pub const FIRMWARE_VERSIONS: [(&str, [u8; 3]); 4] = [
    ("AT88CK101STK ", [0x01, 0x00, 0x05]),
    ("SHA204 ", [0x01, 0x03, 0x00]),
    ("AES132 ", [0x01, 0x01, 0x00]),
    ("ECC108 ", [0x01, 0x01, 0x00]),
];

/// Look up a firmware name and version for the board `f` command.
pub fn firmware_version(index: u8) -> Option<(&'static str, [u8; 3])> {
    FIRMWARE_VERSIONS.get(index as usize).copied()
}

/// Capacity of derived identifiers such as the MQTT client id.
pub const IDENTIFIER_SIZE_MAX: usize = 256;

/// A derived identifier.
pub type Identifier = String<IDENTIFIER_SIZE_MAX>;

/// Configuration errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The provisioning document is not valid JSON for [`CloudConfig`].
    Parse,
    /// A derived identifier does not fit into [`Identifier`].
    TooLong,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Parse => defmt::write!(f, "Parse"),
            Error::TooLong => defmt::write!(f, "TooLong"),
        }
    }
}

fn default_host() -> &'static str {
    "mqtt.googleapis.com"
}

fn default_port() -> u16 {
    443
}

/// Cloud IoT Core identity of this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CloudConfig<'a> {
    /// MQTT bridge host name.
    #[serde(default = "default_host")]
    pub host: &'a str,
    /// MQTT bridge port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Cloud project; also the JWT audience.
    pub project_id: &'a str,
    /// Region of the device registry.
    pub region_id: &'a str,
    /// Device registry.
    pub registry_id: &'a str,
    /// Device id inside the registry.
    pub device_id: &'a str,
}

impl<'a> CloudConfig<'a> {
    /// Parse a provisioning document.
    pub fn from_json(json: &'a [u8]) -> Result<Self, Error> {
        serde_json_core::from_slice(json)
            .map(|(config, _)| config)
            .map_err(|_| Error::Parse)
    }

    /// MQTT client id.
    pub fn client_id(&self) -> Result<Identifier, Error> {
        let mut id = Identifier::new();
        write!(
            id,
            "projects/{}/locations/{}/registries/{}/devices/{}",
            self.project_id, self.region_id, self.registry_id, self.device_id
        )
        .map_err(|_| Error::TooLong)?;
        Ok(id)
    }

    /// MQTT user name. The bridge ignores it.
    pub fn username(&self) -> &'static str {
        "unused"
    }

    /// Topic telemetry is published to.
    pub fn publish_topic(&self) -> Result<Identifier, Error> {
        self.device_topic("events")
    }

    /// Topic configuration updates arrive on.
    pub fn subscribe_topic(&self) -> Result<Identifier, Error> {
        self.device_topic("config")
    }

    fn device_topic(&self, leaf: &str) -> Result<Identifier, Error> {
        let mut topic = Identifier::new();
        write!(topic, "/devices/{}/{}", self.device_id, leaf).map_err(|_| Error::TooLong)?;
        Ok(topic)
    }
}
