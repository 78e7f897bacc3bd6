//! # Bridge configuration
//!
//! Everything the device needs at startup lives in one TOML file: network
//! interface, broker endpoint and topics, certificate paths, relay pins,
//! analog channels and loop timing. Every field has a default, so a partial
//! file (or an empty one) is valid.
//!
//! The file is looked up at the path given as the first command-line argument,
//! falling back to `~/.config/relay-bridge/config.toml`. If it does not exist a
//! default one is written there so the user has something to edit.

use crate::mqtt::config::{MqttConfig, TlsConfig};
use crate::sensor::{IioAdc, SensorChannels};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/relay-bridge";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    pub network: NetworkConfig,
    pub broker: MqttConfig,
    pub tls: TlsConfig,
    pub relays: RelayConfig,
    pub sensors: SensorConfig,
    pub timing: TimingConfig,
}

/// Network interface the device reaches the broker through.
///
/// Association itself (SSID/passphrase) is handled by the operating system;
/// the SSID here is only reported in logs.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub interface: String,
    pub ssid: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface: "wlan0".to_string(),
            ssid: "your_wifi_ssid".to_string(),
        }
    }
}

/// BCM pin number for relays 1 to 4.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    pub pins: [u8; 4],
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            pins: [23, 22, 21, 19],
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SensorConfig {
    /// IIO device directory holding the `in_voltage<n>_raw` files
    pub iio_device: PathBuf,
    pub channels: SensorChannels,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            iio_device: PathBuf::from(IioAdc::DEFAULT_DEVICE),
            channels: SensorChannels::default(),
        }
    }
}

/// Loop timing, all in milliseconds.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep at the end of every control-loop iteration
    pub publish_interval_ms: u64,
    /// Wait between failed broker connection attempts
    pub reconnect_backoff_ms: u64,
    /// Poll interval while waiting for the network interface
    pub network_poll_ms: u64,
    /// How long each service call drives the MQTT event loop
    pub service_window_ms: u64,
    /// Upper bound for CONNACK/SUBACK/publish write
    pub connect_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 5000,
            reconnect_backoff_ms: 2000,
            network_poll_ms: 1000,
            service_window_ms: 100,
            connect_timeout_ms: 10_000,
        }
    }
}

impl TimingConfig {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn network_poll(&self) -> Duration {
        Duration::from_millis(self.network_poll_ms)
    }

    pub fn service_window(&self) -> Duration {
        Duration::from_millis(self.service_window_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl BridgeConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

        let config: BridgeConfig = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;

        info!("Configuration written to {}", path.display());
        Ok(())
    }

    /// Writes a default configuration to `path` unless a file already exists.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }

        info!("Creating default configuration at {}", path.display());
        BridgeConfig::default().save(path).await
    }
}

pub fn default_config_path() -> PathBuf {
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
