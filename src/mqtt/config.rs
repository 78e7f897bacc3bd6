use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default port for MQTT over TLS.
pub const DEFAULT_TLS_PORT: u16 = 8883;

/// Broker endpoint, session identity and the two fixed topics.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname (e.g. an AWS IoT Core endpoint)
    pub host: String,
    pub port: u16,
    /// Client identifier presented in CONNECT
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Outbound telemetry topic
    pub sensor_topic: String,
    /// Inbound relay command topic
    pub control_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_TLS_PORT,
            client_id: "ESP32Client".to_string(),
            keep_alive_secs: 15,
            sensor_topic: "esp32/sensordata".to_string(),
            control_topic: "home/automation/control".to_string(),
        }
    }
}

impl fmt::Display for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}:{}", self.client_id, self.host, self.port)
    }
}

/// Locations of the three PEM files used for mutual TLS.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TlsConfig {
    pub root_ca: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            root_ca: PathBuf::from("certs/AmazonRootCA1.pem"),
            client_cert: PathBuf::from("certs/certificate.pem.crt"),
            client_key: PathBuf::from("certs/private.pem.key"),
        }
    }
}
