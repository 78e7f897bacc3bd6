//! Credential set for the mutually authenticated broker connection.
//!
//! The three PEM blobs are handed to rustls untouched. Nothing here parses or
//! validates them: a broken certificate only shows up as a failed connection
//! attempt, the same way an unreachable broker does.

use color_eyre::{eyre::eyre, Result};
use rumqttc::Transport;
use std::fmt;
use tracing::{debug, info};

use super::config::TlsConfig;

#[derive(Clone, PartialEq, Eq)]
pub struct TlsCredentials {
    root_ca: Vec<u8>,
    client_cert: Vec<u8>,
    client_key: Vec<u8>,
}

impl TlsCredentials {
    /// Stores the credentials for later connection attempts.
    pub fn configure(
        root_ca: impl Into<Vec<u8>>,
        client_cert: impl Into<Vec<u8>>,
        client_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            root_ca: root_ca.into(),
            client_cert: client_cert.into(),
            client_key: client_key.into(),
        }
    }

    /// Reads the three PEM files named in the configuration.
    pub async fn load(config: &TlsConfig) -> Result<Self> {
        info!("Loading TLS credentials");

        let root_ca = tokio::fs::read(&config.root_ca).await.map_err(|e| {
            eyre!(
                "Failed to read root CA {}: {}",
                config.root_ca.display(),
                e
            )
        })?;
        let client_cert = tokio::fs::read(&config.client_cert).await.map_err(|e| {
            eyre!(
                "Failed to read client certificate {}: {}",
                config.client_cert.display(),
                e
            )
        })?;
        let client_key = tokio::fs::read(&config.client_key).await.map_err(|e| {
            eyre!(
                "Failed to read client key {}: {}",
                config.client_key.display(),
                e
            )
        })?;

        let credentials = Self::configure(root_ca, client_cert, client_key);
        debug!("Loaded {:?}", credentials);
        Ok(credentials)
    }

    /// Builds the rustls transport used for a single connection attempt.
    pub fn transport(&self) -> Transport {
        Transport::tls(
            self.root_ca.clone(),
            Some((self.client_cert.clone(), self.client_key.clone())),
            None,
        )
    }
}

// Never print key material.
impl fmt::Debug for TlsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("root_ca_bytes", &self.root_ca.len())
            .field("client_cert_bytes", &self.client_cert.len())
            .field("client_key_bytes", &self.client_key.len())
            .finish()
    }
}
