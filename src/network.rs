use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::NetworkConfig;

/// Anything that can tell whether the device has network connectivity.
pub trait NetworkLink {
    fn is_up(&self) -> bool;
}

/// Interface state from `/sys/class/net/<iface>/operstate`.
///
/// A wireless interface only reports `up` once it is associated.
pub struct SysfsInterface {
    name: String,
    ssid: String,
    operstate: PathBuf,
}

impl SysfsInterface {
    pub fn new(config: &NetworkConfig) -> Self {
        Self::with_sysfs_root(config, "/sys/class/net")
    }

    pub fn with_sysfs_root(config: &NetworkConfig, root: impl Into<PathBuf>) -> Self {
        let mut operstate = root.into();
        operstate.push(&config.interface);
        operstate.push("operstate");
        Self {
            name: config.interface.clone(),
            ssid: config.ssid.clone(),
            operstate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }
}

impl NetworkLink for SysfsInterface {
    fn is_up(&self) -> bool {
        match std::fs::read_to_string(&self.operstate) {
            Ok(state) => state.trim() == "up",
            Err(e) => {
                debug!("Cannot read {}: {}", self.operstate.display(), e);
                false
            }
        }
    }
}

/// Blocks until `link` is up, checking every `poll`. Returns the number of
/// checks that were needed.
pub async fn wait_for_network(link: &impl NetworkLink, network: &str, poll: Duration) -> usize {
    let mut checks = 1;
    while !link.is_up() {
        info!("Connecting to network '{}'...", network);
        tokio::time::sleep(poll).await;
        checks += 1;
    }
    info!("Connected to network '{}'", network);
    checks
}
