pub mod board;
pub mod bridge;
pub mod config;
pub mod mqtt;
pub mod network;
pub mod relay;
pub mod sensor;

use crate::board::Board;
use crate::bridge::ControlLoop;
use crate::config::BridgeConfig;
use crate::mqtt::{MqttSession, RumqttLink, TlsCredentials};
use crate::network::SysfsInterface;
use crate::relay::RelayDispatcher;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    BridgeConfig::ensure_default_config(&config_path).await?;
    let config = BridgeConfig::load(&config_path).await?;
    info!("Loaded configuration from {}", config_path.display());

    // Relay pins and ADC
    let board = Board::open(&config.relays, &config.sensors)
        .map_err(|e| eyre!("Failed to bring up board: {}", e))?
        .configure();
    let (relays, sampler) = board.into_parts();

    // Network
    let interface = SysfsInterface::new(&config.network);
    network::wait_for_network(&interface, interface.ssid(), config.timing.network_poll()).await;

    // Broker session
    let credentials = TlsCredentials::load(&config.tls).await?;
    let link = RumqttLink::new(&config.broker, credentials, config.timing.connect_timeout());
    let mut session = MqttSession::new(
        link,
        &config.broker,
        config.timing.reconnect_backoff(),
        config.timing.service_window(),
    );
    info!("Broker: {}", config.broker);
    session.ensure_connected().await;

    ControlLoop::new(
        session,
        RelayDispatcher::new(relays),
        sampler,
        config.timing.publish_interval(),
    )
    .run()
    .await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
