//! Byte-level access to the broker.
//!
//! [`BrokerLink`] is the seam between the session state machine and the wire.
//! [`RumqttLink`] drives a `rumqttc` event loop over the mutual-TLS transport;
//! tests substitute an in-memory link.

use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::config::MqttConfig;
use super::message::InboundMessage;
use super::session::SessionError;
use super::tls::TlsCredentials;

/// Capacity of the rumqttc request channel between client and event loop.
const REQUEST_CAPACITY: usize = 10;

#[allow(async_fn_in_trait)]
pub trait BrokerLink {
    /// Opens the transport and performs the CONNECT/CONNACK handshake.
    async fn connect(&mut self, client_id: &str) -> Result<(), SessionError>;

    async fn subscribe(&mut self, topic: &str) -> Result<(), SessionError>;

    /// Best-effort publish. `Ok` means the packet was written to the transport.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError>;

    /// Drives the connection for at most `window`: reads inbound packets and
    /// sends keepalives. Returns the messages received, in delivery order.
    ///
    /// Messages already received are returned even if the connection drops
    /// inside the window; the drop is then reported by `is_alive`.
    async fn poll(&mut self, window: Duration) -> Result<Vec<InboundMessage>, SessionError>;

    /// Whether the transport is still believed to be up.
    fn is_alive(&self) -> bool;
}

pub struct RumqttLink {
    host: String,
    port: u16,
    keep_alive: Duration,
    connect_timeout: Duration,
    transport: Transport,
    client: Option<AsyncClient>,
    event_loop: Option<EventLoop>,
    // Publishes that arrived while waiting for an ack; handed out by the next poll.
    pending: VecDeque<InboundMessage>,
    alive: bool,
}

impl RumqttLink {
    pub fn new(config: &MqttConfig, credentials: TlsCredentials, connect_timeout: Duration) -> Self {
        Self::with_transport(config, credentials.transport(), connect_timeout)
    }

    fn with_transport(config: &MqttConfig, transport: Transport, connect_timeout: Duration) -> Self {
        RumqttLink {
            host: config.host.clone(),
            port: config.port,
            keep_alive: Duration::from_secs(config.keep_alive_secs),
            connect_timeout,
            transport,
            client: None,
            event_loop: None,
            pending: VecDeque::new(),
            alive: false,
        }
    }

    fn options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options
            .set_keep_alive(self.keep_alive)
            .set_clean_session(true)
            .set_transport(self.transport.clone());
        options
    }

    fn drop_connection(&mut self) {
        self.alive = false;
        self.client = None;
        self.event_loop = None;
    }

    /// Polls the event loop until `done` matches an event or `deadline` passes.
    async fn drive_until<F>(&mut self, deadline: Instant, mut done: F) -> Result<bool, SessionError>
    where
        F: FnMut(&Event) -> bool,
    {
        let Some(event_loop) = self.event_loop.as_mut() else {
            return Err(SessionError::NotConnected);
        };

        let result = loop {
            match timeout_at(deadline, event_loop.poll()).await {
                Err(_) => break Ok(false),
                Ok(Ok(event)) => {
                    if let Event::Incoming(Packet::Publish(publish)) = &event {
                        debug!(
                            "Received publish on '{}' ({} bytes)",
                            publish.topic,
                            publish.payload.len()
                        );
                        self.pending.push_back(InboundMessage::new(
                            publish.topic.clone(),
                            publish.payload.to_vec(),
                        ));
                    }
                    if done(&event) {
                        break Ok(true);
                    }
                }
                Ok(Err(ConnectionError::ConnectionRefused(code))) => {
                    break Err(SessionError::Refused(format!("{:?}", code)))
                }
                Ok(Err(e)) => break Err(SessionError::Transport(e)),
            }
        };

        if result.is_err() {
            self.drop_connection();
        }
        result
    }
}

impl BrokerLink for RumqttLink {
    async fn connect(&mut self, client_id: &str) -> Result<(), SessionError> {
        self.drop_connection();

        // MqttOptions::new panics on these.
        if client_id.is_empty() || client_id.starts_with(' ') {
            return Err(SessionError::InvalidClientId(client_id.to_string()));
        }

        info!(
            "Opening TLS session to {}:{} as '{}'",
            self.host, self.port, client_id
        );
        let (client, event_loop) = AsyncClient::new(self.options(client_id), REQUEST_CAPACITY);
        self.client = Some(client);
        self.event_loop = Some(event_loop);

        // A refused CONNACK surfaces as ConnectionError::ConnectionRefused.
        let deadline = Instant::now() + self.connect_timeout;
        let acked = self
            .drive_until(deadline, |event| {
                matches!(event, Event::Incoming(Packet::ConnAck(_)))
            })
            .await?;

        if !acked {
            self.drop_connection();
            return Err(SessionError::Timeout("CONNACK"));
        }

        self.alive = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), SessionError> {
        let client = self.client.as_ref().ok_or(SessionError::NotConnected)?;
        client.subscribe(topic, QoS::AtMostOnce).await?;

        let deadline = Instant::now() + self.connect_timeout;
        let acked = self
            .drive_until(deadline, |event| {
                matches!(event, Event::Incoming(Packet::SubAck(_)))
            })
            .await?;
        if !acked {
            warn!("No SUBACK for '{}' before timeout", topic);
            return Err(SessionError::Timeout("SUBACK"));
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        let client = self.client.as_ref().ok_or(SessionError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .await?;

        let deadline = Instant::now() + self.connect_timeout;
        let written = self
            .drive_until(deadline, |event| {
                matches!(event, Event::Outgoing(Outgoing::Publish(_)))
            })
            .await?;
        if !written {
            return Err(SessionError::Timeout("outgoing PUBLISH"));
        }
        Ok(())
    }

    async fn poll(&mut self, window: Duration) -> Result<Vec<InboundMessage>, SessionError> {
        let deadline = Instant::now() + window;
        if let Err(e) = self.drive_until(deadline, |_| false).await {
            if self.pending.is_empty() {
                return Err(e);
            }
            warn!(
                "Connection lost after receiving {} message(s): {}",
                self.pending.len(),
                e
            );
        }
        Ok(self.pending.drain(..).collect())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}
