//! Broker session lifecycle.
//!
//! # State Machine
//!
//! ```text
//!               connect + subscribe ok
//! Disconnected ───────────────────────► Connected
//!      ▲                                    │
//!      └────────── link no longer alive ────┘
//! ```
//!
//! The session starts `Disconnected`. [`MqttSession::ensure_connected`] blocks
//! until the session is `Connected`, retrying forever with a fixed backoff.
//! [`MqttSession::service`] must run once per control-loop iteration while
//! connected; it drives keepalives and hands each control message to the
//! registered handler exactly once.

use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::MqttConfig;
use super::link::BrokerLink;
use super::message::MessageHandler;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not connected to broker")]
    NotConnected,

    #[error("Invalid client identifier '{0}'")]
    InvalidClientId(String),

    #[error("Broker refused connection: {0}")]
    Refused(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Transport error: {0}")]
    Transport(#[from] rumqttc::ConnectionError),

    #[error("Client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
}

#[derive(Clone, Debug, Default)]
pub struct SessionStatus {
    pub connection_state: ConnectionState,
    pub connect_attempts: usize,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub publish_failures: usize,
    pub last_activity: Option<DateTime<Local>>,
}

pub struct MqttSession<L: BrokerLink> {
    link: L,
    client_id: String,
    sensor_topic: String,
    control_topic: String,
    reconnect_backoff: Duration,
    service_window: Duration,
    status: SessionStatus,
}

impl<L: BrokerLink> MqttSession<L> {
    pub fn new(
        link: L,
        config: &MqttConfig,
        reconnect_backoff: Duration,
        service_window: Duration,
    ) -> Self {
        MqttSession {
            link,
            client_id: config.client_id.clone(),
            sensor_topic: config.sensor_topic.clone(),
            control_topic: config.control_topic.clone(),
            reconnect_backoff,
            service_window,
            status: SessionStatus::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.status.connection_state
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn sensor_topic(&self) -> &str {
        &self.sensor_topic
    }

    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.status.connection_state != state {
            debug!(
                "Session state {:?} -> {:?}",
                self.status.connection_state, state
            );
            self.status.connection_state = state;
        }
    }

    /// A single connection attempt: handshake, then subscribe to the control topic.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        self.status.connect_attempts += 1;
        self.set_state(ConnectionState::Disconnected);

        self.link.connect(&self.client_id).await?;
        self.link.subscribe(&self.control_topic).await?;

        self.set_state(ConnectionState::Connected);
        self.status.last_activity = Some(Local::now());
        Ok(())
    }

    /// Moves to `Disconnected` if the link has gone away.
    pub fn check_alive(&mut self) -> ConnectionState {
        if self.state() == ConnectionState::Connected && !self.link.is_alive() {
            match self.status.last_activity {
                Some(at) => warn!(
                    "Lost connection to broker (last activity {})",
                    at.format("%H:%M:%S")
                ),
                None => warn!("Lost connection to broker"),
            }
            self.set_state(ConnectionState::Disconnected);
        }
        self.state()
    }

    /// Blocks until connected. Retries forever with a fixed backoff.
    pub async fn ensure_connected(&mut self) {
        while self.check_alive() == ConnectionState::Disconnected {
            info!("Connecting to broker as '{}'...", self.client_id);
            match self.connect().await {
                Ok(()) => {
                    info!(
                        "Connected, subscribed to '{}' (attempt {})",
                        self.control_topic, self.status.connect_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Connection failed: {}. Retrying in {}ms",
                        e,
                        self.reconnect_backoff.as_millis()
                    );
                    tokio::time::sleep(self.reconnect_backoff).await;
                }
            }
        }
    }

    /// Drives the link for one service window and delivers control messages.
    pub async fn service(&mut self, handler: &mut dyn MessageHandler) {
        if self.check_alive() != ConnectionState::Connected {
            return;
        }

        let messages = match self.link.poll(self.service_window).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Session service failed: {}", e);
                self.check_alive();
                return;
            }
        };

        for message in messages {
            if message.topic != self.control_topic {
                debug!("Ignoring message on unexpected topic '{}'", message.topic);
                continue;
            }
            debug!("Delivering {}", message);
            self.status.messages_received += 1;
            self.status.last_activity = Some(message.received_at);
            handler.on_message(&message.topic, &message.payload);
        }

        // The link may have dropped after handing out what it had read.
        self.check_alive();
    }

    /// Best-effort publish. No retry and no queueing on failure.
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        if self.check_alive() != ConnectionState::Connected {
            self.status.publish_failures += 1;
            return Err(SessionError::NotConnected);
        }

        match self.link.publish(topic, payload).await {
            Ok(()) => {
                self.status.messages_sent += 1;
                self.status.last_activity = Some(Local::now());
                Ok(())
            }
            Err(e) => {
                self.status.publish_failures += 1;
                self.check_alive();
                Err(e)
            }
        }
    }

    pub async fn publish_telemetry(&mut self, payload: &str) -> Result<(), SessionError> {
        let topic = self.sensor_topic.clone();
        self.publish(&topic, payload.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::message::InboundMessage;
    use crate::mqtt::testing::FakeLink;
    use tokio::time::Instant;

    const BACKOFF: Duration = Duration::from_secs(2);

    #[derive(Default)]
    struct Collector {
        received: Vec<(String, Vec<u8>)>,
    }

    impl MessageHandler for Collector {
        fn on_message(&mut self, topic: &str, payload: &[u8]) {
            self.received.push((topic.to_string(), payload.to_vec()));
        }
    }

    fn session(link: FakeLink) -> MqttSession<FakeLink> {
        MqttSession::new(
            link,
            &MqttConfig::default(),
            BACKOFF,
            Duration::from_millis(100),
        )
    }

    #[test]
    fn starts_disconnected() {
        let session = session(FakeLink::default());
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.status().connect_attempts, 0);
    }

    #[tokio::test]
    async fn connect_subscribes_to_control_topic() {
        let mut session = session(FakeLink::default());

        session.connect().await.unwrap();

        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(session.link().client_ids, vec!["ESP32Client".to_string()]);
        assert_eq!(
            session.link().subscriptions,
            vec!["home/automation/control".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_converges_after_n_plus_one_attempts() {
        const FAILURES: usize = 3;
        let mut session = session(FakeLink::failing(FAILURES));

        session.ensure_connected().await;

        assert_eq!(session.state(), ConnectionState::Connected);
        let attempts = &session.link().attempts;
        assert_eq!(attempts.len(), FAILURES + 1);
        assert_eq!(session.status().connect_attempts, FAILURES + 1);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= BACKOFF);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_is_immediate() {
        let start = Instant::now();
        let mut session = session(FakeLink::default());

        session.ensure_connected().await;

        assert_eq!(session.link().attempts.len(), 1);
        assert!(session.link().attempts[0] - start < BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_subscribe_counts_as_failed_attempt() {
        let mut link = FakeLink::default();
        link.subscribe_failures = 1;
        let mut session = session(link);

        session.ensure_connected().await;

        assert_eq!(session.status().connect_attempts, 2);
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_link_is_detected_and_reconnected() {
        let mut session = session(FakeLink::default());
        session.ensure_connected().await;

        session.link_mut().alive = false;
        assert_eq!(session.check_alive(), ConnectionState::Disconnected);

        session.ensure_connected().await;
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(session.link().attempts.len(), 2);
    }

    #[tokio::test]
    async fn service_delivers_each_control_message_once_in_order() {
        let mut session = session(FakeLink::default());
        session.connect().await.unwrap();
        session
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("home/automation/control", "RELAY1_ON"));
        session
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("home/automation/control", "RELAY1_OFF"));

        let mut collector = Collector::default();
        session.service(&mut collector).await;
        session.service(&mut collector).await;

        assert_eq!(
            collector.received,
            vec![
                ("home/automation/control".to_string(), b"RELAY1_ON".to_vec()),
                ("home/automation/control".to_string(), b"RELAY1_OFF".to_vec()),
            ]
        );
        assert_eq!(session.status().messages_received, 2);
    }

    #[tokio::test]
    async fn service_delivers_messages_read_before_a_drop() {
        let mut session = session(FakeLink::default());
        session.connect().await.unwrap();
        session.link_mut().drop_after_poll = true;
        session
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("home/automation/control", "RELAY1_ON"));

        let mut collector = Collector::default();
        session.service(&mut collector).await;

        assert_eq!(
            collector.received,
            vec![("home/automation/control".to_string(), b"RELAY1_ON".to_vec())]
        );
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn service_ignores_foreign_topics() {
        let mut session = session(FakeLink::default());
        session.connect().await.unwrap();
        session
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("esp32/sensordata", "RELAY1_ON"));

        let mut collector = Collector::default();
        session.service(&mut collector).await;

        assert!(collector.received.is_empty());
    }

    #[tokio::test]
    async fn service_is_a_noop_while_disconnected() {
        let mut session = session(FakeLink::default());
        session
            .link_mut()
            .inbound
            .push_back(InboundMessage::new("home/automation/control", "RELAY1_ON"));

        let mut collector = Collector::default();
        session.service(&mut collector).await;

        assert!(collector.received.is_empty());
        assert_eq!(session.link().polls, 0);
    }

    #[tokio::test]
    async fn publish_failure_is_reported_and_not_retried() {
        let mut session = session(FakeLink::default());
        session.connect().await.unwrap();
        session.link_mut().fail_publish = true;

        assert!(session.publish_telemetry("{}").await.is_err());
        assert!(session.link().published.is_empty());
        assert_eq!(session.status().publish_failures, 1);

        session.link_mut().fail_publish = false;
        session.publish_telemetry("{\"gas\": 1.00}").await.unwrap();
        assert_eq!(
            session.link().published,
            vec![(
                "esp32/sensordata".to_string(),
                b"{\"gas\": 1.00}".to_vec()
            )]
        );
    }

    #[tokio::test]
    async fn publish_while_disconnected_fails_without_touching_link() {
        let mut session = session(FakeLink::default());

        let result = session.publish_telemetry("{}").await;

        assert!(matches!(result, Err(SessionError::NotConnected)));
        assert!(session.link().published.is_empty());
    }
}
