//! # MQTT Broker Session
//!
//! Everything between the control loop and the cloud broker: the
//! mutual-TLS credential set, the wire link, and the connected/disconnected
//! session lifecycle with its reconnect loop.
//!
//! ```text
//! mqtt/
//! ├── config.rs   - Broker endpoint, client id, topics, certificate paths
//! ├── tls.rs      - Credential set and rustls transport
//! ├── link.rs     - BrokerLink trait and the rumqttc implementation
//! ├── message.rs  - Inbound message and the MessageHandler callback
//! └── session.rs  - Session state machine, reconnect policy, publish
//! ```
//!
//! Outbound: `MqttSession::publish` → `BrokerLink::publish` → TLS socket.
//! Inbound: TLS socket → `BrokerLink::poll` → `MqttSession::service` →
//! `MessageHandler::on_message`, synchronously and in delivery order.

pub mod config;
pub mod link;
pub mod message;
pub mod session;
pub mod tls;

pub use config::{MqttConfig, TlsConfig};
pub use link::{BrokerLink, RumqttLink};
pub use message::{InboundMessage, MessageHandler};
pub use session::{ConnectionState, MqttSession, SessionError, SessionStatus};
pub use tls::TlsCredentials;
