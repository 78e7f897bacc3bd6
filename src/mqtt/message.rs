use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fmt;

/// A message received on a subscribed topic.
///
/// Only lives for the duration of one handler call; the session never keeps
/// it around.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Local>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        InboundMessage {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Local::now(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.received_at.format("%H:%M:%S%.3f"),
            self.topic,
            self.text()
        )
    }
}

/// Receives inbound messages synchronously from `MqttSession::service`.
///
/// Implementations must return quickly; the control loop is blocked while
/// they run.
pub trait MessageHandler {
    fn on_message(&mut self, topic: &str, payload: &[u8]);
}
