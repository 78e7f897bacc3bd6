use tracing::{error, info};

use super::bank::RelayBank;
use super::command::RelayCommand;
use crate::mqtt::MessageHandler;

/// Turns control-topic payloads into relay writes.
pub struct RelayDispatcher {
    bank: RelayBank,
}

impl RelayDispatcher {
    pub fn new(bank: RelayBank) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &RelayBank {
        &self.bank
    }

    /// Applies `text` if it is one of the eight command literals.
    ///
    /// Unrecognised text has no side effects. Returns the command that was
    /// applied, if any.
    pub fn dispatch(&mut self, text: &str) -> Option<RelayCommand> {
        let command = RelayCommand::parse(text)?;
        match self.bank.apply(command) {
            Ok(()) => {
                info!("{} is {}", command.channel, command.level);
                Some(command)
            }
            Err(e) => {
                error!(
                    "Failed to switch {} (GPIO {}): {}",
                    command.channel,
                    self.bank.pin(command.channel),
                    e
                );
                None
            }
        }
    }
}

impl MessageHandler for RelayDispatcher {
    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        let message = String::from_utf8_lossy(payload);
        info!("Message arrived [{}]: {}", topic, message);
        self.dispatch(&message);
    }
}
