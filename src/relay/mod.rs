//! Relay command dispatch
//!
//! ```text
//! control payload ──► RelayCommand::parse ──► RelayBank::apply ──► GPIO
//!                         (None: ignored)
//! ```
//!
//! Four channels, eight literals (`RELAY{1..4}_{ON|OFF}`), one pin write per
//! recognised command.

pub mod bank;
pub mod command;
pub mod dispatcher;

pub use bank::{GpioRelay, RelayBank, RelayError, RelayOutput};
pub use command::{RelayChannel, RelayCommand, RelayLevel};
pub use dispatcher::RelayDispatcher;
