use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, info};

use super::command::{RelayChannel, RelayCommand, RelayLevel};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// A single digital output line driving one relay.
pub trait RelayOutput {
    fn pin(&self) -> u8;

    /// rppal pin writes cannot fail; the `Result` is for outputs that can
    /// report a failed write.
    fn set_level(&mut self, level: RelayLevel) -> Result<(), RelayError>;
}

/// Relay output on a Raspberry Pi GPIO pin (BCM numbering), active-high.
pub struct GpioRelay {
    pin: OutputPin,
}

impl GpioRelay {
    /// Claims `pin` and configures it as an output. The current level is kept.
    pub fn open(gpio: &Gpio, pin: u8) -> Result<Self, RelayError> {
        let mut output = gpio.get(pin)?.into_output();
        // Relay state is left as-is when the process exits.
        output.set_reset_on_drop(false);
        debug!("GPIO {} configured as output", pin);
        Ok(Self { pin: output })
    }
}

impl RelayOutput for GpioRelay {
    fn pin(&self) -> u8 {
        self.pin.pin()
    }

    fn set_level(&mut self, level: RelayLevel) -> Result<(), RelayError> {
        match level {
            RelayLevel::High => self.pin.set_high(),
            RelayLevel::Low => self.pin.set_low(),
        }
        Ok(())
    }
}

/// Four independent relays.
///
/// The logical level of a channel is `None` until the first command for it,
/// then always the last level written.
pub struct RelayBank {
    outputs: [Box<dyn RelayOutput>; 4],
    levels: [Option<RelayLevel>; 4],
}

impl RelayBank {
    pub fn new(outputs: [Box<dyn RelayOutput>; 4]) -> Self {
        Self {
            outputs,
            levels: [None; 4],
        }
    }

    /// Opens the four GPIO pins in channel order.
    pub fn open_gpio(pins: [u8; 4]) -> Result<Self, RelayError> {
        info!("Configuring relay pins {:?} as outputs", pins);
        let gpio = Gpio::new()?;
        let [p1, p2, p3, p4] = pins;
        Ok(Self::new([
            Box::new(GpioRelay::open(&gpio, p1)?),
            Box::new(GpioRelay::open(&gpio, p2)?),
            Box::new(GpioRelay::open(&gpio, p3)?),
            Box::new(GpioRelay::open(&gpio, p4)?),
        ]))
    }

    /// Exactly one pin write. The logical level only changes if the write succeeds.
    pub fn apply(&mut self, command: RelayCommand) -> Result<(), RelayError> {
        let index = command.channel.index();
        self.outputs[index].set_level(command.level)?;
        self.levels[index] = Some(command.level);
        Ok(())
    }

    pub fn level(&self, channel: RelayChannel) -> Option<RelayLevel> {
        self.levels[channel.index()]
    }

    pub fn levels(&self) -> [Option<RelayLevel>; 4] {
        self.levels
    }

    pub fn pin(&self, channel: RelayChannel) -> u8 {
        self.outputs[channel.index()].pin()
    }
}
