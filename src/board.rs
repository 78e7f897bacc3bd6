//! Board bring-up with statum typestates
//!
//! ```text
//! Unconfigured ──configure()──► Ready ──into_parts()──► (RelayBank, Sampler)
//! ```
//!
//! Only a `Board<Ready>` can hand its relay bank and sampler to the control
//! loop, so the loop never runs against hardware that was not brought up.

use statum::{machine, state};
use tracing::{info, warn};

use crate::config::{RelayConfig, SensorConfig};
use crate::relay::{RelayBank, RelayChannel, RelayError};
use crate::sensor::{IioAdc, Sampler};

#[state]
#[derive(Debug, Clone)]
pub enum BoardState {
    Unconfigured,
    Ready,
}

#[machine]
pub struct Board<S: BoardState> {
    relays: RelayBank,
    sampler: Sampler,
}

impl Board<Unconfigured> {
    pub fn create(relays: RelayBank, sampler: Sampler) -> Self {
        Self::new(relays, sampler)
    }

    /// Claims the relay GPIO pins and opens the IIO ADC.
    pub fn open(relays: &RelayConfig, sensors: &SensorConfig) -> Result<Self, RelayError> {
        let bank = RelayBank::open_gpio(relays.pins)?;
        info!("Using ADC at {}", sensors.iio_device.display());
        let sampler = Sampler::new(
            Box::new(IioAdc::new(sensors.iio_device.clone())),
            sensors.channels,
        );
        Ok(Self::create(bank, sampler))
    }

    /// Reports the pin map and takes a first sample as a self-check.
    ///
    /// A failed sample is only logged; the control loop will keep retrying.
    pub fn configure(mut self) -> Board<Ready> {
        for channel in RelayChannel::ALL {
            info!("{} on GPIO {}", channel, self.relays.pin(channel));
        }

        let channels = self.sampler.channels();
        info!(
            "Sensor channels: temperature={}, humidity={}, gas={}",
            channels.temperature, channels.humidity, channels.gas
        );
        match self.sampler.sample() {
            Ok(reading) => info!("Initial reading: {}", reading.to_payload()),
            Err(e) => warn!("Initial sensor read failed: {}", e),
        }

        info!("Board ready");
        self.transition()
    }
}

impl Board<Ready> {
    pub fn into_parts(self) -> (RelayBank, Sampler) {
        (self.relays, self.sampler)
    }
}
