//! Sensor sampling and telemetry formatting.
//!
//! The three fields are named temperature, humidity and gas but carry raw ADC
//! counts. No calibration is applied anywhere.

pub mod adc;
pub mod sampler;

pub use adc::{AnalogInput, IioAdc, SensorError};
pub use sampler::Sampler;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Analog channel index for each telemetry field.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SensorChannels {
    pub temperature: u8,
    pub humidity: u8,
    pub gas: u8,
}

impl Default for SensorChannels {
    fn default() -> Self {
        Self {
            temperature: 0,
            humidity: 1,
            gas: 2,
        }
    }
}

/// One sample. Discarded after it has been published.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorReading {
    pub temperature: f32,
    pub humidity: f32,
    pub gas: f32,
    pub sampled_at: DateTime<Local>,
}

impl SensorReading {
    pub fn new(temperature: f32, humidity: f32, gas: f32) -> Self {
        Self {
            temperature,
            humidity,
            gas,
            sampled_at: Local::now(),
        }
    }

    /// Single-line telemetry payload with two decimals per field.
    pub fn to_payload(&self) -> String {
        format!(
            "{{\"temperature\": {:.2}, \"humidity\": {:.2}, \"gas\": {:.2}}}",
            self.temperature, self.humidity, self.gas
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_has_two_decimals() {
        let reading = SensorReading::new(12.0, 7.5, 300.0);
        assert_eq!(
            reading.to_payload(),
            r#"{"temperature": 12.00, "humidity": 7.50, "gas": 300.00}"#
        );
    }

    #[test]
    fn payload_rounds_to_two_places() {
        let reading = SensorReading::new(0.124, 1.999, 4095.0);
        assert_eq!(
            reading.to_payload(),
            r#"{"temperature": 0.12, "humidity": 2.00, "gas": 4095.00}"#
        );
    }
}
