use tracing::debug;

use super::adc::{AnalogInput, SensorError};
use super::{SensorChannels, SensorReading};

/// Reads the three telemetry channels. No conversion: the raw ADC counts are
/// the reported values.
pub struct Sampler {
    input: Box<dyn AnalogInput>,
    channels: SensorChannels,
}

impl Sampler {
    pub fn new(input: Box<dyn AnalogInput>, channels: SensorChannels) -> Self {
        Self { input, channels }
    }

    pub fn channels(&self) -> SensorChannels {
        self.channels
    }

    pub fn sample(&mut self) -> Result<SensorReading, SensorError> {
        let temperature = self.input.read_raw(self.channels.temperature)?;
        let humidity = self.input.read_raw(self.channels.humidity)?;
        let gas = self.input.read_raw(self.channels.gas)?;

        let reading = SensorReading::new(temperature as f32, humidity as f32, gas as f32);
        debug!("Sampled {:?}", reading);
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::testing::FixedInput;

    #[test]
    fn sample_passes_raw_values_through() {
        let input = FixedInput::new([(0, 12), (1, 7), (2, 300)]);
        let mut sampler = Sampler::new(Box::new(input), SensorChannels::default());

        let reading = sampler.sample().unwrap();

        assert_eq!(reading.temperature, 12.0);
        assert_eq!(reading.humidity, 7.0);
        assert_eq!(reading.gas, 300.0);
    }

    #[test]
    fn sample_uses_configured_channels() {
        let input = FixedInput::new([(34, 1), (35, 2), (36, 4095)]);
        let channels = SensorChannels {
            temperature: 34,
            humidity: 35,
            gas: 36,
        };
        let mut sampler = Sampler::new(Box::new(input), channels);

        assert_eq!(
            sampler.sample().unwrap().to_payload(),
            r#"{"temperature": 1.00, "humidity": 2.00, "gas": 4095.00}"#
        );
    }

    #[test]
    fn failing_channel_fails_the_sample() {
        let input = FixedInput::new([(0, 1), (2, 3)]);
        let mut sampler = Sampler::new(Box::new(input), SensorChannels::default());

        assert!(matches!(
            sampler.sample(),
            Err(SensorError::Read { channel: 1, .. })
        ));
    }
}
