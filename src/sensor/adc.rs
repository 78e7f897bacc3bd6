use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Failed to read analog channel {channel}: {source}")]
    Read {
        channel: u8,
        #[source]
        source: io::Error,
    },

    #[error("Analog channel {channel} returned unparsable value '{value}'")]
    Parse { channel: u8, value: String },
}

/// Raw analog-to-digital reads by channel index.
pub trait AnalogInput {
    fn read_raw(&mut self, channel: u8) -> Result<u16, SensorError>;
}

/// ADC exposed through the Linux Industrial I/O sysfs interface.
///
/// Channel `n` is read from `<device>/in_voltage<n>_raw`.
#[derive(Clone, Debug)]
pub struct IioAdc {
    device: PathBuf,
}

impl IioAdc {
    pub const DEFAULT_DEVICE: &'static str = "/sys/bus/iio/devices/iio:device0";

    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn channel_path(&self, channel: u8) -> PathBuf {
        self.device.join(format!("in_voltage{}_raw", channel))
    }
}

impl AnalogInput for IioAdc {
    fn read_raw(&mut self, channel: u8) -> Result<u16, SensorError> {
        let path = self.channel_path(channel);
        let content =
            std::fs::read_to_string(&path).map_err(|source| SensorError::Read { channel, source })?;
        let value = content.trim();
        debug!("{} = {}", path.display(), value);
        value.parse().map_err(|_| SensorError::Parse {
            channel,
            value: value.to_string(),
        })
    }
}
