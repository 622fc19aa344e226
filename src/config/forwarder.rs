use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Outbound channel to the storage subsystem.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ForwarderConfig {
    /// Capacity of the bounded storage request channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long a full channel may block a forward before the fact is dropped
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl ForwarderConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::invalid_config(
                "forwarder.channel_capacity",
                "must be greater than 0",
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(Error::invalid_config(
                "forwarder.send_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn default_channel_capacity() -> usize {
    1024
}
fn default_send_timeout_ms() -> u64 {
    1000
}
