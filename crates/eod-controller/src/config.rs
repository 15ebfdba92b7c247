//! Controller configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Command queue capacity.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Event broadcast capacity; slow subscribers beyond it lag.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_event_capacity() -> usize {
    256
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}
