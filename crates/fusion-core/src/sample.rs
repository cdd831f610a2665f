//! SensorSample: one instant of multi-channel sensor data

use serde::{Deserialize, Serialize};

/// One timestamped multi-channel reading plus its fused value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Simulation time in seconds
    pub t: f64,
    /// Raw channel readings, in layout order
    pub channels: Vec<f64>,
    /// Fixed-weight combination of `channels`, computed at generation time
    pub fused: f64,
}

impl SensorSample {
    pub fn new(t: f64, channels: Vec<f64>, fused: f64) -> Self {
        Self { t, channels, fused }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Reading of one channel, or 0.0 when the sample is narrower than expected
    pub fn channel(&self, index: usize) -> f64 {
        self.channels.get(index).copied().unwrap_or(0.0)
    }
}

/// Extract one raw channel as a series
pub fn channel_series(samples: &[SensorSample], index: usize) -> Vec<f64> {
    samples.iter().map(|s| s.channel(index)).collect()
}

/// Extract the fused channel as a series
pub fn fused_series(samples: &[SensorSample]) -> Vec<f64> {
    samples.iter().map(|s| s.fused).collect()
}

/// Extract the time axis
pub fn time_series(samples: &[SensorSample]) -> Vec<f64> {
    samples.iter().map(|s| s.t).collect()
}
