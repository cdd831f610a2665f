//! Simulation configuration and presets

use std::path::Path;
use std::time::Duration;

use fusion_core::{
    config_error, FusionError, FusionResult, QualityCalibration, SensorLayout, SensorModality,
};
use serde::{Deserialize, Serialize};

use crate::signal_patterns::ChannelPattern;

/// Shortest tick period a timer can be armed with
pub const MIN_TICK_PERIOD: Duration = Duration::from_nanos(1);

/// Longest tick period accepted (one hour)
pub const MAX_TICK_PERIOD: Duration = Duration::from_secs(3600);

/// Timer and clock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// External tick rate in Hz (how often the buffer is updated)
    pub tick_rate_hz: f64,
    /// Internal sub-steps per tick
    pub sub_steps_per_tick: usize,
    /// Simulated seconds covered by one tick, split evenly over its sub-steps
    pub step_period_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 15.0,
            sub_steps_per_tick: 3,
            step_period_s: 1.0 / 60.0,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> FusionResult<()> {
        if self.tick_period().is_none() {
            return Err(FusionError::InvalidTiming {
                field: "tick_rate_hz",
                value: self.tick_rate_hz,
            });
        }
        if self.sub_steps_per_tick == 0 {
            return Err(FusionError::InvalidTiming {
                field: "sub_steps_per_tick",
                value: 0.0,
            });
        }
        if !(self.step_period_s.is_finite() && self.step_period_s > 0.0) {
            return Err(FusionError::InvalidTiming {
                field: "step_period_s",
                value: self.step_period_s,
            });
        }
        Ok(())
    }

    /// Wall-clock period between ticks, `None` when the rate gives no usable timer period
    pub fn tick_period(&self) -> Option<Duration> {
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return None;
        }
        let period = Duration::try_from_secs_f64(1.0 / self.tick_rate_hz).ok()?;
        (MIN_TICK_PERIOD..=MAX_TICK_PERIOD)
            .contains(&period)
            .then_some(period)
    }

    /// Simulated samples produced per wall-clock second
    pub fn simulated_rate_hz(&self) -> f64 {
        self.tick_rate_hz * self.sub_steps_per_tick as f64
    }
}

/// Complete configuration for one simulation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Channel set and fusion weights
    pub layout: SensorLayout,
    /// One waveform per layout channel, same order
    pub patterns: Vec<ChannelPattern>,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Maximum samples kept in the rolling buffer
    pub buffer_capacity: usize,
    /// Global noise coefficient (0.0 = noiseless)
    pub noise_scale: f64,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub calibration: QualityCalibration,
}

impl SimulationConfig {
    /// ECG/EEG/EMG with the dashboard waveforms
    pub fn biomedical() -> Self {
        Self::with_layout(SensorLayout::biomedical())
    }

    /// LiDAR/RADAR/Camera/IMU/GPS with the validation waveforms
    pub fn automotive() -> Self {
        Self::with_layout(SensorLayout::automotive())
    }

    /// Preset patterns for every channel of `layout`, default everything else
    pub fn with_layout(layout: SensorLayout) -> Self {
        let patterns = ChannelPattern::for_layout(&layout);
        Self {
            layout,
            patterns,
            timing: TimingConfig::default(),
            buffer_capacity: 2000,
            noise_scale: 1.0,
            seed: None,
            calibration: QualityCalibration::default(),
        }
    }

    pub fn for_modality(modality: SensorModality) -> Self {
        Self::with_layout(SensorLayout::for_modality(modality))
    }

    /// Validate entire configuration
    pub fn validate(&self) -> FusionResult<()> {
        self.layout.validate()?;

        if self.patterns.len() != self.layout.channel_count() {
            return Err(FusionError::ChannelMismatch {
                expected: self.layout.channel_count(),
                actual: self.patterns.len(),
            });
        }

        self.timing.validate()?;

        if self.buffer_capacity == 0 {
            return Err(config_error!("Buffer capacity must be greater than 0"));
        }

        if !(self.noise_scale.is_finite() && self.noise_scale >= 0.0) {
            return Err(config_error!(
                "Noise scale must be finite and non-negative, got {}",
                self.noise_scale
            ));
        }

        self.calibration.validate()
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> FusionResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FusionError::Serialization {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON and validate it
    pub fn from_json(json: &str) -> FusionResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| FusionError::Serialization {
            message: format!("Failed to deserialize configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> FusionResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| FusionError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::biomedical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_presets_validate() {
        assert!(SimulationConfig::biomedical().validate().is_ok());
        assert!(SimulationConfig::automotive().validate().is_ok());
        assert_eq!(
            SimulationConfig::for_modality(SensorModality::Automotive).layout,
            SensorLayout::automotive()
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimulationConfig::biomedical();
        config.buffer_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::biomedical();
        config.noise_scale = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::biomedical();
        config.timing.tick_rate_hz = 0.0;
        assert_eq!(
            config.validate(),
            Err(FusionError::InvalidTiming { field: "tick_rate_hz", value: 0.0 })
        );

        let mut config = SimulationConfig::biomedical();
        config.patterns.pop();
        assert_eq!(
            config.validate(),
            Err(FusionError::ChannelMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_json_serialization() {
        let mut config = SimulationConfig::automotive();
        config.seed = Some(42);

        let json = config.to_json().unwrap();
        let restored = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            SimulationConfig::from_json("{ not json"),
            Err(FusionError::Serialization { .. })
        ));

        let mut config = SimulationConfig::biomedical();
        config.layout.channels[0].weight = 0.9;
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(
            SimulationConfig::from_json(&json),
            Err(FusionError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SimulationConfig::biomedical().to_json().unwrap().as_bytes())
            .unwrap();

        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.layout, SensorLayout::biomedical());

        assert!(matches!(
            SimulationConfig::load("/nonexistent/fusion.json"),
            Err(FusionError::Io { .. })
        ));
    }

    #[test]
    fn test_extreme_tick_rates_are_rejected() {
        for rate in [1e-310, 1e-300, 1e-4, 1e12, f64::INFINITY, f64::NAN, -15.0] {
            let timing = TimingConfig {
                tick_rate_hz: rate,
                ..Default::default()
            };
            assert!(
                matches!(
                    timing.validate(),
                    Err(FusionError::InvalidTiming { field: "tick_rate_hz", .. })
                ),
                "rate {} accepted",
                rate
            );
            assert_eq!(timing.tick_period(), None);
        }

        let timing = TimingConfig {
            tick_rate_hz: 1e6,
            ..Default::default()
        };
        assert!(timing.validate().is_ok());
        assert!(timing.tick_period().is_some());
        assert_eq!(
            TimingConfig::default().tick_period(),
            Some(Duration::from_secs_f64(1.0 / 15.0))
        );
    }

    #[test]
    fn test_simulated_rate() {
        assert_eq!(TimingConfig::default().simulated_rate_hz(), 45.0);
    }
}
