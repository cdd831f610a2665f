//! Sensor channel classification and the fixed fusion weights

use serde::{Deserialize, Serialize};
use crate::error::{FusionError, FusionResult};

/// Maximum number of raw channels in one layout
pub const MAX_CHANNELS: usize = 8;

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Sensor family a layout models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorModality {
    /// ECG + EEG + EMG
    Biomedical,
    /// LiDAR + RADAR + Camera + IMU + GPS
    Automotive,
    /// User-defined channel set
    Custom,
}

/// Physical sensor behind a raw channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Ecg,
    Eeg,
    Emg,
    Lidar,
    Radar,
    Camera,
    Imu,
    Gps,
    Other(u8), // For extensibility
}

impl ChannelKind {
    /// Short display label
    pub fn label(&self) -> String {
        match self {
            ChannelKind::Ecg => "ECG".to_string(),
            ChannelKind::Eeg => "EEG".to_string(),
            ChannelKind::Emg => "EMG".to_string(),
            ChannelKind::Lidar => "LiDAR".to_string(),
            ChannelKind::Radar => "RADAR".to_string(),
            ChannelKind::Camera => "Camera".to_string(),
            ChannelKind::Imu => "IMU".to_string(),
            ChannelKind::Gps => "GPS".to_string(),
            ChannelKind::Other(id) => format!("CH{}", id),
        }
    }
}

/// Closed value range a channel is clamped into after noise injection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    pub min: f64,
    pub max: f64,
}

impl ChannelBounds {
    pub const UNIT: ChannelBounds = ChannelBounds { min: 0.0, max: 1.0 };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// One raw channel: what it measures, its fusion weight, its domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub kind: ChannelKind,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<ChannelBounds>,
}

impl ChannelSpec {
    pub fn new(kind: ChannelKind, weight: f64) -> Self {
        Self { kind, weight, bounds: None }
    }

    pub fn bounded(kind: ChannelKind, weight: f64, bounds: ChannelBounds) -> Self {
        Self { kind, weight, bounds: Some(bounds) }
    }

    /// Clamp a reading into this channel's domain, if it has one
    pub fn clamp(&self, value: f64) -> f64 {
        match self.bounds {
            Some(bounds) => bounds.clamp(value),
            None => value,
        }
    }
}

/// Ordered channel set plus the constant weights of the naive fused estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLayout {
    pub modality: SensorModality,
    pub channels: Vec<ChannelSpec>,
}

impl SensorLayout {
    pub fn new(modality: SensorModality, channels: Vec<ChannelSpec>) -> FusionResult<Self> {
        let layout = Self { modality, channels };
        layout.validate()?;
        Ok(layout)
    }

    /// ECG 0.5, EEG 0.3, EMG 0.2
    pub fn biomedical() -> Self {
        Self {
            modality: SensorModality::Biomedical,
            channels: vec![
                ChannelSpec::new(ChannelKind::Ecg, 0.5),
                ChannelSpec::new(ChannelKind::Eeg, 0.3),
                ChannelSpec::new(ChannelKind::Emg, 0.2),
            ],
        }
    }

    /// LiDAR 0.35, RADAR 0.30, Camera 0.20, IMU 0.10, GPS 0.05
    pub fn automotive() -> Self {
        Self {
            modality: SensorModality::Automotive,
            channels: vec![
                ChannelSpec::new(ChannelKind::Lidar, 0.35),
                ChannelSpec::new(ChannelKind::Radar, 0.30),
                ChannelSpec::bounded(ChannelKind::Camera, 0.20, ChannelBounds::UNIT),
                ChannelSpec::new(ChannelKind::Imu, 0.10),
                ChannelSpec::bounded(ChannelKind::Gps, 0.05, ChannelBounds::new(0.3, 1.0)),
            ],
        }
    }

    /// Preset layout for a modality. `Custom` has no preset and falls back to biomedical.
    pub fn for_modality(modality: SensorModality) -> Self {
        match modality {
            SensorModality::Biomedical => Self::biomedical(),
            SensorModality::Automotive => Self::automotive(),
            SensorModality::Custom => Self::biomedical(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.channels.iter().map(|c| c.weight).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.kind.label()).collect()
    }

    /// The fixed-weight linear combination. Extra or missing readings are ignored.
    pub fn fuse(&self, readings: &[f64]) -> f64 {
        self.channels
            .iter()
            .zip(readings)
            .map(|(spec, value)| spec.weight * value)
            .sum()
    }

    pub fn validate(&self) -> FusionResult<()> {
        if self.channels.is_empty() {
            return Err(FusionError::InvalidLayout {
                reason: "layout has no channels".to_string(),
            });
        }

        if self.channels.len() > MAX_CHANNELS {
            return Err(FusionError::TooManyChannels {
                requested: self.channels.len(),
                max_supported: MAX_CHANNELS,
            });
        }

        for spec in &self.channels {
            if !spec.weight.is_finite() || spec.weight < 0.0 {
                return Err(FusionError::InvalidLayout {
                    reason: format!("{} weight {} must be finite and non-negative",
                                    spec.kind.label(), spec.weight),
                });
            }
            if let Some(bounds) = spec.bounds {
                if !(bounds.min < bounds.max) {
                    return Err(FusionError::InvalidLayout {
                        reason: format!("{} bounds [{}, {}] are empty",
                                        spec.kind.label(), bounds.min, bounds.max),
                    });
                }
            }
        }

        let sum: f64 = self.channels.iter().map(|c| c.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FusionError::InvalidLayout {
                reason: format!("fusion weights sum to {}, expected 1.0", sum),
            });
        }

        Ok(())
    }
}

impl Default for SensorLayout {
    fn default() -> Self {
        Self::biomedical()
    }
}
