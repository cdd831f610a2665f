//! Per-channel waveform patterns: sinusoid sums plus bounded noise

use std::f64::consts::PI;

use fusion_core::{ChannelKind, SensorLayout};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Gaussian noise is truncated at this many standard deviations
pub const GAUSSIAN_TRUNCATION: f64 = 3.0;

/// Noise level the preset patterns are calibrated at. A `noise_scale` of 1.0
/// reproduces it.
pub const PRESET_NOISE_LEVEL: f64 = 0.1;

/// `noise_scale` that puts the presets at an absolute noise level
pub fn noise_scale_for_level(level: f64) -> f64 {
    level / PRESET_NOISE_LEVEL
}

/// `amplitude * sin(2π * frequency_hz * t + phase)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SineComponent {
    pub amplitude: f64,
    pub frequency_hz: f64,
    #[serde(default)]
    pub phase: f64,
}

impl SineComponent {
    pub const fn new(amplitude: f64, frequency_hz: f64, phase: f64) -> Self {
        Self { amplitude, frequency_hz, phase }
    }

    pub fn value_at(&self, t: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency_hz * t + self.phase).sin()
    }
}

/// Bounded pseudo-random noise added on top of the deterministic part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoiseModel {
    /// No noise
    None,
    /// `span * (u - 0.5)`, `u` uniform in `[0, 1)`
    Uniform { span: f64 },
    /// Normal with `std_dev`, truncated at ±3σ
    Gaussian { std_dev: f64 },
}

impl NoiseModel {
    /// Largest absolute value one draw can take at `scale`
    pub fn bound(&self, scale: f64) -> f64 {
        match self {
            NoiseModel::None => 0.0,
            NoiseModel::Uniform { span } => 0.5 * span.abs() * scale.abs(),
            NoiseModel::Gaussian { std_dev } => GAUSSIAN_TRUNCATION * std_dev.abs() * scale.abs(),
        }
    }

    /// Draw one noise value, scaled by the global noise coefficient
    pub fn sample<R: Rng>(&self, rng: &mut R, scale: f64) -> f64 {
        match self {
            NoiseModel::None => 0.0,
            NoiseModel::Uniform { span } => span * scale * (rng.gen::<f64>() - 0.5),
            NoiseModel::Gaussian { std_dev } => {
                let z: f64 = rng.sample(StandardNormal);
                z.clamp(-GAUSSIAN_TRUNCATION, GAUSSIAN_TRUNCATION) * std_dev * scale
            }
        }
    }
}

/// Deterministic waveform plus noise for one raw channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPattern {
    pub components: Vec<SineComponent>,
    #[serde(default)]
    pub offset: f64,
    pub noise: NoiseModel,
}

impl ChannelPattern {
    pub fn new(components: Vec<SineComponent>, noise: NoiseModel) -> Self {
        Self { components, offset: 0.0, noise }
    }

    /// Noiseless value at time `t`
    pub fn ideal_value(&self, t: f64) -> f64 {
        self.offset + self.components.iter().map(|c| c.value_at(t)).sum::<f64>()
    }

    /// Value at time `t` with one noise draw
    pub fn value_at<R: Rng>(&self, t: f64, rng: &mut R, noise_scale: f64) -> f64 {
        self.ideal_value(t) + self.noise.sample(rng, noise_scale)
    }

    /// Pattern used by the dashboard and validation presets for a channel kind
    pub fn for_kind(kind: ChannelKind) -> Self {
        match kind {
            // 90 BPM
            ChannelKind::Ecg => Self::new(
                vec![SineComponent::new(0.8, 1.5, 0.0)],
                NoiseModel::Uniform { span: 0.05 },
            ),
            // alpha + beta bands
            ChannelKind::Eeg => Self::new(
                vec![
                    SineComponent::new(0.4, 10.0, 0.0),
                    SineComponent::new(0.15, 22.0, 0.5),
                ],
                NoiseModel::Uniform { span: 0.05 },
            ),
            // mostly recruitment noise over a small powerline-band tone
            ChannelKind::Emg => Self::new(
                vec![SineComponent::new(0.05, 50.0, 0.0)],
                NoiseModel::Uniform { span: 0.15 },
            ),
            ChannelKind::Lidar => Self::new(
                vec![
                    SineComponent::new(50.0, 0.5, 0.0),
                    SineComponent::new(10.0, 2.0, 0.3),
                ],
                NoiseModel::Gaussian { std_dev: 0.5 },
            ),
            ChannelKind::Radar => Self::new(
                vec![
                    SineComponent::new(30.0, 1.0, 0.0),
                    SineComponent::new(15.0, 3.0, 0.5),
                ],
                NoiseModel::Gaussian { std_dev: 0.3 },
            ),
            ChannelKind::Camera => Self::new(
                vec![
                    SineComponent::new(0.7, 0.3, 0.0),
                    SineComponent::new(0.2, 1.5, 0.8),
                ],
                NoiseModel::Gaussian { std_dev: 0.01 },
            ),
            ChannelKind::Imu => Self::new(
                vec![
                    SineComponent::new(2.0, 0.8, 0.0),
                    SineComponent::new(0.5, 5.0, 1.2),
                ],
                NoiseModel::Gaussian { std_dev: 0.03 },
            ),
            ChannelKind::Gps => Self::new(
                vec![SineComponent::new(0.9, 0.1, 0.0)],
                NoiseModel::Gaussian { std_dev: 0.015 },
            ),
            ChannelKind::Other(id) => Self::new(
                vec![SineComponent::new(1.0, 1.0 + id as f64, 0.0)],
                NoiseModel::Uniform { span: 0.05 },
            ),
        }
    }

    /// One preset pattern per channel of `layout`, in layout order
    pub fn for_layout(layout: &SensorLayout) -> Vec<Self> {
        layout.channels.iter().map(|c| Self::for_kind(c.kind)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ideal_value_sums_components() {
        let pattern = ChannelPattern::for_kind(ChannelKind::Eeg);
        let t = 0.0125;
        let expected = 0.4 * (2.0 * PI * 10.0 * t).sin() + 0.15 * (2.0 * PI * 22.0 * t + 0.5).sin();
        assert!((pattern.ideal_value(t) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_noise_stays_within_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        let models = [
            NoiseModel::Uniform { span: 0.15 },
            NoiseModel::Gaussian { std_dev: 0.5 },
        ];

        for model in models {
            let bound = model.bound(1.0);
            for _ in 0..10_000 {
                let draw = model.sample(&mut rng, 1.0);
                assert!(draw.abs() <= bound, "{:?} drew {}", model, draw);
            }
        }
    }

    #[test]
    fn test_zero_scale_is_noiseless() {
        let mut rng = StdRng::seed_from_u64(1);
        let pattern = ChannelPattern::for_kind(ChannelKind::Lidar);
        for i in 0..100 {
            let t = i as f64 * 0.01;
            assert_eq!(pattern.value_at(t, &mut rng, 0.0), pattern.ideal_value(t));
        }
    }

    #[test]
    fn test_for_layout_matches_channel_order() {
        let layout = SensorLayout::automotive();
        let patterns = ChannelPattern::for_layout(&layout);
        assert_eq!(patterns.len(), 5);
        assert_eq!(patterns[2], ChannelPattern::for_kind(ChannelKind::Camera));
    }

    #[test]
    fn test_noise_level_scaling() {
        assert_eq!(noise_scale_for_level(PRESET_NOISE_LEVEL), 1.0);

        // LiDAR sigma is 5x the noise level
        let lidar = ChannelPattern::for_kind(ChannelKind::Lidar);
        let NoiseModel::Gaussian { std_dev } = lidar.noise else {
            panic!("LiDAR preset should use Gaussian noise");
        };
        assert!((std_dev * noise_scale_for_level(0.3) - 1.5).abs() < 1e-9);
        assert!((std_dev * noise_scale_for_level(0.05) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_noise_model_json_shape() {
        let json = serde_json::to_string(&NoiseModel::Uniform { span: 0.05 }).unwrap();
        assert_eq!(json, r#"{"type":"uniform","span":0.05}"#);
        let parsed: NoiseModel = serde_json::from_str(r#"{"type":"none"}"#).unwrap();
        assert_eq!(parsed, NoiseModel::None);
    }
}
