//! Signal quality assessment over a trailing window of samples
//!
//! Every metric is recomputed from scratch on each call. The analyzer holds
//! only its layout and calibration, never sample history.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::FusionResult;
use crate::sample::SensorSample;
use crate::sensor_types::{ChannelKind, SensorLayout};
use crate::stats::{
    average, head, mean_square, normalize, rolling_std, rolling_std_series, round_to, tail,
};

/// Floor applied to both powers in the SNR ratio
pub const SNR_EPSILON: f64 = 1e-9;

/// Decimal places kept in published metrics
pub const METRIC_DECIMALS: u32 = 2;

/// Empirical `[min, max]` range a raw statistic is normalized against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub min: f64,
    pub max: f64,
}

impl CalibrationRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max)
    }
}

/// Weights of the fusion-confidence blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub snr: f64,
    pub artifact: f64,
    pub balance: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            snr: 0.6,
            artifact: 0.25,
            balance: 0.15,
        }
    }
}

/// Window sizes and calibration constants for the quality heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCalibration {
    /// Trailing window analysed on every pass
    pub window_len: usize,
    /// Sub-window for rolling standard deviations
    pub short_window: usize,
    /// Sub-window at each end of the window for the drift comparison
    pub drift_window: usize,
    /// SNR power floor
    pub snr_floor: f64,
    pub artifact_range: CalibrationRange,
    pub drift_range: CalibrationRange,
    pub balance_range: CalibrationRange,
    pub snr_range: CalibrationRange,
    pub confidence_weights: ConfidenceWeights,
    /// Per-channel report: artifact normalization
    pub channel_artifact_range: CalibrationRange,
    /// Per-channel report: SNR normalization
    pub channel_snr_range: CalibrationRange,
    pub decimals: u32,
}

impl Default for QualityCalibration {
    fn default() -> Self {
        Self {
            window_len: 512,
            short_window: 64,
            drift_window: 128,
            snr_floor: SNR_EPSILON,
            artifact_range: CalibrationRange::new(0.02, 0.2),
            drift_range: CalibrationRange::new(0.0, 0.2),
            balance_range: CalibrationRange::new(0.0, 0.6),
            snr_range: CalibrationRange::new(5.0, 25.0),
            confidence_weights: ConfidenceWeights::default(),
            channel_artifact_range: CalibrationRange::new(0.0, 0.2),
            channel_snr_range: CalibrationRange::new(0.0, 25.0),
            decimals: METRIC_DECIMALS,
        }
    }
}

impl QualityCalibration {
    pub fn validate(&self) -> FusionResult<()> {
        if self.window_len == 0 || self.short_window == 0 || self.drift_window == 0 {
            return Err(crate::config_error!("quality windows must be non-empty"));
        }

        if !(self.snr_floor > 0.0) {
            return Err(crate::config_error!("SNR floor must be positive, got {}", self.snr_floor));
        }

        let w = &self.confidence_weights;
        for (name, weight) in [("snr", w.snr), ("artifact", w.artifact), ("balance", w.balance)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(crate::config_error!(
                    "confidence weight '{}' must be finite and non-negative",
                    name
                ));
            }
        }

        if self.decimals > 12 {
            return Err(crate::config_error!("{} decimals exceeds f64 precision", self.decimals));
        }

        Ok(())
    }
}

/// Quality summary of the most recent window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Log-ratio of fused power to noise-estimate power. Finite, may be negative.
    pub signal_to_noise_ratio_db: f64,
    /// Normalized rolling std of the fused channel (0.0 - 1.0)
    pub artifact_score: f64,
    /// Normalized early/late baseline shift (0.0 - 1.0)
    pub drift_score: f64,
    /// Blend of SNR, inverse artifact score and channel balance (0.0 - 1.0)
    pub fusion_confidence: f64,
}

impl QualityMetrics {
    pub fn grade(&self) -> QualityGrade {
        QualityGrade::assess(self)
    }
}

impl fmt::Display for QualityMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SNR {:.2} dB, artifact {:.2}, drift {:.2}, confidence {:.2}",
               self.signal_to_noise_ratio_db,
               self.artifact_score,
               self.drift_score,
               self.fusion_confidence)
    }
}

/// Coarse quality bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityGrade {
    pub fn assess(metrics: &QualityMetrics) -> Self {
        Self::from_scores(
            metrics.signal_to_noise_ratio_db,
            metrics.artifact_score,
            metrics.drift_score,
        )
    }

    pub fn from_scores(snr_db: f64, artifact: f64, drift: f64) -> Self {
        if snr_db > 15.0 && artifact < 0.3 && drift < 0.3 {
            QualityGrade::Excellent
        } else if snr_db > 10.0 && artifact < 0.6 && drift < 0.6 {
            QualityGrade::Good
        } else if snr_db > 5.0 && artifact < 0.8 && drift < 0.8 {
            QualityGrade::Fair
        } else {
            QualityGrade::Poor
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityGrade::Excellent => write!(f, "Excellent"),
            QualityGrade::Good => write!(f, "Good"),
            QualityGrade::Fair => write!(f, "Fair"),
            QualityGrade::Poor => write!(f, "Poor"),
        }
    }
}

/// Quality figures for a single raw channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelQuality {
    pub kind: ChannelKind,
    pub snr_db: f64,
    pub artifact_score: f64,
    pub drift_score: f64,
    pub signal_power: f64,
    pub confidence: f64,
}

/// `10 * log10(power(signal) / power(noise))` with both powers floored
pub fn snr_db(signal: &[f64], noise_estimate: &[f64], floor: f64) -> f64 {
    let signal_power = mean_square(signal).max(floor);
    let noise_power = mean_square(noise_estimate).max(floor);
    10.0 * (signal_power / noise_power).log10()
}

/// Column-wise copy of the analysis window
struct WindowSeries {
    fused: Vec<f64>,
    noise: Vec<f64>,
    channels: Vec<Vec<f64>>,
}

/// Rolling quality analyzer
#[derive(Debug, Clone)]
pub struct QualityAnalyzer {
    layout: SensorLayout,
    calibration: QualityCalibration,
}

impl QualityAnalyzer {
    pub fn new(layout: SensorLayout, calibration: QualityCalibration) -> Self {
        Self { layout, calibration }
    }

    pub fn with_layout(layout: SensorLayout) -> Self {
        Self::new(layout, QualityCalibration::default())
    }

    pub fn layout(&self) -> &SensorLayout {
        &self.layout
    }

    pub fn calibration(&self) -> &QualityCalibration {
        &self.calibration
    }

    /// Compute the four quality metrics over the trailing window of `samples`.
    ///
    /// Accepts slices, `Vec`s and `VecDeque`s by reference. Any length works,
    /// including zero.
    pub fn analyze<'a, I>(&self, samples: I) -> QualityMetrics
    where
        I: IntoIterator<Item = &'a SensorSample>,
        I::IntoIter: ExactSizeIterator,
    {
        let cal = &self.calibration;
        let series = self.window_series(samples);

        let snr = snr_db(&series.fused, &series.noise, cal.snr_floor);

        let artifact_std = rolling_std(&series.fused, cal.short_window);
        let artifact = cal.artifact_range.normalize(artifact_std);

        let drift_raw = (average(tail(&series.fused, cal.drift_window))
            - average(head(&series.fused, cal.drift_window)))
        .abs();
        let drift = cal.drift_range.normalize(drift_raw);

        let channel_stds: Vec<f64> = series
            .channels
            .iter()
            .map(|ch| rolling_std(ch, cal.short_window))
            .collect();
        let balance = balance_term(&channel_stds, cal.balance_range);

        let w = &cal.confidence_weights;
        let confidence = (w.snr * cal.snr_range.normalize(snr)
            + w.artifact * (1.0 - artifact).clamp(0.0, 1.0)
            + w.balance * balance.clamp(0.0, 1.0))
        .clamp(0.0, 1.0);

        QualityMetrics {
            signal_to_noise_ratio_db: round_to(snr, cal.decimals),
            artifact_score: round_to(artifact, cal.decimals),
            drift_score: round_to(drift, cal.decimals),
            fusion_confidence: round_to(confidence, cal.decimals),
        }
    }

    /// Per-channel quality over the trailing window. Values are not rounded.
    ///
    /// The artifact score averages the normalized std of every
    /// `short_window`-sample rolling window, so it reflects the whole window
    /// rather than its tail.
    pub fn channel_report<'a, I>(&self, samples: I) -> Vec<ChannelQuality>
    where
        I: IntoIterator<Item = &'a SensorSample>,
        I::IntoIter: ExactSizeIterator,
    {
        let cal = &self.calibration;
        let series = self.window_series(samples);

        self.layout
            .channels
            .iter()
            .zip(&series.channels)
            .map(|(spec, values)| {
                let mean = average(values);
                let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
                let snr = snr_db(values, &centered, cal.snr_floor);

                let rolling: Vec<f64> = rolling_std_series(values, cal.short_window)
                    .into_iter()
                    .map(|std| cal.channel_artifact_range.normalize(std))
                    .collect();
                let artifact = average(&rolling);

                let shift = average(tail(values, cal.drift_window))
                    - average(head(values, cal.drift_window));
                let drift = cal.drift_range.normalize(shift.abs());

                let w = &cal.confidence_weights;
                let confidence = w.snr * cal.channel_snr_range.normalize(snr)
                    + w.artifact * (1.0 - artifact)
                    + w.balance * (1.0 - drift);

                ChannelQuality {
                    kind: spec.kind,
                    snr_db: snr,
                    artifact_score: artifact,
                    drift_score: drift,
                    signal_power: mean_square(values),
                    confidence: confidence.clamp(0.0, 1.0),
                }
            })
            .collect()
    }

    fn window_series<'a, I>(&self, samples: I) -> WindowSeries
    where
        I: IntoIterator<Item = &'a SensorSample>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = samples.into_iter();
        let skip = iter.len().saturating_sub(self.calibration.window_len);
        let len = iter.len() - skip;
        let channel_count = self.layout.channel_count();

        let mut series = WindowSeries {
            fused: Vec::with_capacity(len),
            noise: Vec::with_capacity(len),
            channels: vec![Vec::with_capacity(len); channel_count],
        };

        for sample in iter.skip(skip) {
            series.fused.push(sample.fused);
            series.noise.push(sample.fused - self.layout.fuse(&sample.channels));
            for (index, column) in series.channels.iter_mut().enumerate() {
                column.push(sample.channel(index));
            }
        }

        series
    }
}

/// `1 - normalize(sum |std_i - std_{i+1}|)` over adjacent channels
fn balance_term(channel_stds: &[f64], range: CalibrationRange) -> f64 {
    let spread: f64 = channel_stds
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).abs())
        .sum();
    1.0 - range.normalize(spread)
}
