//! Alternative fusion strategies and their evaluation against a reference

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::quality::{snr_db, QualityAnalyzer, SNR_EPSILON};
use crate::sample::SensorSample;
use crate::stats::{average, mean_square};

/// How raw channels are combined into one estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// The layout's constant weights (what the generator stores in `fused`)
    FixedWeight,
    /// Equal weight for every channel
    SimpleAverage,
    /// Weights proportional to each channel's quality confidence
    ConfidenceWeighted,
}

impl FusionMethod {
    pub const ALL: [FusionMethod; 3] = [
        FusionMethod::FixedWeight,
        FusionMethod::SimpleAverage,
        FusionMethod::ConfidenceWeighted,
    ];
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionMethod::FixedWeight => write!(f, "fixed-weight"),
            FusionMethod::SimpleAverage => write!(f, "simple-average"),
            FusionMethod::ConfidenceWeighted => write!(f, "confidence-weighted"),
        }
    }
}

/// Per-channel weights for `method`, summing to 1.0
pub fn method_weights(
    analyzer: &QualityAnalyzer,
    samples: &[SensorSample],
    method: FusionMethod,
) -> Vec<f64> {
    let count = analyzer.layout().channel_count();
    match method {
        FusionMethod::FixedWeight => analyzer.layout().weights(),
        FusionMethod::SimpleAverage => vec![1.0 / count as f64; count],
        FusionMethod::ConfidenceWeighted => {
            let confidences: Vec<f64> = analyzer
                .channel_report(samples)
                .iter()
                .map(|c| c.confidence)
                .collect();
            let total: f64 = confidences.iter().sum();
            if total > 0.0 {
                confidences.iter().map(|c| c / total).collect()
            } else {
                vec![1.0 / count as f64; count]
            }
        }
    }
}

/// Fuse every sample of `samples` with the weights `method` derives
pub fn fuse_window(
    analyzer: &QualityAnalyzer,
    samples: &[SensorSample],
    method: FusionMethod,
) -> Vec<f64> {
    let weights = method_weights(analyzer, samples, method);
    samples
        .iter()
        .map(|s| weights.iter().zip(&s.channels).map(|(w, v)| w * v).sum())
        .collect()
}

/// Agreement between a fused estimate and a reference series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionEvaluation {
    pub mse: f64,
    pub r2: f64,
    pub correlation: f64,
    /// Estimate power over residual power
    pub snr_db: f64,
}

/// Compare `estimate` against `truth`. Only the common prefix is used;
/// degenerate statistics (zero variance, empty input) come out as 0.0.
pub fn evaluate(truth: &[f64], estimate: &[f64]) -> FusionEvaluation {
    let len = truth.len().min(estimate.len());
    let truth = &truth[..len];
    let estimate = &estimate[..len];

    let residual: Vec<f64> = truth.iter().zip(estimate).map(|(t, e)| t - e).collect();
    let mse = mean_square(&residual);

    let truth_mean = average(truth);
    let estimate_mean = average(estimate);
    let truth_var = truth.iter().map(|t| (t - truth_mean).powi(2)).sum::<f64>();
    let estimate_var = estimate.iter().map(|e| (e - estimate_mean).powi(2)).sum::<f64>();
    let covariance = truth
        .iter()
        .zip(estimate)
        .map(|(t, e)| (t - truth_mean) * (e - estimate_mean))
        .sum::<f64>();

    let r2 = if truth_var > 0.0 {
        1.0 - residual.iter().map(|r| r * r).sum::<f64>() / truth_var
    } else {
        0.0
    };

    let correlation = if truth_var > 0.0 && estimate_var > 0.0 {
        covariance / (truth_var.sqrt() * estimate_var.sqrt())
    } else {
        0.0
    };

    FusionEvaluation {
        mse,
        r2,
        correlation,
        snr_db: snr_db(estimate, &residual, SNR_EPSILON),
    }
}
