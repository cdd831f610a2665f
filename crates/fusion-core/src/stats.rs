//! Windowed statistics shared by the quality analyzer and fusion evaluation
//!
//! Every helper is total: empty input yields 0.0, never NaN.

use serde::{Deserialize, Serialize};

/// Arithmetic mean, 0.0 for an empty slice
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of squares (signal power)
pub fn mean_square(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    let mean = average(values);
    let variance = if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
    };
    variance.sqrt()
}

/// Last `len` elements (or all of them when shorter)
pub fn tail(values: &[f64], len: usize) -> &[f64] {
    &values[values.len().saturating_sub(len)..]
}

/// First `len` elements (or all of them when shorter)
pub fn head(values: &[f64], len: usize) -> &[f64] {
    &values[..len.min(values.len())]
}

/// Standard deviation of the trailing `window` elements
pub fn rolling_std(values: &[f64], window: usize) -> f64 {
    std_dev(tail(values, window))
}

/// Standard deviation of every full `window`-sized slice, front to back.
/// Empty when the series is shorter than one window.
pub fn rolling_std_series(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    values.windows(window).map(std_dev).collect()
}

/// Map `value` from `[min, max]` into `[0, 1]`, clamped. A degenerate range gives 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Basic statistics for a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl SeriesStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean: average(data),
            rms: mean_square(data).sqrt(),
            std_dev: std_dev(data),
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}
