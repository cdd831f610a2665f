//! Fusion method comparison across noise levels

use std::time::Instant;

use fusion_core::{
    evaluate, fuse_window, FusionEvaluation, FusionMethod, FusionResult, QualityAnalyzer,
    SensorSample,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimulationConfig;
use crate::generator::SampleGenerator;
use crate::signal_patterns::noise_scale_for_level;

/// Absolute noise levels swept by default
pub const DEFAULT_NOISE_LEVELS: [f64; 4] = [0.05, 0.1, 0.2, 0.3];

/// Benchmark parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Absolute noise levels; each is turned into a `noise_scale` relative to the presets
    pub noise_levels: Vec<f64>,
    pub sample_count: usize,
    pub seed: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            noise_levels: DEFAULT_NOISE_LEVELS.to_vec(),
            sample_count: 1000,
            seed: 42,
        }
    }
}

/// One method at one noise level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub noise_level: f64,
    pub noise_scale: f64,
    pub method: FusionMethod,
    pub evaluation: FusionEvaluation,
    pub processing_time_us: u64,
}

/// Generate `sample_count` samples per noise level and score every fusion
/// method against the noiseless fused reference.
pub fn run_benchmark(
    base: &SimulationConfig,
    bench: &BenchmarkConfig,
) -> FusionResult<Vec<BenchmarkRow>> {
    let mut rows = Vec::with_capacity(bench.noise_levels.len() * FusionMethod::ALL.len());

    for &noise_level in &bench.noise_levels {
        let noise_scale = noise_scale_for_level(noise_level);
        let mut config = base.clone();
        config.noise_scale = noise_scale;
        config.seed = Some(bench.seed);
        config.buffer_capacity = bench.sample_count.max(1);

        let mut generator = SampleGenerator::new(&config)?;
        while generator.len() < bench.sample_count {
            generator.advance(config.timing.sub_steps_per_tick);
        }

        let samples: Vec<SensorSample> = generator.buffer().iter().cloned().collect();
        let truth: Vec<f64> = samples.iter().map(|s| generator.ideal_sample(s.t).fused).collect();

        // every sample goes into the weighting, not only the trailing window
        let mut calibration = config.calibration.clone();
        calibration.window_len = samples.len().max(1);
        let analyzer = QualityAnalyzer::new(config.layout.clone(), calibration);

        for method in FusionMethod::ALL {
            let started = Instant::now();
            let estimate = fuse_window(&analyzer, &samples, method);
            let processing_time_us = started.elapsed().as_micros() as u64;

            let evaluation = evaluate(&truth, &estimate);
            debug!(noise_level, %method, mse = evaluation.mse, "benchmark row");

            rows.push(BenchmarkRow {
                noise_level,
                noise_scale,
                method,
                evaluation,
                processing_time_us,
            });
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_bench() -> BenchmarkConfig {
        BenchmarkConfig {
            sample_count: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_benchmark_shape() {
        let rows = run_benchmark(&SimulationConfig::automotive(), &small_bench()).unwrap();

        assert_eq!(rows.len(), DEFAULT_NOISE_LEVELS.len() * FusionMethod::ALL.len());
        assert_eq!(rows[0].noise_level, 0.05);
        assert!((rows[0].noise_scale - 0.5).abs() < 1e-12);
        assert!((rows.last().unwrap().noise_scale - 3.0).abs() < 1e-9);
        assert_eq!(rows[0].method, FusionMethod::FixedWeight);
        for row in &rows {
            assert!(row.evaluation.mse.is_finite());
            assert!(row.evaluation.snr_db.is_finite());
        }
    }

    #[test]
    fn test_fixed_weight_error_grows_with_noise() {
        let bench = BenchmarkConfig {
            noise_levels: vec![0.0, 0.3],
            ..small_bench()
        };
        let rows = run_benchmark(&SimulationConfig::biomedical(), &bench).unwrap();

        let fixed: Vec<&BenchmarkRow> = rows
            .iter()
            .filter(|r| r.method == FusionMethod::FixedWeight)
            .collect();
        assert_eq!(fixed[0].evaluation.mse, 0.0);
        assert!(fixed[1].evaluation.mse > 0.0);
    }

    #[test]
    fn test_benchmark_is_deterministic() {
        let a = run_benchmark(&SimulationConfig::biomedical(), &small_bench()).unwrap();
        let b = run_benchmark(&SimulationConfig::biomedical(), &small_bench()).unwrap();

        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.evaluation, y.evaluation);
        }
    }

    #[test]
    fn test_benchmark_rows_serialize() {
        let bench = BenchmarkConfig {
            noise_levels: vec![0.1],
            ..small_bench()
        };
        let rows = run_benchmark(&SimulationConfig::biomedical(), &bench).unwrap();
        let json = serde_json::to_string(&rows).unwrap();
        assert!(json.contains("\"method\":\"confidence_weighted\""));
    }
}
