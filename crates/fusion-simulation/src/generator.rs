//! Multi-channel sample generator with a bounded rolling buffer

use std::collections::VecDeque;

use fusion_core::{FusionResult, SensorLayout, SensorSample};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SimulationConfig;
use crate::signal_patterns::ChannelPattern;

/// Synthetic sensor generator. Owns the simulation clock and the sample buffer.
pub struct SampleGenerator {
    layout: SensorLayout,
    patterns: Vec<ChannelPattern>,
    step_period_s: f64,
    noise_scale: f64,
    capacity: usize,
    seed: Option<u64>,
    rng: StdRng,
    time: f64,
    buffer: VecDeque<SensorSample>,
}

impl SampleGenerator {
    /// Create new generator with configuration
    pub fn new(config: &SimulationConfig) -> FusionResult<Self> {
        config.validate()?;

        Ok(Self {
            layout: config.layout.clone(),
            patterns: config.patterns.clone(),
            step_period_s: config.timing.step_period_s,
            noise_scale: config.noise_scale,
            capacity: config.buffer_capacity,
            seed: config.seed,
            rng: Self::make_rng(config.seed),
            time: 0.0,
            buffer: VecDeque::with_capacity(config.buffer_capacity),
        })
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Run `num_sub_steps` internal steps covering one step period, then
    /// append the new samples and evict the oldest beyond capacity.
    pub fn advance(&mut self, num_sub_steps: usize) {
        if num_sub_steps == 0 {
            return;
        }

        let dt = self.step_period_s / num_sub_steps as f64;
        let mut pending = Vec::with_capacity(num_sub_steps);

        for _ in 0..num_sub_steps {
            self.time += dt;
            pending.push(self.sample_at(self.time));
        }

        self.buffer.extend(pending);
        if self.buffer.len() > self.capacity {
            let excess = self.buffer.len() - self.capacity;
            self.buffer.drain(..excess);
        }
    }

    fn sample_at(&mut self, t: f64) -> SensorSample {
        let channels: Vec<f64> = self
            .layout
            .channels
            .iter()
            .zip(&self.patterns)
            .map(|(spec, pattern)| spec.clamp(pattern.value_at(t, &mut self.rng, self.noise_scale)))
            .collect();
        let fused = self.layout.fuse(&channels);
        SensorSample::new(t, channels, fused)
    }

    /// Noiseless, clamped sample at time `t`. Does not touch the clock or buffer.
    pub fn ideal_sample(&self, t: f64) -> SensorSample {
        let channels: Vec<f64> = self
            .layout
            .channels
            .iter()
            .zip(&self.patterns)
            .map(|(spec, pattern)| spec.clamp(pattern.ideal_value(t)))
            .collect();
        let fused = self.layout.fuse(&channels);
        SensorSample::new(t, channels, fused)
    }

    /// Zero the clock, clear the buffer and reseed the noise source
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.buffer.clear();
        self.rng = Self::make_rng(self.seed);
    }

    /// Swap in a new configuration. The clock always carries over. The buffer
    /// is dropped when the layout changed, since stored `fused` values were
    /// computed with the old channels and weights.
    pub fn update_config(&mut self, config: &SimulationConfig) -> FusionResult<()> {
        config.validate()?;

        if config.layout != self.layout {
            self.buffer.clear();
        }

        self.layout = config.layout.clone();
        self.patterns = config.patterns.clone();
        self.step_period_s = config.timing.step_period_s;
        self.noise_scale = config.noise_scale;
        self.capacity = config.buffer_capacity;
        if config.seed != self.seed {
            self.seed = config.seed;
            self.rng = Self::make_rng(config.seed);
        }

        if self.buffer.len() > self.capacity {
            let excess = self.buffer.len() - self.capacity;
            self.buffer.drain(..excess);
        }
        Ok(())
    }

    /// Current simulation time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn buffer(&self) -> &VecDeque<SensorSample> {
        &self.buffer
    }

    /// Copy of the last `count` samples, oldest first
    pub fn recent(&self, count: usize) -> Vec<SensorSample> {
        let skip = self.buffer.len().saturating_sub(count);
        self.buffer.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn layout(&self) -> &SensorLayout {
        &self.layout
    }

    pub fn patterns(&self) -> &[ChannelPattern] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_core::{ChannelKind, ChannelSpec, QualityAnalyzer, SensorModality};

    fn seeded(mut config: SimulationConfig) -> SampleGenerator {
        config.seed = Some(1234);
        SampleGenerator::new(&config).unwrap()
    }

    #[test]
    fn test_single_advance_from_empty() {
        let mut generator = seeded(SimulationConfig::biomedical());
        generator.advance(3);

        assert_eq!(generator.len(), 3);
        let buffer = generator.buffer();
        let dt = (1.0 / 60.0) / 3.0;
        assert!((buffer[0].t - dt).abs() < 1e-12);
        assert!(buffer[0].t < buffer[1].t && buffer[1].t < buffer[2].t);
        assert!((generator.time() - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sub_steps_is_noop() {
        let mut generator = seeded(SimulationConfig::biomedical());
        generator.advance(0);
        assert!(generator.is_empty());
        assert_eq!(generator.time(), 0.0);
    }

    #[test]
    fn test_time_is_strictly_increasing() {
        let mut generator = seeded(SimulationConfig::automotive());
        for sub_steps in [1, 3, 4, 7, 2, 3] {
            generator.advance(sub_steps);
        }

        let buffer = generator.buffer();
        for pair in buffer.iter().collect::<Vec<_>>().windows(2) {
            assert!(pair[0].t < pair[1].t);
        }
    }

    #[test]
    fn test_bounded_channels_stay_in_domain() {
        let mut config = SimulationConfig::automotive();
        // push the noise far past the channel domains
        config.noise_scale = 50.0;
        let mut generator = seeded(config);

        for _ in 0..600 {
            generator.advance(3);
        }

        let layout = generator.layout().clone();
        for sample in generator.buffer() {
            for (spec, value) in layout.channels.iter().zip(&sample.channels) {
                if let Some(bounds) = spec.bounds {
                    assert!(bounds.contains(*value), "{} = {}", spec.kind.label(), value);
                }
            }
        }
    }

    #[test]
    fn test_fused_uses_fixed_weights() {
        let mut generator = seeded(SimulationConfig::automotive());
        for _ in 0..50 {
            generator.advance(3);
        }

        let weights = generator.layout().weights();
        for sample in generator.buffer() {
            let expected: f64 = weights.iter().zip(&sample.channels).map(|(w, v)| w * v).sum();
            assert!((sample.fused - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_buffer_cap_and_fifo_eviction() {
        let mut config = SimulationConfig::biomedical();
        config.buffer_capacity = 10;
        let mut generator = seeded(config);

        for _ in 0..3 {
            generator.advance(3);
        }
        assert_eq!(generator.len(), 9);

        let oldest_before = generator.buffer()[0].t;
        let second_before = generator.buffer()[1].t;
        generator.advance(1);
        assert_eq!(generator.len(), 10);
        assert_eq!(generator.buffer()[0].t, oldest_before);

        generator.advance(1);
        assert_eq!(generator.len(), 10);
        assert_eq!(generator.buffer()[0].t, second_before);

        for _ in 0..100 {
            generator.advance(4);
            assert!(generator.len() <= 10);
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = seeded(SimulationConfig::biomedical());
        let mut b = seeded(SimulationConfig::biomedical());
        for _ in 0..20 {
            a.advance(3);
            b.advance(3);
        }
        assert_eq!(a.buffer(), b.buffer());
    }

    #[test]
    fn test_reset_replays_stream() {
        let mut generator = seeded(SimulationConfig::biomedical());
        generator.advance(3);
        let first = generator.recent(3);

        generator.reset();
        assert!(generator.is_empty());
        assert_eq!(generator.time(), 0.0);

        generator.advance(3);
        assert_eq!(generator.recent(3), first);
    }

    #[test]
    fn test_noiseless_generation_matches_ideal() {
        let mut config = SimulationConfig::biomedical();
        config.noise_scale = 0.0;
        let mut generator = seeded(config);
        for _ in 0..200 {
            generator.advance(3);
        }

        for sample in generator.buffer() {
            assert_eq!(*sample, generator.ideal_sample(sample.t));
        }

        let analyzer = QualityAnalyzer::with_layout(generator.layout().clone());
        let metrics = analyzer.analyze(generator.buffer());
        assert!(metrics.signal_to_noise_ratio_db > 60.0);
        assert!(metrics.signal_to_noise_ratio_db.is_finite());
    }

    #[test]
    fn test_metrics_in_range_while_running() {
        let mut generator = seeded(SimulationConfig::automotive());
        let analyzer = QualityAnalyzer::with_layout(generator.layout().clone());

        for _ in 0..300 {
            generator.advance(3);
            let metrics = analyzer.analyze(generator.buffer());
            assert!(metrics.signal_to_noise_ratio_db.is_finite());
            assert!((0.0..=1.0).contains(&metrics.artifact_score));
            assert!((0.0..=1.0).contains(&metrics.drift_score));
            assert!((0.0..=1.0).contains(&metrics.fusion_confidence));
        }
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut generator = seeded(SimulationConfig::biomedical());
        generator.advance(4);

        let recent = generator.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1], generator.buffer()[3]);
        assert_eq!(generator.recent(100).len(), 4);
    }

    #[test]
    fn test_update_config_keeps_clock() {
        let mut generator = seeded(SimulationConfig::biomedical());
        generator.advance(3);
        let t = generator.time();

        let mut config = SimulationConfig::biomedical();
        config.seed = Some(1234);
        config.noise_scale = 0.5;
        generator.update_config(&config).unwrap();
        assert_eq!(generator.time(), t);
        assert_eq!(generator.len(), 3);

        generator.update_config(&SimulationConfig::automotive()).unwrap();
        assert!(generator.is_empty());
        assert_eq!(generator.time(), t);
    }

    #[test]
    fn test_reweighted_layout_drops_stale_samples() {
        let mut generator = seeded(SimulationConfig::biomedical());
        for _ in 0..10 {
            generator.advance(3);
        }

        let reweighted = SensorLayout::new(
            SensorModality::Biomedical,
            vec![
                ChannelSpec::new(ChannelKind::Ecg, 0.4),
                ChannelSpec::new(ChannelKind::Eeg, 0.4),
                ChannelSpec::new(ChannelKind::Emg, 0.2),
            ],
        )
        .unwrap();
        let mut config = SimulationConfig::with_layout(reweighted);
        config.seed = Some(1234);
        config.noise_scale = 0.0;
        generator.update_config(&config).unwrap();
        assert!(generator.is_empty());

        // every stored sample agrees with the new weights, so no false noise
        for _ in 0..200 {
            generator.advance(3);
        }
        let analyzer = QualityAnalyzer::with_layout(generator.layout().clone());
        let metrics = analyzer.analyze(generator.buffer());
        assert!(metrics.signal_to_noise_ratio_db > 60.0);
    }
}
