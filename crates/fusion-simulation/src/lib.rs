//! Fusion-Simulation: synthetic multi-channel sensor streams
//!
//! The generator owns the simulation clock and the bounded sample buffer.
//! The real-time stream drives it from a tokio timer and republishes quality
//! metrics after every tick.

pub mod benchmark;
pub mod config;
pub mod generator;
pub mod real_time_stream;
pub mod signal_patterns;

pub use benchmark::{run_benchmark, BenchmarkConfig, BenchmarkRow, DEFAULT_NOISE_LEVELS};
pub use config::{SimulationConfig, TimingConfig};
pub use generator::SampleGenerator;
pub use real_time_stream::*;
pub use signal_patterns::*;
