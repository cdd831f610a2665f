//! Fusion-Core: data model and quality analysis for simulated sensor fusion
//!
//! Holds the sample shape, channel layouts with their fixed fusion weights,
//! windowed statistics and the rolling quality analyzer. Nothing here knows
//! how samples are produced.

pub mod error;
pub mod fusion;
pub mod quality;
pub mod sample;
pub mod sensor_types;
pub mod stats;

pub use error::{FusionError, FusionResult};
pub use fusion::{evaluate, fuse_window, FusionEvaluation, FusionMethod};
pub use quality::*;
pub use sample::*;
pub use sensor_types::*;
pub use stats::SeriesStats;
