//! Error handling for the sensor fusion workspace
//!
//! The numeric core (generation, statistics, quality analysis) never fails.
//! These errors only come from configuration, layout validation and the
//! stream control surface.

use core::fmt;

/// Result type alias for fallible fusion operations
pub type FusionResult<T> = Result<T, FusionError>;

/// Error type for configuration and control operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FusionError {
    /// Channel layout is unusable (empty, bad weights, bad bounds)
    InvalidLayout {
        /// Description of the layout problem
        reason: String,
    },

    /// Channel count exceeds maximum supported
    TooManyChannels {
        /// Requested channel count
        requested: usize,
        /// Maximum supported channels
        max_supported: usize,
    },

    /// Tick rate, sub-step count or step period is unusable
    InvalidTiming {
        /// Name of the offending timing field
        field: &'static str,
        /// Provided value
        value: f64,
    },

    /// Any other configuration error
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },

    /// Two collections that must line up per channel do not
    ChannelMismatch {
        /// Expected channel count
        expected: usize,
        /// Actual channel count
        actual: usize,
    },

    /// The real-time stream task is no longer running
    StreamClosed,

    /// Serialization/deserialization error
    Serialization {
        /// Serialization error description
        message: String,
    },

    /// File system error while loading or saving configuration
    Io {
        /// Path involved
        path: String,
        /// Underlying error description
        message: String,
    },
}

impl fmt::Display for FusionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionError::InvalidLayout { reason } => {
                write!(f, "Invalid channel layout: {}", reason)
            }
            FusionError::TooManyChannels { requested, max_supported } => {
                write!(f, "Too many channels: requested {}, max supported {}",
                       requested, max_supported)
            }
            FusionError::InvalidTiming { field, value } => {
                write!(f, "Invalid timing: {} = {}", field, value)
            }
            FusionError::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            FusionError::ChannelMismatch { expected, actual } => {
                write!(f, "Channel mismatch: expected {}, got {}", expected, actual)
            }
            FusionError::StreamClosed => {
                write!(f, "Simulation stream is closed")
            }
            FusionError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            FusionError::Io { path, message } => {
                write!(f, "I/O error on {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for FusionError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::FusionError::InvalidConfig {
            message: format!($($arg)*),
        }
    };
}
