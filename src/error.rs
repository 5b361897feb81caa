//! Error types for the simulator.

use thiserror::Error;

/// Parameters that violate a distribution or simulation invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Uniform bounds are inverted.
    #[error("uniform distribution requires min <= max, got min={min} max={max}")]
    InvertedBounds { min: f64, max: f64 },

    /// Normal standard deviation is negative.
    #[error("normal distribution requires std_dev >= 0, got {0}")]
    NegativeStdDev(f64),

    /// A distribution parameter is NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    /// At least one arrival must be generated.
    #[error("target count must be greater than zero")]
    ZeroTargetCount,

    /// Step size is zero, negative or not finite.
    #[error("step size must be a positive finite number, got {0}")]
    InvalidStepSize(f64),

    /// Repeat probability is outside the percentage range.
    #[error("repeat probability must be within [0, 100] percent, got {0}")]
    InvalidRepeatProbability(f64),

    /// Replication runs need at least one seed.
    #[error("replication count must be greater than zero")]
    ZeroReplications,

    /// A convergence sweep needs at least one step size.
    #[error("convergence sweep requires at least one step size")]
    EmptySweep,
}

/// Pop from an event queue that holds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue is empty")]
pub struct EmptyQueueError;

/// Errors returned by a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Input parameters were rejected before the run started.
    #[error("invalid simulation input: {0}")]
    Validation(#[from] ValidationError),

    /// The event list ran dry while arrivals were still due. Always a scheduling defect.
    #[error("scheduling defect: {0}")]
    Scheduling(#[from] EmptyQueueError),
}

/// Errors while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for a simulator config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but its values are out of range.
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
}
