//! Configuration types for the simulator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::process::DistributionConfig;
use crate::simulation::{validate_repeat_prob, validate_step_size, validate_target_count};

/// Configuration for a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Inter-arrival time distribution.
    pub arrival: DistributionConfig,

    /// Service time distribution.
    pub service: DistributionConfig,

    /// Number of arrivals to generate before stopping.
    pub target_count: u64,

    /// Probability, in percent, that a completed task re-enters the queue.
    pub repeat_prob_percent: f64,

    /// Logical time increment of the step simulator.
    pub step_size: f64,

    /// Random seed for deterministic simulation.
    pub seed: u64,

    /// Step sizes tried by a convergence sweep, coarsest first.
    pub sweep_step_sizes: Vec<f64>,
}

impl SimulatorConfig {
    /// Create a new simulator configuration.
    pub fn new(arrival: DistributionConfig, service: DistributionConfig) -> Self {
        Self {
            arrival,
            service,
            target_count: 100,
            repeat_prob_percent: 0.0,
            step_size: 0.01,
            seed: 12345,
            sweep_step_sizes: vec![0.5, 0.1, 0.05, 0.01, 0.005, 0.001],
        }
    }

    /// Set the number of arrivals to generate.
    pub fn with_target_count(mut self, target_count: u64) -> Self {
        self.target_count = target_count;
        self
    }

    /// Set the rework probability in percent.
    pub fn with_repeat_prob_percent(mut self, repeat_prob_percent: f64) -> Self {
        self.repeat_prob_percent = repeat_prob_percent;
        self
    }

    /// Set the step simulator increment.
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the convergence sweep step sizes.
    pub fn with_sweep_step_sizes(mut self, step_sizes: Vec<f64>) -> Self {
        self.sweep_step_sizes = step_sizes;
        self
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.arrival.validate()?;
        self.service.validate()?;
        validate_target_count(self.target_count)?;
        validate_repeat_prob(self.repeat_prob_percent)?;
        validate_step_size(self.step_size)?;
        for step_size in &self.sweep_step_sizes {
            validate_step_size(*step_size)?;
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Offered load: mean service time over mean inter-arrival time.
    pub fn utilization(&self) -> f64 {
        self.service.mean() / self.arrival.mean()
    }
}

impl Default for SimulatorConfig {
    /// Uniform(1, 2) arrivals, Normal(1.5, 0.1) service.
    fn default() -> Self {
        Self::new(
            DistributionConfig::Uniform { min: 1.0, max: 2.0 },
            DistributionConfig::Normal {
                mean: 1.5,
                std_dev: 0.1,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.utilization() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            target_count = 500
            repeat_prob_percent = 10.0
            service = { kind = "normal", mean = 1.2, std_dev = 0.3 }
            "#,
        )
        .unwrap();

        assert_eq!(config.target_count, 500);
        assert_eq!(config.repeat_prob_percent, 10.0);
        assert_eq!(
            config.service,
            DistributionConfig::Normal {
                mean: 1.2,
                std_dev: 0.3
            }
        );
        assert_eq!(config.arrival, SimulatorConfig::default().arrival);
        assert_eq!(config.seed, 12345);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = SimulatorConfig::from_toml_str("arrival = { kind = \"uniform\", min = 5.0, max = 1.0 }")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::InvertedBounds { .. })
        ));

        let err = SimulatorConfig::from_toml_str("step_size = 0.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::InvalidStepSize(_))
        ));

        let err = SimulatorConfig::from_toml_str("sweep_step_sizes = [0.1, -0.01]").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::InvalidStepSize(_))
        ));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = SimulatorConfig::from_toml_str("targetcount = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
