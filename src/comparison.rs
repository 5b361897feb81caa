//! Drives both strategies over the same logical inputs.
//!
//! Every run gets fresh random sources: one stream for arrivals, one for
//! service times and one for rework draws. Two runs built from the same seed
//! therefore see the same k-th inter-arrival time, the same k-th service time
//! and the same k-th rework outcome, whatever order they consume them in. Any
//! difference between a step run and an event run comes from the step
//! approximation alone.

use tracing::{debug, info};

use crate::config::SimulatorConfig;
use crate::error::{SimulationError, ValidationError};
use crate::event::EventSimulator;
use crate::metrics::SimulationMetrics;
use crate::process::{SimRng, StochasticProcess};
use crate::simulation::{QueueSimulator, SimulationResult, Workload};
use crate::step::StepSimulator;

/// Processes and rework source for one run, seeded from a single value.
pub struct RunInputs {
    arrivals: Box<dyn StochasticProcess>,
    service: Box<dyn StochasticProcess>,
    rework_rng: SimRng,
}

impl RunInputs {
    pub fn new(config: &SimulatorConfig, seed: u64) -> Result<Self, ValidationError> {
        let [arrival_rng, service_rng, rework_rng] = SimRng::streams(seed);
        Ok(RunInputs {
            arrivals: config.arrival.build(&arrival_rng)?,
            service: config.service.build(&service_rng)?,
            rework_rng,
        })
    }

    pub fn workload(&self, config: &SimulatorConfig) -> Result<Workload<'_>, ValidationError> {
        Workload::new(
            self.arrivals.as_ref(),
            self.service.as_ref(),
            config.target_count,
            config.repeat_prob_percent,
            &self.rework_rng,
        )
    }
}

/// Run `simulator` on fresh inputs derived from `seed`.
pub fn run_seeded(
    simulator: &dyn QueueSimulator,
    config: &SimulatorConfig,
    seed: u64,
) -> Result<SimulationResult, SimulationError> {
    let inputs = RunInputs::new(config, seed)?;
    let workload = inputs.workload(config)?;
    simulator.run(&workload)
}

/// Both results for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonReport {
    pub step: SimulationResult,
    pub event: SimulationResult,
}

impl ComparisonReport {
    pub fn absolute_difference(&self) -> u64 {
        self.step.max_queue_length.abs_diff(self.event.max_queue_length)
    }
}

#[derive(Default)]
pub struct Comparison {
    metrics: Option<SimulationMetrics>,
}

impl Comparison {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_metrics(mut self, metrics: SimulationMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn step_simulator(&self, step_size: f64) -> Result<StepSimulator, ValidationError> {
        let simulator = StepSimulator::new(step_size)?;
        Ok(match &self.metrics {
            Some(metrics) => simulator.with_metrics(metrics.clone()),
            None => simulator,
        })
    }

    fn event_simulator(&self) -> EventSimulator {
        match &self.metrics {
            Some(metrics) => EventSimulator::new().with_metrics(metrics.clone()),
            None => EventSimulator::new(),
        }
    }

    /// Run both strategies with `config.seed`.
    pub fn run(&self, config: &SimulatorConfig) -> Result<ComparisonReport, SimulationError> {
        config.validate()?;
        self.run_with_seed(config, config.seed)
    }

    fn run_with_seed(
        &self,
        config: &SimulatorConfig,
        seed: u64,
    ) -> Result<ComparisonReport, SimulationError> {
        let step = run_seeded(&self.step_simulator(config.step_size)?, config, seed)?;
        let event = run_seeded(&self.event_simulator(), config, seed)?;
        let report = ComparisonReport { step, event };
        debug!(
            seed,
            step = step.max_queue_length,
            event = event.max_queue_length,
            "compared strategies"
        );
        Ok(report)
    }

    /// Run the step strategy at each of `config.sweep_step_sizes` against one
    /// event-driven baseline.
    pub fn convergence_sweep(
        &self,
        config: &SimulatorConfig,
    ) -> Result<ConvergenceReport, SimulationError> {
        config.validate()?;
        if config.sweep_step_sizes.is_empty() {
            return Err(ValidationError::EmptySweep.into());
        }

        let baseline = run_seeded(&self.event_simulator(), config, config.seed)?;
        let mut points = Vec::with_capacity(config.sweep_step_sizes.len());
        for &step_size in &config.sweep_step_sizes {
            let result = run_seeded(&self.step_simulator(step_size)?, config, config.seed)?;
            let absolute_error = result.max_queue_length.abs_diff(baseline.max_queue_length);
            points.push(SweepPoint {
                step_size,
                result,
                absolute_error,
                relative_error: relative_error(absolute_error, baseline.max_queue_length),
            });
        }

        info!(
            baseline = baseline.max_queue_length,
            points = points.len(),
            "convergence sweep finished"
        );
        Ok(ConvergenceReport { baseline, points })
    }

    /// Run both strategies over `replications` consecutive seeds starting at
    /// `config.seed`.
    pub fn replicate(
        &self,
        config: &SimulatorConfig,
        replications: u64,
    ) -> Result<ReplicationReport, SimulationError> {
        config.validate()?;
        if replications == 0 {
            return Err(ValidationError::ZeroReplications.into());
        }

        let mut step_total = 0u64;
        let mut event_total = 0u64;
        let mut difference_total = 0u64;
        let mut worst = 0u64;
        for i in 0..replications {
            let report = self.run_with_seed(config, config.seed.wrapping_add(i))?;
            step_total += report.step.max_queue_length;
            event_total += report.event.max_queue_length;
            difference_total += report.absolute_difference();
            worst = worst.max(report.absolute_difference());
        }

        let n = replications as f64;
        let report = ReplicationReport {
            replications,
            step_mean: step_total as f64 / n,
            event_mean: event_total as f64 / n,
            mean_absolute_difference: difference_total as f64 / n,
            max_absolute_difference: worst,
        };
        info!(
            replications,
            step_mean = report.step_mean,
            event_mean = report.event_mean,
            "replication finished"
        );
        Ok(report)
    }
}

fn relative_error(absolute_error: u64, baseline: u64) -> f64 {
    if baseline == 0 {
        if absolute_error == 0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        absolute_error as f64 / baseline as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub step_size: f64,
    pub result: SimulationResult,
    pub absolute_error: u64,
    pub relative_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceReport {
    pub baseline: SimulationResult,
    pub points: Vec<SweepPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicationReport {
    pub replications: u64,
    pub step_mean: f64,
    pub event_mean: f64,
    pub mean_absolute_difference: f64,
    pub max_absolute_difference: u64,
}
