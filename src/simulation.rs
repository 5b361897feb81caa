//! Shared pieces of both simulation strategies: inputs, mutable run state,
//! results and the [`QueueSimulator`] capability.

use std::fmt;

use rand::distributions::{Bernoulli, Distribution};

use crate::error::{SimulationError, ValidationError};
use crate::event_queue::EventKind;
use crate::process::{SimRng, StochasticProcess};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Fixed time increments.
    Step,
    /// Earliest pending event first.
    Event,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Step => "step",
            Strategy::Event => "event",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn validate_target_count(target_count: u64) -> Result<(), ValidationError> {
    if target_count == 0 {
        return Err(ValidationError::ZeroTargetCount);
    }
    Ok(())
}

pub(crate) fn validate_repeat_prob(repeat_prob_percent: f64) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&repeat_prob_percent) {
        return Err(ValidationError::InvalidRepeatProbability(repeat_prob_percent));
    }
    Ok(())
}

pub(crate) fn validate_step_size(step_size: f64) -> Result<(), ValidationError> {
    if !step_size.is_finite() || step_size <= 0.0 {
        return Err(ValidationError::InvalidStepSize(step_size));
    }
    Ok(())
}

/// Durations drawn from a process are clamped so logical time never runs backwards.
pub(crate) fn duration(process: &dyn StochasticProcess) -> f64 {
    process.sample().max(0.0)
}

/// Everything a simulator needs to run once.
pub struct Workload<'a> {
    arrivals: &'a dyn StochasticProcess,
    service: &'a dyn StochasticProcess,
    target_count: u64,
    repeat_prob_percent: f64,
    rework: Bernoulli,
    rng: SimRng,
}

impl<'a> Workload<'a> {
    /// `rng` feeds the rework draws. It may be a handle onto the same stream the
    /// processes use.
    pub fn new(
        arrivals: &'a dyn StochasticProcess,
        service: &'a dyn StochasticProcess,
        target_count: u64,
        repeat_prob_percent: f64,
        rng: &SimRng,
    ) -> Result<Self, ValidationError> {
        validate_target_count(target_count)?;
        validate_repeat_prob(repeat_prob_percent)?;
        let rework = Bernoulli::new(repeat_prob_percent / 100.0)
            .map_err(|_| ValidationError::InvalidRepeatProbability(repeat_prob_percent))?;

        Ok(Workload {
            arrivals,
            service,
            target_count,
            repeat_prob_percent,
            rework,
            rng: rng.clone(),
        })
    }

    pub fn target_count(&self) -> u64 {
        self.target_count
    }

    pub fn repeat_prob_percent(&self) -> f64 {
        self.repeat_prob_percent
    }

    pub(crate) fn next_interarrival(&self) -> f64 {
        duration(self.arrivals)
    }

    pub(crate) fn next_service_time(&self) -> f64 {
        duration(self.service)
    }

    pub(crate) fn draw_rework(&self) -> bool {
        self.rework.sample(&mut *self.rng.borrow_mut())
    }
}

/// Mutable state of one run. Owned by the simulator executing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationState {
    pub queue_length: u64,
    pub max_queue_length: u64,
    pub tasks_generated: u64,
    pub tasks_completed: u64,
    pub reworks: u64,
    pub server_free: bool,
}

impl Default for SimulationState {
    fn default() -> Self {
        SimulationState {
            queue_length: 0,
            max_queue_length: 0,
            tasks_generated: 0,
            tasks_completed: 0,
            reworks: 0,
            server_free: true,
        }
    }
}

impl SimulationState {
    fn enqueue(&mut self) {
        self.queue_length += 1;
        self.max_queue_length = self.max_queue_length.max(self.queue_length);
    }

    pub(crate) fn arrive(&mut self) {
        self.enqueue();
        self.tasks_generated += 1;
    }

    pub(crate) fn complete(&mut self, reworked: bool) {
        self.tasks_completed += 1;
        if reworked {
            self.reworks += 1;
            self.enqueue();
        }
    }

    /// Hand the next waiting item to the server. Returns whether the server is busy afterwards.
    pub(crate) fn take_next(&mut self) -> bool {
        if self.queue_length > 0 {
            self.queue_length -= 1;
            self.server_free = false;
        } else {
            self.server_free = true;
        }
        !self.server_free
    }

    pub(crate) fn into_result(self, strategy: Strategy, iterations: u64) -> SimulationResult {
        SimulationResult {
            strategy,
            max_queue_length: self.max_queue_length,
            tasks_generated: self.tasks_generated,
            tasks_completed: self.tasks_completed,
            reworks: self.reworks,
            final_queue_length: self.queue_length,
            iterations,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationResult {
    pub strategy: Strategy,
    pub max_queue_length: u64,
    pub tasks_generated: u64,
    pub tasks_completed: u64,
    /// Completions that went back into the queue.
    pub reworks: u64,
    /// Items still waiting when the run stopped.
    pub final_queue_length: u64,
    /// Ticks taken (step) or events dispatched (event).
    pub iterations: u64,
}

/// Sees every state transition of a run, after it has been applied.
pub trait Observer {
    fn observe(&mut self, time: f64, cause: EventKind, state: &SimulationState);
}

impl<F> Observer for F
where
    F: FnMut(f64, EventKind, &SimulationState),
{
    fn observe(&mut self, time: f64, cause: EventKind, state: &SimulationState) {
        self(time, cause, state)
    }
}

pub(crate) struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&mut self, _time: f64, _cause: EventKind, _state: &SimulationState) {}
}

/// A strategy for estimating the backlog of a workload.
pub trait QueueSimulator {
    fn strategy(&self) -> Strategy;

    fn run_observed(
        &self,
        workload: &Workload<'_>,
        observer: &mut dyn Observer,
    ) -> Result<SimulationResult, SimulationError>;

    fn run(&self, workload: &Workload<'_>) -> Result<SimulationResult, SimulationError> {
        self.run_observed(workload, &mut NoopObserver)
    }
}
