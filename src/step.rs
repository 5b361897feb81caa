//! Fixed-increment approximation.
//!
//! The clock advances by `step_size` and each tick polls whether an arrival or a
//! service completion fell inside the elapsed window. Several things make this an
//! approximation rather than an exact simulation:
//!
//! - events inside one window are handled arrival first, whatever their true order;
//! - an idle server starts on a new item at the tick that noticed the arrival, not
//!   at the arrival time itself;
//! - at most one arrival and one completion are handled per tick, so events that
//!   pile up inside one window drain over the following ticks.
//!
//! All of them shrink with the step size, so results approach those of
//! [`EventSimulator`](crate::event::EventSimulator) as `step_size -> 0`.

use tracing::{debug, trace};

use crate::error::{SimulationError, ValidationError};
use crate::event_queue::EventKind;
use crate::metrics::SimulationMetrics;
use crate::process::{SimRng, StochasticProcess};
use crate::simulation::{
    validate_step_size, Observer, QueueSimulator, SimulationResult, SimulationState, Strategy,
    Workload,
};

pub struct StepSimulator {
    step_size: f64,
    metrics: Option<SimulationMetrics>,
}

impl StepSimulator {
    pub fn new(step_size: f64) -> Result<Self, ValidationError> {
        validate_step_size(step_size)?;
        Ok(StepSimulator {
            step_size,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: SimulationMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }
}

impl QueueSimulator for StepSimulator {
    fn strategy(&self) -> Strategy {
        Strategy::Step
    }

    fn run_observed(
        &self,
        workload: &Workload<'_>,
        observer: &mut dyn Observer,
    ) -> Result<SimulationResult, SimulationError> {
        debug!(
            step_size = self.step_size,
            target_count = workload.target_count(),
            repeat_prob_percent = workload.repeat_prob_percent(),
            "starting step simulation"
        );

        let mut state = SimulationState::default();
        let mut ticks: u64 = 0;
        let mut time_current = 0.0;
        let mut time_next_arrival = workload.next_interarrival();
        let mut time_next_service_done = 0.0;

        while state.tasks_generated < workload.target_count() {
            ticks += 1;
            // Multiply instead of accumulating so long runs do not drift.
            time_current = ticks as f64 * self.step_size;

            if time_current > time_next_arrival {
                state.arrive();
                time_next_arrival += workload.next_interarrival();
                if state.server_free && state.take_next() {
                    time_next_service_done = time_current + workload.next_service_time();
                }
                trace!(time = time_current, queue_length = state.queue_length, "arrival");
                observer.observe(time_current, EventKind::Arrival, &state);
            }

            if !state.server_free && time_current > time_next_service_done {
                state.complete(workload.draw_rework());
                if state.take_next() {
                    time_next_service_done += workload.next_service_time();
                }
                trace!(time = time_current, queue_length = state.queue_length, "service completion");
                observer.observe(time_current, EventKind::ServiceCompletion, &state);
            }
        }

        let result = state.into_result(Strategy::Step, ticks);
        if let Some(metrics) = &self.metrics {
            metrics.record_run(&result, &[]);
        }
        debug!(
            max_queue_length = result.max_queue_length,
            tasks_completed = result.tasks_completed,
            ticks,
            end_time = time_current,
            "step simulation finished"
        );
        Ok(result)
    }
}

/// Run the fixed-increment approximation once.
///
/// All draws, including rework, come from the processes' own sources and `rng`.
pub fn run_step_simulation(
    arrivals: &dyn StochasticProcess,
    service: &dyn StochasticProcess,
    target_count: u64,
    repeat_prob_percent: f64,
    step_size: f64,
    rng: &SimRng,
) -> Result<SimulationResult, SimulationError> {
    let workload = Workload::new(arrivals, service, target_count, repeat_prob_percent, rng)?;
    StepSimulator::new(step_size)?.run(&workload)
}
