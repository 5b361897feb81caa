//! Exact discrete-event simulation.
//!
//! Pending events live in an [`EventQueue`]; each iteration pops the earliest
//! one, applies it and schedules whatever follows from it. At most one service
//! completion is ever pending, and the server is busy exactly while it is.

use tracing::{debug, trace};

use crate::error::SimulationError;
use crate::event_queue::{Event, EventKind, EventQueue};
use crate::metrics::SimulationMetrics;
use crate::process::{SimRng, StochasticProcess};
use crate::simulation::{
    Observer, QueueSimulator, SimulationResult, SimulationState, Strategy, Workload,
};

#[derive(Default)]
pub struct EventSimulator {
    metrics: Option<SimulationMetrics>,
}

impl EventSimulator {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_metrics(mut self, metrics: SimulationMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl QueueSimulator for EventSimulator {
    fn strategy(&self) -> Strategy {
        Strategy::Event
    }

    fn run_observed(
        &self,
        workload: &Workload<'_>,
        observer: &mut dyn Observer,
    ) -> Result<SimulationResult, SimulationError> {
        debug!(
            target_count = workload.target_count(),
            repeat_prob_percent = workload.repeat_prob_percent(),
            "starting event simulation"
        );

        let mut state = SimulationState::default();
        let mut events = EventQueue::new();
        let mut arrivals_dispatched: u64 = 0;
        let mut completions_dispatched: u64 = 0;
        let mut current_time = 0.0;

        events.insert(Event::arrival(workload.next_interarrival()));

        while state.tasks_generated < workload.target_count() {
            let event = events.pop_earliest()?;
            debug_assert!(event.time >= current_time, "event scheduled in the past");
            current_time = event.time;

            match event.kind {
                EventKind::Arrival => {
                    arrivals_dispatched += 1;
                    state.arrive();
                    events.insert(Event::arrival(event.time + workload.next_interarrival()));

                    if state.server_free {
                        state.take_next();
                        events.insert(Event::service_completion(
                            event.time + workload.next_service_time(),
                        ));
                    }
                }
                EventKind::ServiceCompletion => {
                    completions_dispatched += 1;
                    state.complete(workload.draw_rework());

                    if state.take_next() {
                        events.insert(Event::service_completion(
                            event.time + workload.next_service_time(),
                        ));
                    }
                }
            }

            debug_assert_eq!(
                events.pending(EventKind::ServiceCompletion),
                usize::from(!state.server_free),
                "server busy state disagrees with pending completions"
            );
            trace!(
                time = event.time,
                kind = %event.kind,
                queue_length = state.queue_length,
                pending = events.len(),
                "dispatched event"
            );
            observer.observe(event.time, event.kind, &state);
        }

        let result = state.into_result(
            Strategy::Event,
            arrivals_dispatched + completions_dispatched,
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_run(
                &result,
                &[
                    (EventKind::Arrival, arrivals_dispatched),
                    (EventKind::ServiceCompletion, completions_dispatched),
                ],
            );
        }
        debug!(
            max_queue_length = result.max_queue_length,
            tasks_completed = result.tasks_completed,
            events = result.iterations,
            end_time = current_time,
            "event simulation finished"
        );
        Ok(result)
    }
}

/// Run the exact event-driven simulation once.
pub fn run_event_simulation(
    arrivals: &dyn StochasticProcess,
    service: &dyn StochasticProcess,
    target_count: u64,
    repeat_prob_percent: f64,
    rng: &SimRng,
) -> Result<SimulationResult, SimulationError> {
    let workload = Workload::new(arrivals, service, target_count, repeat_prob_percent, rng)?;
    EventSimulator::new().run(&workload)
}
