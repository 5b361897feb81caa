use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::event_queue::EventKind;
use crate::simulation::{SimulationResult, Strategy};

type Labels = Vec<(String, String)>;

/// Run counters, labelled by strategy.
///
/// Simulators tally into their own state while running and flush here once per
/// run, so the hot loop never touches a metric family.
#[derive(Clone, Default)]
pub struct SimulationMetrics {
    runs: Family<Labels, Counter>,
    events_dispatched: Family<Labels, Counter>,
    ticks: Family<Labels, Counter>,
    tasks_generated: Family<Labels, Counter>,
    tasks_completed: Family<Labels, Counter>,
    reworks: Family<Labels, Counter>,
    max_queue_length: Family<Labels, Gauge>,
}

impl SimulationMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let m = SimulationMetrics::default();
        registry.register(
            "simulation_runs",
            "Number of completed simulation runs",
            m.runs.clone(),
        );
        registry.register(
            "events_dispatched",
            "Number of events dispatched by the event driven simulator",
            m.events_dispatched.clone(),
        );
        registry.register(
            "ticks",
            "Number of fixed increments taken by the step simulator",
            m.ticks.clone(),
        );
        registry.register(
            "tasks_generated",
            "Number of arrivals generated",
            m.tasks_generated.clone(),
        );
        registry.register(
            "tasks_completed",
            "Number of service completions",
            m.tasks_completed.clone(),
        );
        registry.register(
            "reworks",
            "Number of completed tasks that re-entered the queue",
            m.reworks.clone(),
        );
        registry.register(
            "max_queue_length",
            "Maximum queue length reached by the most recent run",
            m.max_queue_length.clone(),
        );

        m
    }

    pub(crate) fn record_run(&self, result: &SimulationResult, dispatched: &[(EventKind, u64)]) {
        let labels = strategy_labels(result.strategy);

        self.runs.get_or_create(&labels).inc();
        self.tasks_generated
            .get_or_create(&labels)
            .inc_by(result.tasks_generated);
        self.tasks_completed
            .get_or_create(&labels)
            .inc_by(result.tasks_completed);
        self.reworks.get_or_create(&labels).inc_by(result.reworks);
        self.max_queue_length
            .get_or_create(&labels)
            .set(i64::try_from(result.max_queue_length).unwrap_or(i64::MAX));

        match result.strategy {
            Strategy::Step => {
                self.ticks.get_or_create(&labels).inc_by(result.iterations);
            }
            Strategy::Event => {
                for (kind, count) in dispatched {
                    let mut event_labels = labels.clone();
                    event_labels.push(("kind".to_owned(), kind.as_str().to_owned()));
                    self.events_dispatched
                        .get_or_create(&event_labels)
                        .inc_by(*count);
                }
            }
        }
    }

    pub fn runs(&self, strategy: Strategy) -> u64 {
        self.runs.get_or_create(&strategy_labels(strategy)).get()
    }

    pub fn last_max_queue_length(&self, strategy: Strategy) -> i64 {
        self.max_queue_length
            .get_or_create(&strategy_labels(strategy))
            .get()
    }
}

fn strategy_labels(strategy: Strategy) -> Labels {
    vec![("strategy".to_owned(), strategy.as_str().to_owned())]
}

/// Render `registry` in the OpenMetrics text format.
pub fn encode_registry(registry: &Registry) -> Result<String, fmt::Error> {
    let mut buffer = String::new();
    encode(&mut buffer, registry)?;
    Ok(buffer)
}
