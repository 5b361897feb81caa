//! Backlog simulator
//!
//! Estimates the maximum queue length of a single-server queue with stochastic
//! arrivals, stochastic service times and probabilistic rework, where a served
//! item goes back into the queue with some probability.
//!
//! Two strategies are provided and are expected to agree:
//!
//! - [`StepSimulator`] advances a logical clock in fixed increments and polls for
//!   arrivals and completions. It is an approximation that tightens as the step
//!   shrinks.
//! - [`EventSimulator`] jumps from one pending event to the next and is exact.
//!
//! # Example
//!
//! ```
//! use backlog_sim::{run_event_simulation, run_step_simulation, Normal, SimRng, Uniform};
//!
//! let rng = SimRng::seed_from_u64(42);
//! let arrivals = Uniform::new(1.0, 2.0, &rng).unwrap();
//! let service = Normal::new(1.5, 0.1, &rng).unwrap();
//!
//! let step = run_step_simulation(&arrivals, &service, 100, 0.0, 0.01, &rng).unwrap();
//! let event = run_event_simulation(&arrivals, &service, 100, 0.0, &rng).unwrap();
//! assert_eq!(step.tasks_generated, 100);
//! assert_eq!(event.tasks_generated, 100);
//! ```

pub mod comparison;
pub mod config;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod metrics;
pub mod process;
pub mod simulation;
pub mod step;

pub use comparison::{
    run_seeded, Comparison, ComparisonReport, ConvergenceReport, ReplicationReport, RunInputs,
    SweepPoint,
};
pub use config::SimulatorConfig;
pub use error::{ConfigError, EmptyQueueError, SimulationError, ValidationError};
pub use event::{run_event_simulation, EventSimulator};
pub use event_queue::{Event, EventKind, EventQueue};
pub use metrics::{encode_registry, SimulationMetrics};
pub use process::{DistributionConfig, Normal, SimRng, StochasticProcess, Uniform};
pub use simulation::{
    Observer, QueueSimulator, SimulationResult, SimulationState, Strategy, Workload,
};
pub use step::{run_step_simulation, StepSimulator};
