//! Backlog simulator CLI
//!
//! Runs the step and event driven simulations side by side.
//!
//! # Example
//!
//! ```bash
//! # Uniform(1, 2) arrivals, Normal(1.5, 0.1) service, 100 arrivals, 10% rework
//! backlog-sim run --min 1 --max 2 --mean 1.5 --std-dev 0.1 --count 100 --repeat 10 --step 0.01
//!
//! # How the step result approaches the event result as the step shrinks
//! backlog-sim sweep --steps 0.5,0.1,0.01,0.001
//!
//! # Average over 200 seeds
//! backlog-sim replicate --replications 200 --config model.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use prometheus_client::registry::Registry;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use backlog_sim::{
    encode_registry, Comparison, ConfigError, DistributionConfig, SimulationError,
    SimulationMetrics, SimulatorConfig,
};

#[derive(Parser, Debug)]
#[command(name = "backlog-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run both strategies once and print their maximum queue lengths
    Run {
        #[command(flatten)]
        model: ModelArgs,

        /// Print collected metrics in OpenMetrics text format
        #[arg(long)]
        metrics: bool,
    },

    /// Compare step results at several step sizes against the event result
    Sweep {
        #[command(flatten)]
        model: ModelArgs,

        /// Step sizes to try, coarsest first
        #[arg(long, value_delimiter = ',')]
        steps: Option<Vec<f64>>,
    },

    /// Run both strategies over consecutive seeds and print mean results
    Replicate {
        #[command(flatten)]
        model: ModelArgs,

        /// Number of seeds
        #[arg(short = 'n', long, default_value = "100")]
        replications: u64,
    },
}

/// Model parameters. Flags override values from `--config`.
#[derive(Args, Debug)]
struct ModelArgs {
    /// TOML file with a simulator configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lower bound of the uniform inter-arrival time
    #[arg(long, requires = "max")]
    min: Option<f64>,

    /// Upper bound of the uniform inter-arrival time
    #[arg(long, requires = "min")]
    max: Option<f64>,

    /// Mean of the normal service time
    #[arg(long, requires = "std_dev")]
    mean: Option<f64>,

    /// Standard deviation of the normal service time
    #[arg(long, requires = "mean")]
    std_dev: Option<f64>,

    /// Number of arrivals to generate
    #[arg(long)]
    count: Option<u64>,

    /// Rework probability in percent
    #[arg(long)]
    repeat: Option<f64>,

    /// Step simulator increment
    #[arg(long)]
    step: Option<f64>,

    /// Random seed for reproducible results. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,
}

impl ModelArgs {
    fn to_config(&self) -> Result<SimulatorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::from_file(path)?,
            None => SimulatorConfig::default().with_seed(rand::random()),
        };

        if let (Some(min), Some(max)) = (self.min, self.max) {
            config.arrival = DistributionConfig::Uniform { min, max };
        }
        if let (Some(mean), Some(std_dev)) = (self.mean, self.std_dev) {
            config.service = DistributionConfig::Normal { mean, std_dev };
        }
        if let Some(count) = self.count {
            config.target_count = count;
        }
        if let Some(repeat) = self.repeat {
            config.repeat_prob_percent = repeat;
        }
        if let Some(step) = self.step {
            config.step_size = step;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("failed to encode metrics")]
    Metrics(#[from] std::fmt::Error),
}

fn log_config(config: &SimulatorConfig) {
    info!(
        arrival = %config.arrival,
        service = %config.service,
        utilization = config.utilization(),
        target_count = config.target_count,
        repeat_prob_percent = config.repeat_prob_percent,
        step_size = config.step_size,
        seed = config.seed,
        "Simulation parameters"
    );
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run { model, metrics } => {
            let config = model.to_config()?;
            log_config(&config);

            let mut registry = Registry::default();
            let comparison =
                Comparison::new().with_metrics(SimulationMetrics::new(&mut registry));
            let report = comparison.run(&config)?;

            println!("Queue size (step approach):  {}", report.step.max_queue_length);
            println!("Queue size (event approach): {}", report.event.max_queue_length);

            if metrics {
                print!("{}", encode_registry(&registry)?);
            }
        }
        Commands::Sweep { model, steps } => {
            let mut config = model.to_config()?;
            if let Some(steps) = steps {
                config = config.with_sweep_step_sizes(steps);
            }
            log_config(&config);

            let report = Comparison::new().convergence_sweep(&config)?;
            println!(
                "Event approach baseline: {}",
                report.baseline.max_queue_length
            );
            println!("{:>12} {:>10} {:>10} {:>10}", "step", "queue", "abs err", "rel err");
            for point in &report.points {
                println!(
                    "{:>12} {:>10} {:>10} {:>10.4}",
                    point.step_size,
                    point.result.max_queue_length,
                    point.absolute_error,
                    point.relative_error
                );
            }
        }
        Commands::Replicate {
            model,
            replications,
        } => {
            let config = model.to_config()?;
            log_config(&config);

            let report = Comparison::new().replicate(&config, replications)?;
            println!("Replications:                 {}", report.replications);
            println!("Mean queue size (step):       {:.3}", report.step_mean);
            println!("Mean queue size (event):      {:.3}", report.event_mean);
            println!(
                "Mean absolute difference:     {:.3}",
                report.mean_absolute_difference
            );
            println!(
                "Max absolute difference:      {}",
                report.max_absolute_difference
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,backlog_sim=info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
