//! The step approximation approaches the event-driven result as the step shrinks.

use backlog_sim::{
    run_seeded, Comparison, DistributionConfig, EventSimulator, SimulatorConfig, StepSimulator,
};

/// Arrivals every 1.0, service takes 1.37. Arrival and completion times never
/// come closer than 0.01 within the first 50 arrivals, so fine steps cannot
/// reorder them.
fn deterministic_config() -> SimulatorConfig {
    SimulatorConfig::new(
        DistributionConfig::Uniform { min: 1.0, max: 1.0 },
        DistributionConfig::Normal {
            mean: 1.37,
            std_dev: 0.0,
        },
    )
    .with_target_count(50)
}

#[test]
fn fine_steps_match_event_result_exactly() {
    let config = deterministic_config();
    let event = run_seeded(&EventSimulator::new(), &config, 0).unwrap();
    assert!(event.max_queue_length > 1);

    for step_size in [0.002, 0.001, 0.0005] {
        let step = run_seeded(&StepSimulator::new(step_size).unwrap(), &config, 0).unwrap();
        assert_eq!(
            step.max_queue_length, event.max_queue_length,
            "step size {step_size}"
        );
    }
}

#[test]
fn sweep_error_vanishes_at_fine_steps() {
    let config = deterministic_config().with_sweep_step_sizes(vec![0.002, 0.001, 0.0005]);
    let report = Comparison::new().convergence_sweep(&config).unwrap();

    assert_eq!(report.points.len(), 3);
    for point in &report.points {
        assert_eq!(point.absolute_error, 0, "step size {}", point.step_size);
        assert_eq!(point.relative_error, 0.0);
    }
}

#[test]
fn mean_error_shrinks_with_step_size() {
    let config = SimulatorConfig::default().with_target_count(200);
    let seeds = 0..40u64;

    let mean_error = |step_size: f64| {
        let step = StepSimulator::new(step_size).unwrap();
        let total: u64 = seeds
            .clone()
            .map(|seed| {
                let event = run_seeded(&EventSimulator::new(), &config, seed).unwrap();
                let approx = run_seeded(&step, &config, seed).unwrap();
                approx.max_queue_length.abs_diff(event.max_queue_length)
            })
            .sum();
        total as f64 / seeds.clone().count() as f64
    };

    let errors: Vec<f64> = [0.5, 0.05, 0.001].into_iter().map(mean_error).collect();
    assert!(
        errors.windows(2).all(|pair| pair[1] <= pair[0]),
        "errors did not shrink: {errors:?}"
    );
    assert!(errors[2] <= 0.2, "fine step error too large: {errors:?}");
}

#[test]
fn replication_means_agree() {
    let config = SimulatorConfig::default()
        .with_target_count(100)
        .with_step_size(0.001)
        .with_repeat_prob_percent(10.0);
    let report = Comparison::new().replicate(&config, 50).unwrap();

    assert_eq!(report.replications, 50);
    assert!(
        (report.step_mean - report.event_mean).abs() <= 0.5,
        "step {} vs event {}",
        report.step_mean,
        report.event_mean
    );
}
