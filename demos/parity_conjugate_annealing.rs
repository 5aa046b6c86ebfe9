//! 3-bit parity with conjugate gradients, falling back to simulated annealing
//! whenever the gradient search stalls in a local minimum.

use rust_nns::{
    AnnealingConfig, ConjugateGradient, ConjugateGradientConfig, Dataset, FeedforwardNetwork,
    MlpBuilder, Optimizer, PerturbationDistribution, SimulatedAnnealing, Trainer, TrainerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let seed = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(0);

    let mut data = Dataset::new();
    for bits in 0..8u8 {
        let input: Vec<f64> = (0..3).map(|i| f64::from((bits >> i) & 1)).collect();
        data.push(input, vec![f64::from(bits.count_ones() % 2 == 1)]);
    }

    let mut net = MlpBuilder::from_layer_map(&[3, 3, 5, 1])?.build_with_seed(seed)?;

    let cg = ConjugateGradient::new(ConjugateGradientConfig {
        seed,
        ..Default::default()
    })?;
    let sa = SimulatedAnnealing::new(AnnealingConfig {
        start_temperature: 1.0,
        stop_temperature: 0.01,
        error_threshold: 1e-5,
        temperature_steps: 5,
        iterations_per_temperature: 100,
        setback: 30,
        distribution: PerturbationDistribution::Normal,
        variance: 0.5,
        seed: seed.wrapping_add(1),
    })?;

    let mut trainer = Trainer::new(
        TrainerConfig {
            error_threshold: 1e-5,
            log_every: 10,
            ..Default::default()
        },
        cg,
    )?
    .with_secondary(sa);

    let report = trainer.train(&mut net, &data)?;
    println!(
        "seed={seed} epochs={} final_error={:.3e} stop={:?}",
        report.epochs, report.final_error, report.stop_reason
    );
    if let Some(run) = trainer
        .secondary()
        .and_then(Optimizer::as_annealing)
        .and_then(SimulatedAnnealing::last_run)
    {
        println!(
            "last annealing run: {:.3e} -> {:.3e} over {} temperatures",
            run.initial_error, run.best_error, run.temperatures_run
        );
    }

    for example in &data {
        net.compute_output(&example.input);
        println!(
            "x={:?} want={} y={:.4}",
            example.input,
            example.desired[0],
            net.output()[0]
        );
    }

    Ok(())
}
