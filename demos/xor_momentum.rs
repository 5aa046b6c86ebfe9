use rust_nns::{
    Dataset, FeedforwardNetwork, GradientDescentMomentum, MlpBuilder, MomentumConfig, Trainer,
    TrainerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=rust_nns=debug shows per-epoch errors.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];
    let train = Dataset::from_rows(&xs, &ys)?;

    // 2 -> 3 -> 1, logistic everywhere.
    let mut net = MlpBuilder::new(2)?
        .add_layer(3)?
        .add_layer(1)?
        .build_with_seed(0)?;

    let mut trainer = Trainer::new(
        TrainerConfig {
            max_iterations: 10_000,
            error_threshold: 0.001,
            log_every: 500,
            ..Default::default()
        },
        GradientDescentMomentum::new(MomentumConfig {
            learning_rate: 0.25,
            momentum: 0.9,
        })?,
    )?;

    let report = trainer.train(&mut net, &train)?;
    println!(
        "epochs={} final_error={:.6} stop={:?}",
        report.epochs, report.final_error, report.stop_reason
    );

    for x in &xs {
        net.compute_output(x);
        println!("x={x:?} y={:.4}", net.output()[0]);
    }

    Ok(())
}
