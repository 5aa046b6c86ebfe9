//! Train from a JSON configuration.
//!
//! `cargo run --example config_json --features serde -- training.json`
//! Without an argument, a built-in configuration is used and printed.

use rust_nns::{Dataset, MlpBuilder, TrainingConfig};
use tracing_subscriber::EnvFilter;

const BUILT_IN: &str = r#"{
  "trainer": { "max_iterations": 500, "error_threshold": 1e-5, "log_every": 25 },
  "primary": { "kind": "conjugate_gradient" },
  "secondary": {
    "kind": "annealing",
    "start_temperature": 1.0, "stop_temperature": 0.01, "error_threshold": 1e-5,
    "temperature_steps": 5, "iterations_per_temperature": 100, "setback": 30,
    "distribution": "normal", "variance": 0.5, "seed": 7
  }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => TrainingConfig::from_json_str(BUILT_IN)?,
    };
    println!("{}", config.to_json_string_pretty()?);

    let data = Dataset::from_pairs([
        (vec![0.0, 0.0], vec![0.0]),
        (vec![0.0, 1.0], vec![1.0]),
        (vec![1.0, 0.0], vec![1.0]),
        (vec![1.0, 1.0], vec![0.0]),
    ]);
    let mut net = MlpBuilder::new(2)?
        .add_layer(3)?
        .add_layer(1)?
        .build_with_seed(1)?;

    let mut trainer = config.build()?;
    let report = trainer.train(&mut net, &data)?;
    println!(
        "epochs={} final_error={:.3e} stop={:?}",
        report.epochs, report.final_error, report.stop_reason
    );

    Ok(())
}
