//! Feedforward neural network training.
//!
//! `rust-nns` trains multilayer perceptrons with batch backpropagation and one of three
//! weight optimizers:
//!
//! - [`GradientDescentMomentum`]: gradient descent with a momentum term.
//! - [`ConjugateGradient`]: Polak-Ribière conjugate gradient with a bracketing and
//!   Brent line search, plus random restarts when progress stalls.
//! - [`SimulatedAnnealing`]: random perturbation around the best weights under a
//!   decaying temperature, usually run as a secondary optimizer to leave a local
//!   minimum.
//!
//! A [`Trainer`] runs the epoch loop. Each epoch an [`ErrorState`] computes the epoch
//! error and the summed gradient over the [`Dataset`], then the optimizer updates the
//! weights of the network in place.
//!
//! # Panics vs `Result`
//!
//! - Constructors, builders, config validation and [`Trainer::train`] return
//!   [`Result`].
//! - The numeric hot path never fails. Rows that do not fit the network are
//!   skipped (see [`ErrorState::compute_epoch_error`]) unless
//!   [`TrainerConfig::strict_shapes`] is set. Out-of-range weight indices panic like
//!   slice indexing.
//!
//! # Data layout
//!
//! - Scalars are `f64`.
//! - Weights are stored as `[weight layer][neuron][connection]`, with the bias as the
//!   last connection of each row. Network layer `l` (layer 0 being the input) reads
//!   weight layer `l - 1`.
//!
//! # Quick start
//!
//! ```rust
//! use rust_nns::{
//!     Dataset, GradientDescentMomentum, MlpBuilder, MomentumConfig, StopReason, Trainer,
//!     TrainerConfig,
//! };
//!
//! # fn main() -> rust_nns::Result<()> {
//! let data = Dataset::from_rows(
//!     &[vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
//!     &[vec![0.0], vec![1.0], vec![1.0], vec![0.0]],
//! )?;
//!
//! let mut net = MlpBuilder::new(2)?.add_layer(3)?.add_layer(1)?.build_with_seed(0)?;
//!
//! let mut trainer = Trainer::new(
//!     TrainerConfig {
//!         max_iterations: 200,
//!         error_threshold: 0.001,
//!         ..Default::default()
//!     },
//!     GradientDescentMomentum::new(MomentumConfig::default())?,
//! )?;
//! let report = trainer.train(&mut net, &data)?;
//! assert!(matches!(
//!     report.stop_reason,
//!     StopReason::ErrorThreshold | StopReason::MaxIterations
//! ));
//! # Ok(())
//! # }
//! ```
//!
//! # Driving an optimizer by hand
//!
//! ```rust
//! use rust_nns::{
//!     ConjugateGradient, Dataset, ErrorState, MlpBuilder, WeightOptimizer,
//! };
//!
//! # fn main() -> rust_nns::Result<()> {
//! let data = Dataset::from_pairs([(vec![0.5], vec![0.2]), (vec![-0.5], vec![0.8])]);
//! let mut net = MlpBuilder::new(1)?.add_layer(2)?.add_layer(1)?.build_with_seed(3)?;
//!
//! let mut cg = ConjugateGradient::default();
//! cg.initialize(&mut net);
//!
//! let mut state = ErrorState::new(&mut net, &data);
//! let before = state.compute_epoch_gradient();
//! state.record_error(before);
//! cg.optimize_weights(&mut state);
//! assert!(state.compute_epoch_error(false) <= before);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod competitive;
#[cfg(feature = "serde")]
pub mod config;
pub mod data;
pub mod error;
pub mod error_state;
pub mod init;
pub mod loss;
pub mod matrix;
pub mod mlp;
pub mod network;
pub mod optim;
pub mod train;

pub use activation::Activation;
pub use builder::MlpBuilder;
pub use competitive::CompetitiveLayer;
#[cfg(feature = "serde")]
pub use config::{OptimizerConfig, TrainingConfig};
pub use data::{Dataset, Example};
pub use error::{Error, Result};
pub use error_state::ErrorState;
pub use init::{FixedWeights, RandomWeightInitializer, WeightInitializer};
pub use loss::ErrorMetric;
pub use matrix::{GradientMatrix, ParamMatrix, WeightMatrix};
pub use mlp::MultilayerPerceptron;
pub use network::{Biased, FeedforwardNetwork};
pub use optim::{
    AnnealingConfig, AnnealingRun, ConjugateGradient, ConjugateGradientConfig,
    GradientDescentMomentum, LineSearchOutcome, MomentumConfig, Optimizer,
    PerturbationDistribution, SimulatedAnnealing, WeightOptimizer,
};
pub use train::{AbortHandle, StopReason, Trainer, TrainerConfig, TrainingReport};
