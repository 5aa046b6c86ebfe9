//! Weight optimizers.
//!
//! Every optimizer works on the network and gradient held by an [`ErrorState`]. The
//! trainer computes a fresh epoch gradient before each call; an optimizer may read
//! it, move the weights, and leave its own scratch (typically a search direction) in
//! the gradient matrix.
//!
//! Optimizer state (momentum, conjugate directions) lives in the optimizer and is
//! reset by [`WeightOptimizer::initialize`] at the start of each training run.

mod annealing;
mod conjugate;
mod line_search;
mod momentum;

pub use annealing::{AnnealingConfig, AnnealingRun, PerturbationDistribution, SimulatedAnnealing};
pub use conjugate::{ConjugateGradient, ConjugateGradientConfig};
pub use line_search::LineSearchOutcome;
pub use momentum::{GradientDescentMomentum, MomentumConfig};

use crate::{ErrorState, FeedforwardNetwork};

/// Capability shared by every optimizer.
pub trait WeightOptimizer {
    /// Allocate or reset scratch state for `network`.
    fn initialize(&mut self, network: &mut dyn FeedforwardNetwork);

    /// Update the weights from the gradient currently held by `state`.
    ///
    /// Returns `true` when the optimizer considers the run finished. The trainer then
    /// stops after its next error evaluation.
    fn optimize_weights(&mut self, state: &mut ErrorState<'_>) -> bool;
}

/// The optimizers a [`crate::Trainer`] can drive.
#[derive(Debug, Clone)]
pub enum Optimizer {
    Momentum(GradientDescentMomentum),
    ConjugateGradient(ConjugateGradient),
    Annealing(SimulatedAnnealing),
}

impl Optimizer {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Optimizer::Momentum(_) => "momentum",
            Optimizer::ConjugateGradient(_) => "conjugate_gradient",
            Optimizer::Annealing(_) => "annealing",
        }
    }

    pub fn as_conjugate_gradient(&self) -> Option<&ConjugateGradient> {
        match self {
            Optimizer::ConjugateGradient(cg) => Some(cg),
            _ => None,
        }
    }

    pub fn as_annealing(&self) -> Option<&SimulatedAnnealing> {
        match self {
            Optimizer::Annealing(sa) => Some(sa),
            _ => None,
        }
    }
}

impl WeightOptimizer for Optimizer {
    fn initialize(&mut self, network: &mut dyn FeedforwardNetwork) {
        match self {
            Optimizer::Momentum(opt) => opt.initialize(network),
            Optimizer::ConjugateGradient(opt) => opt.initialize(network),
            Optimizer::Annealing(opt) => opt.initialize(network),
        }
    }

    fn optimize_weights(&mut self, state: &mut ErrorState<'_>) -> bool {
        match self {
            Optimizer::Momentum(opt) => opt.optimize_weights(state),
            Optimizer::ConjugateGradient(opt) => opt.optimize_weights(state),
            Optimizer::Annealing(opt) => opt.optimize_weights(state),
        }
    }
}

impl From<GradientDescentMomentum> for Optimizer {
    fn from(value: GradientDescentMomentum) -> Self {
        Optimizer::Momentum(value)
    }
}

impl From<ConjugateGradient> for Optimizer {
    fn from(value: ConjugateGradient) -> Self {
        Optimizer::ConjugateGradient(value)
    }
}

impl From<SimulatedAnnealing> for Optimizer {
    fn from(value: SimulatedAnnealing) -> Self {
        Optimizer::Annealing(value)
    }
}
