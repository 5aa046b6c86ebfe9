use crate::{Error, ErrorState, FeedforwardNetwork, ParamMatrix, Result};

use super::WeightOptimizer;

/// Hyperparameters of [`GradientDescentMomentum`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MomentumConfig {
    pub learning_rate: f64,
    /// Fraction of the previous correction carried into the next one.
    pub momentum: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.25,
            momentum: 0.9,
        }
    }
}

impl MomentumConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::config(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if !(self.momentum.is_finite() && (0.0..1.0).contains(&self.momentum)) {
            return Err(Error::config(format!(
                "momentum must be finite and in [0,1), got {}",
                self.momentum
            )));
        }
        Ok(())
    }
}

/// Batch gradient descent with momentum.
///
/// For every weight, bias included:
///
/// ```text
/// correction = learning_rate · gradient + momentum · previous_correction
/// weight    += correction
/// ```
///
/// Never reports convergence; the trainer's error threshold ends the run.
#[derive(Debug, Clone)]
pub struct GradientDescentMomentum {
    config: MomentumConfig,
    previous: ParamMatrix,
}

impl GradientDescentMomentum {
    pub fn new(config: MomentumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            previous: ParamMatrix::default(),
        })
    }

    #[inline]
    pub fn config(&self) -> &MomentumConfig {
        &self.config
    }

    /// Corrections applied by the last step.
    #[inline]
    pub fn momentum_matrix(&self) -> &ParamMatrix {
        &self.previous
    }
}

impl Default for GradientDescentMomentum {
    fn default() -> Self {
        Self {
            config: MomentumConfig::default(),
            previous: ParamMatrix::default(),
        }
    }
}

impl WeightOptimizer for GradientDescentMomentum {
    fn initialize(&mut self, network: &mut dyn FeedforwardNetwork) {
        self.previous = ParamMatrix::zeros_like(network.weights());
    }

    fn optimize_weights(&mut self, state: &mut ErrorState<'_>) -> bool {
        let MomentumConfig {
            learning_rate,
            momentum,
        } = self.config;
        let (network, gradient) = state.parts_mut();

        if !self.previous.same_shape(gradient) {
            self.previous = ParamMatrix::zeros_like(gradient);
        }

        let weights = network.weights_mut();
        for ((w, &g), prev) in weights
            .iter_mut()
            .zip(gradient.iter())
            .zip(self.previous.iter_mut())
        {
            let correction = learning_rate * g + momentum * *prev;
            *w += correction;
            *prev = correction;
        }

        false
    }
}
