//! JSON training configuration (feature: `serde`).
//!
//! ```json
//! {
//!   "trainer": { "max_iterations": 1000, "error_threshold": 1e-5 },
//!   "primary": { "kind": "conjugate_gradient", "error_delta_tolerance": 1e-4 },
//!   "secondary": {
//!     "kind": "annealing",
//!     "start_temperature": 1.0, "stop_temperature": 0.01, "error_threshold": 1e-5,
//!     "temperature_steps": 5, "iterations_per_temperature": 100, "setback": 30,
//!     "distribution": "normal", "variance": 0.5, "seed": 7
//!   }
//! }
//! ```
//!
//! Omitted trainer, momentum and conjugate-gradient fields take their defaults.
//! Annealing fields are all required.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    AnnealingConfig, ConjugateGradient, ConjugateGradientConfig, Error, ErrorMetric,
    GradientDescentMomentum, MomentumConfig, Optimizer, Result, SimulatedAnnealing, Trainer,
    TrainerConfig,
};

/// One optimizer, tagged by `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Momentum(MomentumConfig),
    ConjugateGradient(ConjugateGradientConfig),
    Annealing(AnnealingConfig),
}

impl OptimizerConfig {
    pub fn build(&self) -> Result<Optimizer> {
        Ok(match *self {
            OptimizerConfig::Momentum(cfg) => GradientDescentMomentum::new(cfg)?.into(),
            OptimizerConfig::ConjugateGradient(cfg) => ConjugateGradient::new(cfg)?.into(),
            OptimizerConfig::Annealing(cfg) => SimulatedAnnealing::new(cfg)?.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub metric: ErrorMetric,
    pub primary: OptimizerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<OptimizerConfig>,
}

impl TrainingConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Json(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Json(e.to_string()))
    }

    /// Validate every part and assemble a [`Trainer`].
    pub fn build(&self) -> Result<Trainer> {
        let mut trainer = Trainer::new(self.trainer, self.primary.build()?)?.with_metric(self.metric);
        if let Some(secondary) = &self.secondary {
            trainer = trainer.with_secondary(secondary.build()?);
        }
        Ok(trainer)
    }
}
