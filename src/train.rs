//! The epoch loop.
//!
//! [`Trainer::train`] binds an [`ErrorState`] to a network and dataset, then repeats:
//!
//! 1. compute the epoch error and gradient, append the error to the history;
//! 2. stop on the error threshold, an abort request, or an optimizer that reported
//!    completion on the previous epoch;
//! 3. run the primary optimizer;
//! 4. unless it reported completion (or an abort arrived), run the secondary
//!    optimizer if one is configured.
//!
//! Aborting is cooperative: [`AbortHandle::abort`] only takes effect at the next epoch
//! boundary, unless [`TrainerConfig::abort_line_search`] lets optimizers poll it too.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::optim::{Optimizer, WeightOptimizer};
use crate::{Dataset, Error, ErrorMetric, ErrorState, FeedforwardNetwork, Result};

/// Epoch loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainerConfig {
    pub max_iterations: usize,
    /// Training stops once the epoch error is at or below this value.
    pub error_threshold: f64,
    /// Log the epoch error every `log_every` epochs. 0 disables it.
    pub log_every: usize,
    /// Reject datasets whose rows do not fit the network instead of skipping them.
    pub strict_shapes: bool,
    /// Let optimizers observe an abort request between line-search phases and
    /// annealing temperatures.
    pub abort_line_search: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            error_threshold: 0.05,
            log_every: 100,
            strict_shapes: false,
            abort_line_search: false,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations must be > 0"));
        }
        if self.error_threshold.is_nan() {
            return Err(Error::config("error_threshold must not be NaN"));
        }
        Ok(())
    }
}

/// Thread-safe stop flag shared with a [`Trainer`].
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Safe to call from any thread.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Why [`Trainer::train`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ErrorThreshold,
    /// An optimizer reported completion on the previous epoch.
    OptimizerConverged,
    Aborted,
    MaxIterations,
    /// Nothing to train on. No epoch was run.
    EmptyDataset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Number of epoch errors computed.
    pub epochs: usize,
    /// Error of the last evaluated epoch.
    pub final_error: f64,
    pub stop_reason: StopReason,
    /// Every epoch error, oldest first.
    pub history: Vec<f64>,
}

/// Drives a primary optimizer, and optionally a secondary one, over epochs.
///
/// ```rust
/// use rust_nns::{
///     Dataset, GradientDescentMomentum, MlpBuilder, Trainer, TrainerConfig,
/// };
///
/// # fn main() -> rust_nns::Result<()> {
/// let data = Dataset::from_pairs([
///     (vec![0.0, 0.0], vec![0.0]),
///     (vec![0.0, 1.0], vec![1.0]),
///     (vec![1.0, 0.0], vec![1.0]),
///     (vec![1.0, 1.0], vec![0.0]),
/// ]);
/// let mut net = MlpBuilder::new(2)?.add_layer(3)?.add_layer(1)?.build_with_seed(0)?;
///
/// let mut trainer = Trainer::new(
///     TrainerConfig { max_iterations: 50, ..Default::default() },
///     GradientDescentMomentum::default(),
/// )?;
/// let report = trainer.train(&mut net, &data)?;
/// assert_eq!(report.history.len(), report.epochs);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainerConfig,
    metric: ErrorMetric,
    primary: Optimizer,
    secondary: Option<Optimizer>,
    abort: AbortHandle,
}

impl Trainer {
    pub fn new(config: TrainerConfig, primary: impl Into<Optimizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            metric: ErrorMetric::default(),
            primary: primary.into(),
            secondary: None,
            abort: AbortHandle::new(),
        })
    }

    /// Run `secondary` after every primary step that does not finish the run.
    pub fn with_secondary(mut self, secondary: impl Into<Optimizer>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn with_metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    #[inline]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    #[inline]
    pub fn primary(&self) -> &Optimizer {
        &self.primary
    }

    #[inline]
    pub fn secondary(&self) -> Option<&Optimizer> {
        self.secondary.as_ref()
    }

    /// A handle that can stop the current or next run from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort_training(&self) {
        self.abort.abort();
    }

    #[inline]
    pub fn is_training_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Train `network` on `dataset`.
    ///
    /// Fails only when `strict_shapes` is set and the dataset does not fit the network.
    /// An empty dataset is not an error: nothing runs and the report says so.
    pub fn train(
        &mut self,
        network: &mut dyn FeedforwardNetwork,
        dataset: &Dataset,
    ) -> Result<TrainingReport> {
        if dataset.is_empty() {
            warn!("training skipped: dataset is empty");
            return Ok(TrainingReport {
                epochs: 0,
                final_error: 0.0,
                stop_reason: StopReason::EmptyDataset,
                history: Vec::new(),
            });
        }
        if self.config.strict_shapes {
            dataset.validate_for(network.layer_map())?;
        }

        self.abort.reset();

        info!(
            layer_map = ?network.layer_map(),
            examples = dataset.len(),
            primary = self.primary.kind(),
            secondary = self.secondary.as_ref().map(Optimizer::kind),
            max_iterations = self.config.max_iterations,
            "training started"
        );

        let mut state = ErrorState::new(network, dataset).with_metric(self.metric);
        if self.config.abort_line_search {
            state.set_abort_handle(self.abort.clone());
        }

        self.primary.initialize(state.network_mut());
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.initialize(state.network_mut());
        }

        let mut completed = false;
        let mut epochs = 0;
        let mut error = 0.0;
        let mut stop_reason = StopReason::MaxIterations;

        for epoch in 0..self.config.max_iterations {
            error = state.compute_epoch_gradient();
            state.record_error(error);
            epochs = epoch + 1;

            if self.config.log_every > 0 && epoch % self.config.log_every == 0 {
                debug!(epoch, error, "epoch");
            }

            if error <= self.config.error_threshold {
                stop_reason = StopReason::ErrorThreshold;
                break;
            }
            if self.abort.is_aborted() {
                stop_reason = StopReason::Aborted;
                break;
            }
            if completed {
                stop_reason = StopReason::OptimizerConverged;
                break;
            }

            completed = self.primary.optimize_weights(&mut state);
            if completed || self.abort.is_aborted() {
                continue;
            }
            if let Some(secondary) = self.secondary.as_mut() {
                secondary.optimize_weights(&mut state);
            }
        }

        info!(epochs, final_error = error, ?stop_reason, "training finished");

        Ok(TrainingReport {
            epochs,
            final_error: error,
            stop_reason,
            history: state.take_history(),
        })
    }
}
