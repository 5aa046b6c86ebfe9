use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{Error, ErrorState, FeedforwardNetwork, ParamMatrix, Result};

use super::WeightOptimizer;
use super::line_search::{LineSearch, LineSearchOutcome, LineSearchParams};

const EPSILON: f64 = 1e-10;

// Regular step along the conjugate direction.
const DIRECTION_SEARCH: LineSearchParams = LineSearchParams {
    max_iterations: 10,
    epsilon: EPSILON,
    tolerance: 0.5,
};

// Tighter search along a freshly computed gradient after progress stalls.
const RESTART_SEARCH: LineSearchParams = LineSearchParams {
    max_iterations: 15,
    epsilon: EPSILON,
    tolerance: 1e-3,
};

const RANDOM_SEARCH: LineSearchParams = LineSearchParams {
    max_iterations: 10,
    epsilon: EPSILON,
    tolerance: 1e-2,
};

/// Hyperparameters of [`ConjugateGradient`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConjugateGradientConfig {
    /// Relative improvement below which a direction counts as exhausted.
    pub error_delta_tolerance: f64,
    pub max_internal_iterations: usize,
    /// Random directions tried after a stall before giving up.
    pub max_random_retry: usize,
    pub seed: u64,
}

impl Default for ConjugateGradientConfig {
    fn default() -> Self {
        Self {
            error_delta_tolerance: 1e-4,
            max_internal_iterations: 1000,
            max_random_retry: 5,
            seed: 0,
        }
    }
}

impl ConjugateGradientConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.error_delta_tolerance.is_finite() && self.error_delta_tolerance >= 0.0) {
            return Err(Error::config(format!(
                "error_delta_tolerance must be finite and >= 0, got {}",
                self.error_delta_tolerance
            )));
        }
        if self.max_internal_iterations == 0 {
            return Err(Error::config("max_internal_iterations must be > 0"));
        }
        Ok(())
    }
}

/// Polak-Ribière nonlinear conjugate gradient.
///
/// Each internal iteration line-minimizes along the current direction, then builds
/// the next direction `H = g + γ·H` from the new gradient `g`, with
/// `γ = Σ(g - G)·g / Σ G²` clamped to `[0, 1]` and `G` the previous gradient. The
/// direction is written back into the [`ErrorState`] gradient for the next search.
///
/// When an iteration improves the error by less than `error_delta_tolerance`
/// (relative), the search restarts from the true gradient and then tries up to
/// `max_random_retry` random directions before reporting exhaustion.
///
/// `optimize_weights` returns `true` only when an abort request stopped a line
/// search. Exhaustion and the internal iteration cap both return `false`, which lets
/// the trainer hand over to a secondary optimizer.
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    config: ConjugateGradientConfig,
    rng: StdRng,
    layer_map: Vec<usize>,
    // Previous gradient (G) and conjugate direction (H).
    work_gradient: ParamMatrix,
    direction: ParamMatrix,
    line_search: LineSearch,
    accepted: Vec<f64>,
}

impl ConjugateGradient {
    pub fn new(config: ConjugateGradientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            layer_map: Vec::new(),
            work_gradient: ParamMatrix::default(),
            direction: ParamMatrix::default(),
            line_search: LineSearch::new(),
            accepted: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &ConjugateGradientConfig {
        &self.config
    }

    /// Layer map captured by the last `initialize`.
    #[inline]
    pub fn layer_map(&self) -> &[usize] {
        &self.layer_map
    }

    /// Error returned by every line search of the last `optimize_weights` call, in
    /// order. Never increases.
    #[inline]
    pub fn accepted_errors(&self) -> &[f64] {
        &self.accepted
    }

    #[inline]
    fn improved(&self, previous: f64, error: f64) -> bool {
        2.0 * (previous - error) > self.config.error_delta_tolerance * (previous + error + EPSILON)
    }

    /// Run one line search and record its error. `None` means it was stopped, in
    /// which case the error also goes into the state's history.
    fn search(
        &mut self,
        state: &mut ErrorState<'_>,
        start_error: f64,
        params: LineSearchParams,
    ) -> Option<f64> {
        let outcome = self.line_search.minimize(state, start_error, params);
        self.accepted.push(outcome.error());
        match outcome {
            LineSearchOutcome::Minimum(error) => Some(error),
            LineSearchOutcome::Stopped(error) => {
                debug!(error, "line search stopped by abort request");
                state.record_error(error);
                None
            }
        }
    }

    /// Escape a stall: line-minimize along the true gradient, then along random
    /// directions.
    fn restart(&mut self, state: &mut ErrorState<'_>, previous: f64) -> Restart {
        let error = state.compute_epoch_gradient();
        let Some(mut error) = self.search(state, error, RESTART_SEARCH) else {
            return Restart::Stopped;
        };

        let max_retry = self.config.max_random_retry;
        let mut retry = 0;
        while retry < max_retry {
            debug!(retry, error, "trying a random direction");
            for d in state.gradient_mut().iter_mut() {
                *d = (0.5 - self.rng.gen_range(0.0..1.0)) / 10.0;
            }
            error = match self.search(state, error, RANDOM_SEARCH) {
                Some(error) => error,
                None => return Restart::Stopped,
            };

            // The first half of the retries always run.
            if retry < max_retry / 2 {
                retry += 1;
                continue;
            }
            if self.improved(previous, error) {
                break;
            }
            retry += 1;
        }

        if retry == max_retry {
            debug!(error, retries = max_retry, "conjugate gradient exhausted");
            return Restart::Exhausted;
        }
        Restart::Resumed(error)
    }
}

enum Restart {
    Resumed(f64),
    Stopped,
    Exhausted,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            config: ConjugateGradientConfig::default(),
            rng: StdRng::seed_from_u64(0),
            layer_map: Vec::new(),
            work_gradient: ParamMatrix::default(),
            direction: ParamMatrix::default(),
            line_search: LineSearch::new(),
            accepted: Vec::new(),
        }
    }
}

impl WeightOptimizer for ConjugateGradient {
    fn initialize(&mut self, network: &mut dyn FeedforwardNetwork) {
        self.layer_map = network.layer_map().to_vec();
        self.work_gradient = ParamMatrix::zeros_like(network.weights());
        self.direction = ParamMatrix::zeros_like(&self.work_gradient);
        self.accepted.clear();
    }

    fn optimize_weights(&mut self, state: &mut ErrorState<'_>) -> bool {
        self.accepted.clear();
        self.work_gradient.assign(state.gradient());
        self.direction.assign(state.gradient());

        let mut previous = match state.last_error() {
            Some(error) => error,
            None => state.compute_epoch_error(false),
        };

        for _ in 0..self.config.max_internal_iterations {
            let Some(mut error) = self.search(state, previous, DIRECTION_SEARCH) else {
                return true;
            };

            if !self.improved(previous, error) {
                previous = error;
                error = match self.restart(state, previous) {
                    Restart::Resumed(error) => error,
                    Restart::Stopped => return true,
                    Restart::Exhausted => return false,
                };
                self.work_gradient.assign(state.gradient());
                self.direction.assign(state.gradient());
            }

            previous = error;
            state.compute_epoch_gradient();

            let (numer, denom) = state
                .gradient()
                .iter()
                .zip(self.work_gradient.iter())
                .fold((0.0, 0.0), |(n, d), (&g, &old)| {
                    (n + (g - old) * g, d + old * old)
                });
            let gamma = if denom == 0.0 {
                0.0
            } else {
                (numer / denom).clamp(0.0, 1.0)
            };

            for ((g, old), h) in state
                .gradient_mut()
                .iter_mut()
                .zip(self.work_gradient.iter_mut())
                .zip(self.direction.iter_mut())
            {
                *old = *g;
                *h = *g + gamma * *h;
                *g = *h;
            }
        }

        debug!(
            iterations = self.config.max_internal_iterations,
            error = previous,
            "conjugate gradient hit its iteration cap"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AbortHandle, Dataset, MultilayerPerceptron, RandomWeightInitializer, WeightInitializer,
    };

    fn xor() -> Dataset {
        Dataset::from_pairs([
            (vec![0.0, 0.0], vec![0.0]),
            (vec![0.0, 1.0], vec![1.0]),
            (vec![1.0, 0.0], vec![1.0]),
            (vec![1.0, 1.0], vec![0.0]),
        ])
    }

    #[test]
    fn validate_rejects_bad_hyperparameters() {
        assert!(ConjugateGradientConfig::default().validate().is_ok());
        let bad = ConjugateGradientConfig {
            error_delta_tolerance: -1.0,
            ..Default::default()
        };
        assert!(ConjugateGradient::new(bad).is_err());
        let bad = ConjugateGradientConfig {
            max_internal_iterations: 0,
            ..Default::default()
        };
        assert!(ConjugateGradient::new(bad).is_err());
    }

    #[test]
    fn accepted_errors_never_increase() {
        let data = xor();
        for seed in 0..4 {
            let mut net = MultilayerPerceptron::new(&[2, 3, 1]).unwrap();
            RandomWeightInitializer::with_seed(seed).initialize_weights(&mut net);

            let mut cg = ConjugateGradient::new(ConjugateGradientConfig {
                max_internal_iterations: 40,
                seed,
                ..Default::default()
            })
            .unwrap();
            cg.initialize(&mut net);
            assert_eq!(cg.layer_map(), &[2, 3, 1]);

            let mut state = ErrorState::new(&mut net, &data);
            let start = state.compute_epoch_gradient();
            state.record_error(start);
            cg.optimize_weights(&mut state);

            let accepted = cg.accepted_errors();
            assert!(!accepted.is_empty());
            assert!(accepted[0] <= start);
            for pair in accepted.windows(2) {
                assert!(pair[1] <= pair[0], "seed {seed}: {accepted:?}");
            }
            // The network is left at the last accepted point.
            let last = *accepted.last().unwrap();
            assert!(state.compute_epoch_error(false) <= last + 1e-12);
        }
    }

    #[test]
    fn writes_the_next_direction_into_the_gradient() {
        let data = xor();
        let mut net = MultilayerPerceptron::new(&[2, 2, 1]).unwrap();
        RandomWeightInitializer::with_seed(9).initialize_weights(&mut net);

        let mut cg = ConjugateGradient::new(ConjugateGradientConfig {
            max_internal_iterations: 1,
            ..Default::default()
        })
        .unwrap();
        cg.initialize(&mut net);

        let mut state = ErrorState::new(&mut net, &data);
        let start = state.compute_epoch_gradient();
        state.record_error(start);
        let consumed = state.gradient().clone();
        assert!(!cg.optimize_weights(&mut state));

        // The weights moved along the gradient that was handed in.
        assert!(cg.accepted_errors()[0] < start);
        // What is left in the gradient is the stored conjugate direction, not the raw
        // gradient at the new weights.
        let direction = state.gradient().clone();
        assert_eq!(&direction, &cg.direction);
        assert_ne!(direction, consumed);
    }

    #[test]
    fn abort_request_stops_after_the_first_line_search() {
        let data = xor();
        let mut net = MultilayerPerceptron::new(&[2, 3, 1]).unwrap();
        RandomWeightInitializer::with_seed(2).initialize_weights(&mut net);

        let mut cg = ConjugateGradient::default();
        cg.initialize(&mut net);

        let handle = AbortHandle::new();
        handle.abort();
        let mut state = ErrorState::new(&mut net, &data);
        state.set_abort_handle(handle);
        let start = state.compute_epoch_gradient();
        state.record_error(start);

        assert!(cg.optimize_weights(&mut state));
        assert_eq!(cg.accepted_errors().len(), 1);

        // The stopped error is recorded and the weights sit at that point.
        let stopped = cg.accepted_errors()[0];
        assert_eq!(state.error_history(), &[start, stopped]);
        assert!((state.compute_epoch_error(false) - stopped).abs() < 1e-12);
    }
}
