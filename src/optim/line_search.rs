//! Line minimization along the gradient held by an [`ErrorState`].
//!
//! Trial points are `base + step · direction`, where `base` is a snapshot of the
//! weights taken on entry and `direction` is the state's gradient matrix. The search
//! first brackets a minimum by golden-ratio extension with parabolic guesses, then
//! refines it with Brent's method.
//!
//! On return the network holds the best point found and the direction has been
//! scaled by the best step, so it equals the displacement actually taken.

use tracing::trace;

use crate::{ErrorState, WeightMatrix};

const FIRST_STEP: f64 = 2.5;
const GOLD: f64 = 1.618034;
const GOLDEN_SECTION: f64 = 0.381_966_0;
// Bracketing never proposes a step further than this many bracket widths out.
const MAX_EXTENSION: f64 = 200.0;
const DEGENERATE_STEP: f64 = 1e30;

/// Result of one line minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSearchOutcome {
    /// The search ran to completion.
    Minimum(f64),
    /// An abort request was seen part way through. Holds the best error so far.
    Stopped(f64),
}

impl LineSearchOutcome {
    #[inline]
    pub fn error(self) -> f64 {
        match self {
            LineSearchOutcome::Minimum(e) | LineSearchOutcome::Stopped(e) => e,
        }
    }

    #[inline]
    pub fn is_stopped(self) -> bool {
        matches!(self, LineSearchOutcome::Stopped(_))
    }
}

/// Iteration limits and tolerances of one line minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LineSearchParams {
    pub max_iterations: usize,
    /// Floor for parabolic denominators and for the refinement tolerance.
    pub epsilon: f64,
    /// Relative bracket width at which refinement stops.
    pub tolerance: f64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LineSearch {
    base: WeightMatrix,
}

impl LineSearch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Minimize the epoch error along the state's gradient, starting from the current
    /// weights whose error is `start_error`.
    pub(crate) fn minimize(
        &mut self,
        state: &mut ErrorState<'_>,
        start_error: f64,
        params: LineSearchParams,
    ) -> LineSearchOutcome {
        let LineSearchParams {
            max_iterations,
            epsilon,
            tolerance,
        } = params;

        self.base.assign(state.network_mut().weights());

        // Bracketing: find x1 < x2 < x3 (or reversed) with f(x2) below both ends.
        let mut err = self.error_at(state, FIRST_STEP);
        let (mut x1, mut x2, mut prev, mut cur) = if err > start_error {
            // Uphill: walk the other way. x1 is the point just evaluated.
            state.gradient_mut().scale(-1.0);
            (-FIRST_STEP, 0.0, err, start_error)
        } else {
            (0.0, FIRST_STEP, start_error, err)
        };

        let mut x3 = x2 + GOLD * FIRST_STEP;
        err = self.error_at(state, x3);

        while err < cur {
            let t1 = (x2 - x1) * (cur - err);
            let t2 = (x2 - x3) * (cur - prev);
            let mut denom = 2.0 * (t2 - t1);
            if denom.abs() < epsilon {
                denom = if denom > 0.0 { epsilon } else { -epsilon };
            }

            let mut step = x2 + ((x2 - x1) * t1 - (x2 - x3) * t2) / denom;
            let max_step = x2 + MAX_EXTENSION * (x3 - x2);
            let step_error;

            if (x2 - step) * (step - x3) > 0.0 {
                // Parabolic guess between x2 and x3.
                let e = self.error_at(state, step);
                if e < err {
                    x1 = x2;
                    x2 = step;
                    cur = e;
                    break;
                } else if e > cur {
                    x3 = step;
                    break;
                }
                step = x3 + GOLD * (x3 - x2);
                step_error = self.error_at(state, step);
            } else if (x3 - step) * (step - max_step) > 0.0 {
                // Parabolic guess beyond x3 but within the limit.
                let mut e = self.error_at(state, step);
                if e < err {
                    x2 = x3;
                    x3 = step;
                    step = x3 + GOLD * (x3 - x2);
                    cur = err;
                    err = e;
                    e = self.error_at(state, step);
                }
                step_error = e;
            } else if (step - max_step) * (max_step - x3) >= 0.0 {
                step = max_step;
                let mut e = self.error_at(state, step);
                if e < err {
                    x2 = x3;
                    x3 = step;
                    step = x3 + GOLD * (x3 - x2);
                    cur = err;
                    err = e;
                    e = self.error_at(state, step);
                }
                step_error = e;
            } else {
                step = x3 + GOLD * (x3 - x2);
                step_error = self.error_at(state, step);
            }

            x1 = x2;
            x2 = x3;
            x3 = step;
            prev = cur;
            cur = err;
            err = step_error;
        }

        self.step_out(state, x2);
        if x1 > x3 {
            std::mem::swap(&mut x1, &mut x3);
        }

        if state.abort_requested() {
            state.gradient_mut().scale(x2);
            return LineSearchOutcome::Stopped(cur);
        }

        // Brent refinement inside [x1, x3], keeping the three best points.
        let mut prev_dist = 0.0_f64;
        let mut step = 0.0_f64;
        let (mut x_best, mut x_second, mut x_third) = (x2, x2, x2);
        let (mut f_best, mut f_second, mut f_third) = (cur, cur, cur);
        let (mut x_low, mut x_high) = (x1, x3);

        for _ in 0..max_iterations {
            let x_mid = 0.5 * (x_low + x_high);
            let tol1 = tolerance * (x_best.abs() + epsilon);
            let tol2 = 2.0 * tol1;

            if (x_best - x_mid).abs() <= tol2 - 0.5 * (x_high - x_low) {
                break;
            }

            let mut golden = true;
            if prev_dist.abs() > tol1 {
                let t1 = (x_best - x_second) * (f_best - f_third);
                let t2 = (x_best - x_third) * (f_best - f_second);
                let numer = (x_best - x_third) * t2 - (x_best - x_second) * t1;
                let denom = 2.0 * (t1 - t2);

                let test_dist = prev_dist;
                prev_dist = step;
                step = if denom != 0.0 {
                    numer / denom
                } else {
                    DEGENERATE_STEP
                };

                if step.abs() < (0.5 * test_dist).abs()
                    && step + x_best > x_low
                    && step + x_best < x_high
                {
                    let x_trial = x_best + step;
                    if x_trial - x_low < tol2 || x_high - x_trial < tol2 {
                        step = if x_best < x_mid { tol1 } else { -tol1 };
                    }
                    golden = false;
                }
            }

            if golden {
                prev_dist = if x_best >= x_mid {
                    x_low - x_best
                } else {
                    x_high - x_best
                };
                step = GOLDEN_SECTION * prev_dist;
            }

            let x_trial = if step.abs() >= tol1 {
                x_best + step
            } else if step > 0.0 {
                x_best + tol1
            } else {
                x_best - tol1
            };
            let f_trial = self.error_at(state, x_trial);

            if f_trial <= f_best {
                if x_trial >= x_best {
                    x_low = x_best;
                } else {
                    x_high = x_best;
                }
                x_third = x_second;
                x_second = x_best;
                x_best = x_trial;
                f_third = f_second;
                f_second = f_best;
                f_best = f_trial;
            } else {
                if x_trial < x_best {
                    x_low = x_trial;
                } else {
                    x_high = x_trial;
                }
                if f_trial <= f_second || x_second == x_best {
                    x_third = x_second;
                    x_second = x_trial;
                    f_third = f_second;
                    f_second = f_trial;
                } else if f_trial <= f_third || x_third == x_best || x_third == x_second {
                    x_third = x_trial;
                    f_third = f_trial;
                }
            }
        }

        self.step_out(state, x_best);
        state.gradient_mut().scale(x_best);
        trace!(step = x_best, error = f_best, "line search finished");

        if state.abort_requested() {
            LineSearchOutcome::Stopped(f_best)
        } else {
            LineSearchOutcome::Minimum(f_best)
        }
    }

    fn error_at(&self, state: &mut ErrorState<'_>, step: f64) -> f64 {
        self.step_out(state, step);
        state.compute_epoch_error(false)
    }

    /// `weights = base + step · direction`.
    fn step_out(&self, state: &mut ErrorState<'_>, step: f64) {
        let (network, direction) = state.parts_mut();
        let weights = network.weights_mut();
        for ((w, &b), &d) in weights
            .iter_mut()
            .zip(self.base.iter())
            .zip(direction.iter())
        {
            *w = b + step * d;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activation, Dataset, FeedforwardNetwork, MultilayerPerceptron};

    const PARAMS: LineSearchParams = LineSearchParams {
        max_iterations: 50,
        epsilon: 1e-10,
        tolerance: 1e-6,
    };

    // One identity neuron fitting y = 3x: the error is a parabola in the weight.
    fn linear_fit() -> (MultilayerPerceptron, Dataset) {
        let net = MultilayerPerceptron::with_activation(&[1, 1], Activation::Identity).unwrap();
        let data = Dataset::from_pairs([(vec![1.0], vec![3.0]), (vec![2.0], vec![6.0])]);
        (net, data)
    }

    #[test]
    fn finds_the_minimum_of_a_parabola() {
        let (mut net, data) = linear_fit();
        let mut state = ErrorState::new(&mut net, &data);
        let start = state.compute_epoch_error(false);

        // Unit direction on the weight only. The minimum is at step 3.
        state.gradient_mut()[(0, 0, 0)] = 1.0;
        let outcome = LineSearch::new().minimize(&mut state, start, PARAMS);

        assert!(!outcome.is_stopped());
        assert!(outcome.error() < 1e-8, "{outcome:?}");
        assert!((state.network().weight(1, 0, 0) - 3.0).abs() < 1e-4);
        // The direction now holds the displacement.
        assert!((state.gradient()[(0, 0, 0)] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn walks_backwards_when_the_first_step_goes_uphill() {
        let (mut net, data) = linear_fit();
        *net.weight_mut(1, 0, 0) = 4.0;
        let mut state = ErrorState::new(&mut net, &data);
        let start = state.compute_epoch_error(false);

        state.gradient_mut()[(0, 0, 0)] = 1.0;
        let outcome = LineSearch::new().minimize(&mut state, start, PARAMS);

        assert!(outcome.error() < start);
        assert!((state.network().weight(1, 0, 0) - 3.0).abs() < 1e-4);
        assert!((state.gradient()[(0, 0, 0)] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn never_returns_worse_than_the_start() {
        let (mut net, data) = linear_fit();
        *net.weight_mut(1, 0, 0) = 3.0;
        let mut state = ErrorState::new(&mut net, &data);
        let start = state.compute_epoch_error(false);

        // Already at the minimum along this direction.
        state.gradient_mut()[(0, 0, 0)] = 0.7;
        let outcome = LineSearch::new().minimize(&mut state, start, PARAMS);
        assert!(outcome.error() <= start);
    }

    #[test]
    fn stops_when_abort_is_requested() {
        let (mut net, data) = linear_fit();
        let mut state = ErrorState::new(&mut net, &data);
        let handle = crate::AbortHandle::new();
        handle.abort();
        state.set_abort_handle(handle);

        let start = state.compute_epoch_error(false);
        state.gradient_mut()[(0, 0, 0)] = 1.0;
        let outcome = LineSearch::new().minimize(&mut state, start, PARAMS);
        assert!(outcome.is_stopped());
        assert!(outcome.error() <= start);
    }
}
