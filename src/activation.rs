//! Activation functions.
//!
//! A perceptron neuron computes `y = f(bias + Σ w·x)`. Only the post-activation
//! output `y` is kept in the network's activation state, so every derivative here
//! is expressed in terms of `y`. That is what backpropagation reads.

use std::f64::consts::{FRAC_2_PI, FRAC_PI_2};

#[derive(Debug, Clone, Copy, Default)]
/// Element-wise activation function with its derivative.
pub enum Activation {
    /// Logistic sigmoid `1 / (1 + e^-x)`.
    #[default]
    Logistic,
    /// Hyperbolic tangent.
    Tanh,
    /// `(2/π)·atan(sinh x)`, a sigmoid with heavier tails than `tanh`.
    Kenue,
    /// `f(x) = x`.
    Identity,
    /// User supplied pair. `derivative` receives the neuron *output* `y = f(x)`.
    Custom {
        f: fn(f64) -> f64,
        derivative: fn(f64) -> f64,
    },
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Logistic => logistic(x),
            Activation::Tanh => x.tanh(),
            Activation::Kenue => FRAC_2_PI * x.sinh().atan(),
            Activation::Identity => x,
            Activation::Custom { f, .. } => f(x),
        }
    }

    /// Derivative `f'(x)` evaluated from the cached output `y = f(x)`.
    #[inline]
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Activation::Logistic => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
            // sech(x) == cos(atan(sinh x)) == cos(π·y/2)
            Activation::Kenue => FRAC_2_PI * (FRAC_PI_2 * y).cos(),
            Activation::Identity => 1.0,
            Activation::Custom { derivative, .. } => derivative(y),
        }
    }
}

#[inline]
fn logistic(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_derivative(act: Activation, x: f64) -> f64 {
        let h = 1e-6;
        (act.apply(x + h) - act.apply(x - h)) / (2.0 * h)
    }

    #[test]
    fn logistic_basic_values() {
        assert!((Activation::Logistic.apply(0.0) - 0.5).abs() < 1e-12);
        assert!(Activation::Logistic.apply(40.0) > 0.999_999);
        assert!(Activation::Logistic.apply(-40.0) < 1e-6);
        assert!((Activation::Logistic.derivative_from_output(0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn derivatives_from_output_match_finite_differences() {
        for act in [
            Activation::Logistic,
            Activation::Tanh,
            Activation::Kenue,
            Activation::Identity,
        ] {
            for &x in &[-2.0, -0.7, 0.0, 0.3, 1.9] {
                let analytic = act.derivative_from_output(act.apply(x));
                let numeric = numeric_derivative(act, x);
                assert!(
                    (analytic - numeric).abs() < 1e-6,
                    "{act:?} at {x}: analytic={analytic} numeric={numeric}"
                );
            }
        }
    }

    #[test]
    fn custom_activation_is_called_through() {
        fn softsign(x: f64) -> f64 {
            x / (1.0 + x.abs())
        }
        fn softsign_from_output(y: f64) -> f64 {
            (1.0 - y.abs()).powi(2)
        }
        let act = Activation::Custom {
            f: softsign,
            derivative: softsign_from_output,
        };
        assert_eq!(act.apply(1.0), 0.5);
        assert!((act.derivative_from_output(0.5) - 0.25).abs() < 1e-12);
        assert!((act.derivative_from_output(act.apply(0.8)) - numeric_derivative(act, 0.8)).abs() < 1e-6);
    }
}
