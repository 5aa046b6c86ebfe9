//! Per-example error metrics.
//!
//! The epoch error is the mean of the per-example error over the dataset. The
//! backpropagated gradient is always that of the squared error, whichever metric is
//! used to report the epoch error.

/// How the error of one example is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorMetric {
    /// Mean over output neurons of `(desired - actual)^2`.
    #[default]
    MeanSquare,
    /// Natural log of [`ErrorMetric::MeanSquare`]. A perfect fit gives `-inf`.
    LogMeanSquare,
}

impl ErrorMetric {
    #[inline]
    pub fn example_error(self, actual: &[f64], desired: &[f64]) -> f64 {
        match self {
            ErrorMetric::MeanSquare => mean_square(actual, desired),
            ErrorMetric::LogMeanSquare => mean_square(actual, desired).ln(),
        }
    }
}

/// Mean squared difference.
///
/// Shape contract: `actual.len() == desired.len()`. Returns 0.0 for empty slices.
#[inline]
pub fn mean_square(actual: &[f64], desired: &[f64]) -> f64 {
    debug_assert_eq!(
        actual.len(),
        desired.len(),
        "actual len {} does not match desired len {}",
        actual.len(),
        desired.len()
    );

    if desired.is_empty() {
        return 0.0;
    }

    let mut sum = 0.0;
    for (&a, &d) in actual.iter().zip(desired) {
        let diff = d - a;
        sum += diff * diff;
    }
    sum / desired.len() as f64
}
