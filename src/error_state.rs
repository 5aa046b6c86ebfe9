//! Epoch error and backpropagated gradient.
//!
//! [`ErrorState`] borrows one network and one dataset for the length of a training
//! run. It owns the gradient accumulator, the per-neuron deltas used by
//! backpropagation and the per-epoch error history.
//!
//! # Gradient convention
//!
//! The stored gradient is the *negative* error gradient, summed (not averaged) over
//! the examples:
//!
//! ```text
//! gradient[l][j][k] = Σ_examples delta[l][j] · activation[l-1][k]
//! delta (output)    = (desired - actual) · f'(actual)
//! ```
//!
//! so `weight += rate · gradient` moves downhill. For an epoch error `E` over `N`
//! examples with `M` outputs, `gradient = -(N·M/2) · ∂E/∂w`.
//!
//! # Shared gradient
//!
//! Optimizers read the gradient after [`ErrorState::compute_epoch_gradient`] and may
//! overwrite it in place with their next search direction (see
//! [`ErrorState::gradient_mut`] and [`ErrorState::parts_mut`]). The next
//! `compute_epoch_gradient` call zeroes it again.

use tracing::trace;

use crate::train::AbortHandle;
use crate::{Dataset, ErrorMetric, FeedforwardNetwork, GradientMatrix};

pub struct ErrorState<'a> {
    network: &'a mut dyn FeedforwardNetwork,
    dataset: &'a Dataset,
    metric: ErrorMetric,
    gradient: GradientMatrix,
    // Backprop scratch, one entry per neuron of every non-input layer.
    deltas: Vec<Vec<f64>>,
    history: Vec<f64>,
    abort: Option<AbortHandle>,
}

impl<'a> ErrorState<'a> {
    pub fn new(network: &'a mut dyn FeedforwardNetwork, dataset: &'a Dataset) -> Self {
        let gradient = GradientMatrix::zeros_like(network.weights());
        let deltas = network.layer_map()[1..]
            .iter()
            .map(|&n| vec![0.0; n])
            .collect();

        Self {
            network,
            dataset,
            metric: ErrorMetric::default(),
            gradient,
            deltas,
            history: Vec::new(),
            abort: None,
        }
    }

    pub fn with_metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn set_metric(&mut self, metric: ErrorMetric) {
        self.metric = metric;
    }

    #[inline]
    pub fn metric(&self) -> ErrorMetric {
        self.metric
    }

    /// Mean per-example error over the dataset.
    ///
    /// With `with_gradient`, the gradient is zeroed and then accumulated by
    /// backpropagation over every example. Examples whose input or desired output do
    /// not fit the network contribute nothing. An empty dataset yields 0.0.
    pub fn compute_epoch_error(&mut self, with_gradient: bool) -> f64 {
        if with_gradient {
            self.gradient.fill(0.0);
        }

        let dataset = self.dataset;
        if dataset.is_empty() {
            return 0.0;
        }

        let output_len = self.network.output_len();
        let mut error = 0.0;
        for (idx, example) in dataset.iter().enumerate() {
            if example.desired.len() != output_len || !self.network.compute_output(&example.input)
            {
                trace!(
                    example = idx,
                    input_len = example.input.len(),
                    desired_len = example.desired.len(),
                    "skipping example that does not fit the network"
                );
                continue;
            }

            error += self
                .metric
                .example_error(self.network.output(), &example.desired);

            if with_gradient {
                self.backpropagate(&example.desired);
            }
        }

        error / dataset.len() as f64
    }

    #[inline]
    pub fn compute_epoch_gradient(&mut self) -> f64 {
        self.compute_epoch_error(true)
    }

    /// Accumulate one example into the gradient. The forward pass for that example
    /// must be the most recent one.
    fn backpropagate(&mut self, desired: &[f64]) {
        let Self {
            network,
            gradient,
            deltas,
            ..
        } = self;
        let network: &dyn FeedforwardNetwork = &**network;
        let layer_map = network.layer_map();
        let last = layer_map.len() - 1;

        for layer in (1..=last).rev() {
            // `deltas[layer - 1]` belongs to this layer, `deltas[layer]` to the next one.
            let (current, next) = deltas.split_at_mut(layer);
            let current = &mut current[layer - 1];
            let prev = &network.activations()[layer - 1];

            for neuron in 0..layer_map[layer] {
                let delta = if layer == last {
                    (desired[neuron] - network.activation(layer, neuron))
                        * network.activation_derivative(layer, neuron)
                } else {
                    // Transposed walk: row `k` of the next layer, column `neuron`.
                    let mut sum = 0.0;
                    for (k, &next_delta) in next[0].iter().enumerate() {
                        sum += next_delta * network.weight(layer + 1, k, neuron);
                    }
                    sum * network.activation_derivative(layer, neuron)
                };
                current[neuron] = delta;

                let row = gradient.row_mut(layer - 1, neuron);
                for (g, &x) in row.iter_mut().zip(prev) {
                    *g += delta * x;
                }
                // Bias input is 1.0.
                if let Some(bias) = row.get_mut(prev.len()) {
                    *bias += delta;
                }
            }
        }
    }

    #[inline]
    pub fn gradient(&self) -> &GradientMatrix {
        &self.gradient
    }

    /// The gradient as scratch space. Whatever is written here is what the next line
    /// search or weight update reads.
    #[inline]
    pub fn gradient_mut(&mut self) -> &mut GradientMatrix {
        &mut self.gradient
    }

    #[inline]
    pub fn network(&self) -> &(dyn FeedforwardNetwork + 'a) {
        &*self.network
    }

    #[inline]
    pub fn network_mut(&mut self) -> &mut (dyn FeedforwardNetwork + 'a) {
        &mut *self.network
    }

    /// Network and gradient borrowed together.
    #[inline]
    pub fn parts_mut(&mut self) -> (&mut (dyn FeedforwardNetwork + 'a), &mut GradientMatrix) {
        (&mut *self.network, &mut self.gradient)
    }

    #[inline]
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn record_error(&mut self, error: f64) {
        self.history.push(error);
    }

    /// Every recorded epoch error, oldest first.
    #[inline]
    pub fn error_history(&self) -> &[f64] {
        &self.history
    }

    #[inline]
    pub fn last_error(&self) -> Option<f64> {
        self.history.last().copied()
    }

    pub(crate) fn take_history(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.history)
    }

    /// Attach a stop signal that long-running optimizer phases may poll.
    pub fn set_abort_handle(&mut self, handle: AbortHandle) {
        self.abort = Some(handle);
    }

    #[inline]
    pub fn abort_requested(&self) -> bool {
        self.abort.as_ref().is_some_and(AbortHandle::is_aborted)
    }
}
