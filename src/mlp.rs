use crate::network::NetworkCore;
use crate::{Activation, Biased, FeedforwardNetwork, Result, WeightMatrix};

/// Fully connected feedforward network with per-neuron bias.
///
/// Every non-input neuron computes `f(bias + Σ w·x)` with one shared [`Activation`].
/// Weights are zero after construction; run a [`crate::WeightInitializer`] (or use
/// [`crate::MlpBuilder`]) before training.
#[derive(Debug, Clone)]
pub struct MultilayerPerceptron {
    core: NetworkCore,
    activation: Activation,
}

impl MultilayerPerceptron {
    /// Logistic network shaped by `layer_map` (input layer first).
    pub fn new(layer_map: &[usize]) -> Result<Self> {
        Self::with_activation(layer_map, Activation::default())
    }

    pub fn with_activation(layer_map: &[usize], activation: Activation) -> Result<Self> {
        let mut core = NetworkCore::new(layer_map, true)?;
        core.rebuild();
        Ok(Self { core, activation })
    }

    #[inline]
    pub fn activation_fn(&self) -> Activation {
        self.activation
    }

    /// Number of layers including the input layer.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.core.layer_map().len()
    }

    /// Clamp every weight into `[-limit, limit]` and keep them there.
    pub fn set_weight_magnitude_limit(&mut self, limit: f64) {
        self.core.set_magnitude_limit(limit);
    }

    pub fn clear_weight_magnitude_limit(&mut self) {
        self.core.set_magnitude_limit(0.0);
    }

    #[inline]
    pub fn weight_magnitude_limit(&self) -> Option<f64> {
        self.core.magnitude_limit()
    }

    /// Forward pass returning the output layer, or `None` on an input length mismatch.
    pub fn run(&mut self, input: &[f64]) -> Option<&[f64]> {
        if self.compute_output(input) {
            Some(self.output())
        } else {
            None
        }
    }
}

impl FeedforwardNetwork for MultilayerPerceptron {
    #[inline]
    fn layer_map(&self) -> &[usize] {
        self.core.layer_map()
    }

    fn compute_output(&mut self, input: &[f64]) -> bool {
        let activation = self.activation;
        self.core.forward(input, |x| activation.apply(x))
    }

    fn rebuild(&mut self) {
        self.core.rebuild();
    }

    #[inline]
    fn activations(&self) -> &[Vec<f64>] {
        self.core.activations()
    }

    #[inline]
    fn activation_derivative(&self, layer: usize, neuron: usize) -> f64 {
        self.activation
            .derivative_from_output(self.core.activations()[layer][neuron])
    }

    fn weights(&mut self) -> &WeightMatrix {
        self.core.weights()
    }

    fn weights_mut(&mut self) -> &mut WeightMatrix {
        self.core.weights_mut()
    }

    #[inline]
    fn weight(&self, layer: usize, neuron: usize, connection: usize) -> f64 {
        self.core.weight(layer, neuron, connection)
    }

    #[inline]
    fn weight_mut(&mut self, layer: usize, neuron: usize, connection: usize) -> &mut f64 {
        self.core.weight_mut(layer, neuron, connection)
    }

    fn biased(&mut self) -> Option<&mut dyn Biased> {
        Some(self)
    }
}

impl Biased for MultilayerPerceptron {
    #[inline]
    fn bias_mut(&mut self, layer: usize, neuron: usize) -> &mut f64 {
        self.core.bias_mut(layer, neuron)
    }

    fn set_bias_for_all(&mut self, value: f64) {
        self.core.set_bias_for_all(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_gives_every_row_a_bias_slot() {
        for map in [vec![1, 1], vec![2, 3, 1], vec![4, 7, 2, 3]] {
            let mut net = MultilayerPerceptron::new(&map).unwrap();
            net.rebuild();
            let weights = net.weights();
            assert_eq!(weights.num_layers(), map.len() - 1);
            for layer in 1..map.len() {
                let rows = weights.layer(layer - 1);
                assert_eq!(rows.len(), map[layer]);
                assert!(rows.iter().all(|row| row.len() == map[layer - 1] + 1));
            }
            assert!(weights.iter().all(|&w| w == 0.0));
        }
    }

    #[test]
    fn input_mismatch_leaves_downstream_layers_untouched() {
        let mut net = MultilayerPerceptron::new(&[2, 2, 1]).unwrap();
        net.set_bias_for_all(0.7);
        assert!(net.compute_output(&[0.3, -0.1]));
        let before: Vec<Vec<f64>> = net.activations()[1..].to_vec();

        assert!(!net.compute_output(&[1.0, 2.0, 3.0]));
        assert!(!net.compute_output(&[]));
        assert_eq!(&net.activations()[1..], before.as_slice());
        assert!(net.run(&[1.0]).is_none());
    }

    #[test]
    fn bias_is_the_trailing_connection() {
        let mut net = MultilayerPerceptron::with_activation(&[2, 1], Activation::Identity).unwrap();
        *net.bias_mut(1, 0) = 0.5;
        *net.weight_mut(1, 0, 0) = 2.0;
        *net.weight_mut(1, 0, 1) = -1.0;
        assert_eq!(net.weight(1, 0, 2), 0.5);

        let out = net.run(&[3.0, 4.0]).unwrap();
        assert_eq!(out, &[0.5 + 6.0 - 4.0]);
    }

    #[test]
    fn magnitude_limit_applies_before_the_forward_pass() {
        let mut net = MultilayerPerceptron::with_activation(&[1, 1], Activation::Identity).unwrap();
        net.set_weight_magnitude_limit(1.5);
        *net.weight_mut(1, 0, 0) = 10.0;
        *net.bias_mut(1, 0) = -10.0;

        assert_eq!(net.run(&[2.0]).unwrap(), &[1.5 * 2.0 - 1.5]);
        assert_eq!(net.weight_magnitude_limit(), Some(1.5));

        net.clear_weight_magnitude_limit();
        *net.weight_mut(1, 0, 0) = 10.0;
        assert_eq!(net.run(&[1.0]).unwrap(), &[10.0 - 1.5]);
    }

    #[test]
    fn derivative_comes_from_the_cached_output() {
        let mut net = MultilayerPerceptron::new(&[1, 1]).unwrap();
        assert!(net.compute_output(&[0.0]));
        assert_eq!(net.output_activation(0), 0.5);
        assert_eq!(net.activation_derivative(1, 0), 0.25);
    }
}
