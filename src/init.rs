//! Weight initialization.
//!
//! Training never starts from the zero weights left by `rebuild`: every optimizer
//! run is preceded by exactly one [`WeightInitializer`] pass.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{Error, FeedforwardNetwork, ParamMatrix, Result, WeightMatrix};

/// Assigns a value to every weight (and bias) of a network.
pub trait WeightInitializer {
    fn initialize_weights(&mut self, network: &mut dyn FeedforwardNetwork);
}

/// Uniform weights in `[-magnitude, magnitude]`, biases fixed at 1.0.
#[derive(Debug, Clone)]
pub struct RandomWeightInitializer {
    magnitude: f64,
    rng: StdRng,
}

impl RandomWeightInitializer {
    pub const DEFAULT_MAGNITUDE: f64 = 0.5;

    pub fn new(magnitude: f64, seed: u64) -> Result<Self> {
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return Err(Error::config(format!(
                "weight magnitude must be finite and > 0, got {magnitude}"
            )));
        }
        Ok(Self {
            magnitude,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            magnitude: Self::DEFAULT_MAGNITUDE,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }
}

impl WeightInitializer for RandomWeightInitializer {
    fn initialize_weights(&mut self, network: &mut dyn FeedforwardNetwork) {
        network.rebuild();

        let layer_map = network.layer_map().to_vec();
        let dist = Uniform::new_inclusive(-self.magnitude, self.magnitude);
        for layer in 1..layer_map.len() {
            for neuron in 0..layer_map[layer] {
                for connection in 0..layer_map[layer - 1] {
                    *network.weight_mut(layer, neuron, connection) = dist.sample(&mut self.rng);
                }
            }
        }

        if let Some(biased) = network.biased() {
            biased.set_bias_for_all(1.0);
        }
    }
}

/// Copies a fixed weight matrix into the network.
///
/// Useful for reproducible experiments and for restoring a snapshot taken with
/// [`FeedforwardNetwork::weights`].
#[derive(Debug, Clone)]
pub struct FixedWeights {
    weights: WeightMatrix,
}

impl FixedWeights {
    pub fn new(weights: impl Into<WeightMatrix>) -> Self {
        Self {
            weights: weights.into(),
        }
    }

    /// Fails when the matrix does not fit `network`. Rows carry a trailing bias slot
    /// only when the network is biased.
    pub fn check(&self, network: &mut dyn FeedforwardNetwork) -> Result<()> {
        let with_bias = network.biased().is_some();
        let expected = ParamMatrix::zeros(network.layer_map(), with_bias);
        if !expected.same_shape(&self.weights) {
            return Err(Error::InvalidShape(format!(
                "weights {:?} do not fit layer map {:?} (bias: {with_bias})",
                self.weights.shape(),
                network.layer_map()
            )));
        }
        Ok(())
    }
}

impl WeightInitializer for FixedWeights {
    /// Panics if the matrix shape does not match the network; see [`FixedWeights::check`].
    fn initialize_weights(&mut self, network: &mut dyn FeedforwardNetwork) {
        network.rebuild();
        network.weights_mut().copy_from(&self.weights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompetitiveLayer, MultilayerPerceptron};

    #[test]
    fn random_init_is_seeded_and_bounded() {
        let mut a = MultilayerPerceptron::new(&[3, 4, 2]).unwrap();
        let mut b = MultilayerPerceptron::new(&[3, 4, 2]).unwrap();
        RandomWeightInitializer::new(0.3, 7).unwrap().initialize_weights(&mut a);
        RandomWeightInitializer::new(0.3, 7).unwrap().initialize_weights(&mut b);
        assert_eq!(a.weights(), b.weights());

        for layer in 1..3 {
            let prev = a.layer_map()[layer - 1];
            for neuron in 0..a.layer_map()[layer] {
                assert_eq!(a.weight(layer, neuron, prev), 1.0);
                for c in 0..prev {
                    assert!(a.weight(layer, neuron, c).abs() <= 0.3);
                }
            }
        }
    }

    #[test]
    fn rejects_bad_magnitude() {
        assert!(RandomWeightInitializer::new(0.0, 0).is_err());
        assert!(RandomWeightInitializer::new(f64::NAN, 0).is_err());
        assert_eq!(RandomWeightInitializer::with_seed(1).magnitude(), 0.5);
    }

    #[test]
    fn fixed_weights_checks_shape() {
        let fixed = FixedWeights::new(vec![vec![vec![0.1, 0.2, 0.3]]]);
        let mut net = MultilayerPerceptron::new(&[2, 1]).unwrap();
        assert!(fixed.check(&mut net).is_ok());
        let mut wider = MultilayerPerceptron::new(&[3, 1]).unwrap();
        assert!(matches!(
            fixed.check(&mut wider),
            Err(Error::InvalidShape(_))
        ));

        fixed.clone().initialize_weights(&mut net);
        assert_eq!(net.weight(1, 0, 1), 0.2);
    }

    #[test]
    fn fixed_weights_fit_unbiased_networks() {
        let mut layer = CompetitiveLayer::new(2, 3).unwrap();
        let rows = vec![vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]];

        // Biased rows do not fit a network without bias.
        let biased = FixedWeights::new(vec![vec![vec![1.0, 0.0, 0.0]; 3]]);
        assert!(biased.check(&mut layer).is_err());

        let mut fixed = FixedWeights::new(rows);
        fixed.check(&mut layer).unwrap();
        fixed.initialize_weights(&mut layer);

        assert!(layer.compute_output(&[0.2, 0.9]));
        assert_eq!(&layer.output()[..2], &[0.2, 0.9]);
        assert!((layer.output()[2] - 0.55).abs() < 1e-12);
        assert_eq!(layer.winner(), 1);
    }
}
