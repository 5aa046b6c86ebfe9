//! Network builder.
//!
//! `MlpBuilder` collects a layer map, an activation and an optional weight
//! magnitude limit, then builds a [`MultilayerPerceptron`] and runs an initializer
//! over it.

use crate::{
    Activation, Error, MultilayerPerceptron, RandomWeightInitializer, Result, WeightInitializer,
};

#[derive(Debug, Clone)]
/// Builder for a [`MultilayerPerceptron`].
///
/// ```rust
/// use rust_nns::{Activation, FeedforwardNetwork, MlpBuilder};
///
/// # fn main() -> rust_nns::Result<()> {
/// let net = MlpBuilder::new(2)?
///     .add_layer(3)?
///     .add_layer(1)?
///     .activation(Activation::Tanh)
///     .build_with_seed(0)?;
/// assert_eq!(net.layer_map(), &[2, 3, 1]);
/// # Ok(())
/// # }
/// ```
pub struct MlpBuilder {
    layer_map: Vec<usize>,
    activation: Activation,
    weight_limit: Option<f64>,
}

impl MlpBuilder {
    /// Start building a network that accepts inputs of length `inputs`.
    pub fn new(inputs: usize) -> Result<Self> {
        if inputs == 0 {
            return Err(Error::config("input layer size must be > 0"));
        }
        Ok(Self {
            layer_map: vec![inputs],
            activation: Activation::default(),
            weight_limit: None,
        })
    }

    /// Start from a full layer map, input layer first.
    pub fn from_layer_map(layer_map: &[usize]) -> Result<Self> {
        let Some((&inputs, rest)) = layer_map.split_first() else {
            return Err(Error::config("layer map must not be empty"));
        };

        let mut b = Self::new(inputs)?;
        for &n in rest {
            b = b.add_layer(n)?;
        }
        Ok(b)
    }

    /// Append a layer of `neurons` neurons. The last layer added is the output layer.
    pub fn add_layer(mut self, neurons: usize) -> Result<Self> {
        if neurons == 0 {
            return Err(Error::config("layer size must be > 0"));
        }
        self.layer_map.push(neurons);
        Ok(self)
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Keep every weight within `[-limit, limit]`.
    pub fn weight_limit(mut self, limit: f64) -> Self {
        self.weight_limit = Some(limit);
        self
    }

    /// Build with all weights and biases at zero.
    pub fn build(self) -> Result<MultilayerPerceptron> {
        if let Some(limit) = self.weight_limit {
            if !(limit.is_finite() && limit >= 0.0) {
                return Err(Error::config(format!(
                    "weight limit must be finite and >= 0, got {limit}"
                )));
            }
        }

        let mut net = MultilayerPerceptron::with_activation(&self.layer_map, self.activation)?;
        if let Some(limit) = self.weight_limit {
            net.set_weight_magnitude_limit(limit);
        }
        Ok(net)
    }

    /// Build and initialize with [`RandomWeightInitializer`] seeded by `seed`.
    pub fn build_with_seed(self, seed: u64) -> Result<MultilayerPerceptron> {
        self.build_with(&mut RandomWeightInitializer::with_seed(seed))
    }

    /// Build and run `initializer` over the network.
    pub fn build_with<I: WeightInitializer + ?Sized>(
        self,
        initializer: &mut I,
    ) -> Result<MultilayerPerceptron> {
        let mut net = self.build()?;
        initializer.initialize_weights(&mut net);
        Ok(net)
    }
}
