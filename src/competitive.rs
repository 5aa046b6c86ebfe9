use crate::network::NetworkCore;
use crate::{Biased, FeedforwardNetwork, Result, WeightMatrix};

/// Two-layer linear network used for competitive (winner-take-all) learning.
///
/// Shares the weight and activation storage of [`crate::MultilayerPerceptron`] but has
/// no bias and an identity activation. None of the optimizers in this crate train it.
#[derive(Debug, Clone)]
pub struct CompetitiveLayer {
    core: NetworkCore,
}

impl CompetitiveLayer {
    pub fn new(inputs: usize, outputs: usize) -> Result<Self> {
        let mut core = NetworkCore::new(&[inputs, outputs], false)?;
        core.rebuild();
        Ok(Self { core })
    }

    /// Index of the output neuron with the largest activation.
    pub fn winner(&self) -> usize {
        let out = self.output();
        let mut best = 0;
        for (i, &v) in out.iter().enumerate() {
            if v > out[best] {
                best = i;
            }
        }
        best
    }
}

impl FeedforwardNetwork for CompetitiveLayer {
    #[inline]
    fn layer_map(&self) -> &[usize] {
        self.core.layer_map()
    }

    fn compute_output(&mut self, input: &[f64]) -> bool {
        self.core.forward(input, |x| x)
    }

    fn rebuild(&mut self) {
        self.core.rebuild();
    }

    #[inline]
    fn activations(&self) -> &[Vec<f64>] {
        self.core.activations()
    }

    /// The linear unit reports its own activation here.
    #[inline]
    fn activation_derivative(&self, layer: usize, neuron: usize) -> f64 {
        self.core.activations()[layer][neuron]
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
        None
    }
}
