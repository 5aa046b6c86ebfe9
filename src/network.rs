//! The network substrate shared by every feedforward variant.
//!
//! A network owns a layer map (neuron count per layer), one activation vector per
//! layer and a [`WeightMatrix`]. Optimizers mutate weights in place through
//! [`FeedforwardNetwork::weight_mut`] or [`FeedforwardNetwork::weights_mut`].
//!
//! Layer indices passed to `weight*`, `bias*` and `activation*` are *network*
//! layer indices: layer 0 is the input layer and has no weights.
//!
//! # Weight magnitude limit
//!
//! An optional ceiling can be placed on `|weight|`. Writes never clamp directly;
//! they only mark the weights as unverified. The clamp runs lazily on the next
//! forward pass or the next full read through [`FeedforwardNetwork::weights`],
//! which keeps tight optimizer loops free of per-write checks.

use tracing::trace;

use crate::{Error, ParamMatrix, Result, WeightMatrix};

/// Capability implemented by every feedforward network variant.
pub trait FeedforwardNetwork {
    /// Neuron count of every layer, input first.
    fn layer_map(&self) -> &[usize];

    /// Copy `input` into layer 0 and propagate forward.
    ///
    /// Returns `false`, leaving layers `1..` untouched, when `input` does not match
    /// the input layer or the weights were never allocated.
    fn compute_output(&mut self, input: &[f64]) -> bool;

    /// Resize weight storage to the layer map and zero it.
    fn rebuild(&mut self);

    /// Current outputs of every layer, input layer first.
    fn activations(&self) -> &[Vec<f64>];

    /// Derivative of the activation of `neuron` in `layer`, from its cached output.
    fn activation_derivative(&self, layer: usize, neuron: usize) -> f64;

    /// Full weight matrix, with any pending magnitude clamp applied first.
    fn weights(&mut self) -> &WeightMatrix;

    /// Full weight matrix for bulk writes. Marks the weights unverified.
    fn weights_mut(&mut self) -> &mut WeightMatrix;

    /// Raw read of one connection weight. Does not apply the clamp.
    fn weight(&self, layer: usize, neuron: usize, connection: usize) -> f64;

    /// Mutable access to one connection weight. Marks the weights unverified.
    fn weight_mut(&mut self, layer: usize, neuron: usize, connection: usize) -> &mut f64;

    /// Bias capability, `None` for variants without bias terms.
    fn biased(&mut self) -> Option<&mut dyn Biased>;

    #[inline]
    fn activation(&self, layer: usize, neuron: usize) -> f64 {
        self.activations()[layer][neuron]
    }

    #[inline]
    fn output_activation(&self, neuron: usize) -> f64 {
        self.output()[neuron]
    }

    /// Output layer activations.
    #[inline]
    fn output(&self) -> &[f64] {
        self.activations()
            .last()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[inline]
    fn input_len(&self) -> usize {
        self.layer_map()[0]
    }

    #[inline]
    fn output_len(&self) -> usize {
        self.layer_map()[self.layer_map().len() - 1]
    }
}

/// Per-neuron bias terms. The bias input is the constant 1.0.
pub trait Biased {
    /// Mutable access to the bias of `neuron` in network layer `layer`.
    /// Marks the weights unverified.
    fn bias_mut(&mut self, layer: usize, neuron: usize) -> &mut f64;

    fn set_bias_for_all(&mut self, value: f64);
}

/// Storage and forward pass shared by the concrete network types.
#[derive(Debug, Clone)]
pub(crate) struct NetworkCore {
    layer_map: Vec<usize>,
    activations: Vec<Vec<f64>>,
    weights: WeightMatrix,
    with_bias: bool,
    magnitude_limit: f64,
    unverified: bool,
}

impl NetworkCore {
    /// Validates the layer map. Weights stay unallocated until [`Self::rebuild`].
    pub(crate) fn new(layer_map: &[usize], with_bias: bool) -> Result<Self> {
        if layer_map.len() < 2 {
            return Err(Error::config(format!(
                "layer map must include input and output layers, got {layer_map:?}"
            )));
        }
        if layer_map.contains(&0) {
            return Err(Error::config(format!(
                "all layer sizes must be > 0, got {layer_map:?}"
            )));
        }

        Ok(Self {
            layer_map: layer_map.to_vec(),
            activations: layer_map.iter().map(|&n| vec![0.0; n]).collect(),
            weights: ParamMatrix::default(),
            with_bias,
            magnitude_limit: 0.0,
            unverified: false,
        })
    }

    #[inline]
    pub(crate) fn layer_map(&self) -> &[usize] {
        &self.layer_map
    }

    #[inline]
    pub(crate) fn activations(&self) -> &[Vec<f64>] {
        &self.activations
    }

    pub(crate) fn rebuild(&mut self) {
        self.weights = ParamMatrix::zeros(&self.layer_map, self.with_bias);
        self.unverified = false;
    }

    pub(crate) fn weights(&mut self) -> &WeightMatrix {
        self.enforce_limit();
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut WeightMatrix {
        self.unverified = true;
        &mut self.weights
    }

    #[inline]
    pub(crate) fn weight(&self, layer: usize, neuron: usize, connection: usize) -> f64 {
        self.weights[(weight_layer(layer), neuron, connection)]
    }

    #[inline]
    pub(crate) fn weight_mut(&mut self, layer: usize, neuron: usize, connection: usize) -> &mut f64 {
        self.unverified = true;
        &mut self.weights[(weight_layer(layer), neuron, connection)]
    }

    /// The bias slot is the last entry of the neuron's row.
    pub(crate) fn bias_mut(&mut self, layer: usize, neuron: usize) -> &mut f64 {
        debug_assert!(self.with_bias);
        let bias = self.layer_map[layer - 1];
        self.weight_mut(layer, neuron, bias)
    }

    pub(crate) fn set_bias_for_all(&mut self, value: f64) {
        debug_assert!(self.with_bias);
        for layer in 1..self.layer_map.len() {
            let bias = self.layer_map[layer - 1];
            for neuron in 0..self.layer_map[layer] {
                self.weights.row_mut(layer - 1, neuron)[bias] = value;
            }
        }
    }

    pub(crate) fn magnitude_limit(&self) -> Option<f64> {
        (self.magnitude_limit > 0.0).then_some(self.magnitude_limit)
    }

    /// Clamp every weight to `[-limit, limit]` now and keep doing so lazily.
    /// A zero limit disables clamping.
    pub(crate) fn set_magnitude_limit(&mut self, limit: f64) {
        self.magnitude_limit = limit.abs();
        if self.magnitude_limit > 0.0 {
            let limit = self.magnitude_limit;
            let mut clamped = 0_usize;
            for w in self.weights.iter_mut() {
                if w.abs() > limit {
                    *w = limit.copysign(*w);
                    clamped += 1;
                }
            }
            if clamped > 0 {
                trace!(clamped, limit, "clamped weights to magnitude limit");
            }
        }
        self.unverified = false;
    }

    #[inline]
    fn enforce_limit(&mut self) {
        if self.unverified && self.magnitude_limit > 0.0 {
            self.set_magnitude_limit(self.magnitude_limit);
        }
    }

    /// `activation[l][j] = f(bias + Σ_k activation[l-1][k] · weight[l][j][k])`,
    /// where the bias term exists only for biased networks.
    pub(crate) fn forward<F>(&mut self, input: &[f64], f: F) -> bool
    where
        F: Fn(f64) -> f64,
    {
        if self.weights.num_layers() == 0 || input.len() != self.layer_map[0] {
            return false;
        }

        self.activations[0].copy_from_slice(input);
        self.enforce_limit();

        for idx in 1..self.activations.len() {
            // Borrow the previous layer immutably and the current layer mutably.
            let (left, right) = self.activations.split_at_mut(idx);
            let prev = &left[idx - 1];
            let out = &mut right[0];
            let rows = self.weights.layer(idx - 1);

            for (y, row) in out.iter_mut().zip(rows) {
                let mut sum = if self.with_bias { row[prev.len()] } else { 0.0 };
                for (&w, &x) in row.iter().zip(prev) {
                    sum = w.mul_add(x, sum);
                }
                *y = f(sum);
            }
        }

        true
    }
}

#[inline]
fn weight_layer(layer: usize) -> usize {
    assert!(layer > 0, "the input layer has no weights");
    layer - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_layer_maps() {
        assert!(NetworkCore::new(&[3], true).is_err());
        assert!(NetworkCore::new(&[], true).is_err());
        assert!(NetworkCore::new(&[2, 0, 1], true).is_err());
        assert!(NetworkCore::new(&[2, 1], true).is_ok());
    }

    #[test]
    fn forward_refuses_before_rebuild() {
        let mut core = NetworkCore::new(&[2, 1], true).unwrap();
        assert!(!core.forward(&[1.0, 1.0], |x| x));
        core.rebuild();
        assert!(core.forward(&[1.0, 1.0], |x| x));
    }

    #[test]
    fn clamp_is_deferred_until_the_next_full_read() {
        let mut core = NetworkCore::new(&[1, 1], true).unwrap();
        core.rebuild();
        core.set_magnitude_limit(2.0);

        *core.weight_mut(1, 0, 0) = -7.5;
        assert_eq!(core.weight(1, 0, 0), -7.5);

        assert_eq!(core.weights()[(0, 0, 0)], -2.0);
        assert_eq!(core.magnitude_limit(), Some(2.0));

        core.set_magnitude_limit(0.0);
        *core.weight_mut(1, 0, 0) = 9.0;
        assert_eq!(core.weights()[(0, 0, 0)], 9.0);
        assert_eq!(core.magnitude_limit(), None);
    }

    #[test]
    #[should_panic(expected = "input layer has no weights")]
    fn input_layer_has_no_weights() {
        let mut core = NetworkCore::new(&[1, 1], true).unwrap();
        core.rebuild();
        core.weight(0, 0, 0);
    }
}
