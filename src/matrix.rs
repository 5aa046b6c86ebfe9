//! Per-connection parameter storage.
//!
//! Weights, error gradients, momentum and search directions all share one shape:
//! `[weight layer][neuron][connection]`. Weight layer `i` feeds network layer `i + 1`,
//! and each neuron row holds one entry per neuron of network layer `i`, plus a
//! trailing bias entry when the network is biased.

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMatrix {
    layers: Vec<Vec<Vec<f64>>>,
}

/// Connection weights (bias last in each row for biased networks).
pub type WeightMatrix = ParamMatrix;

/// One partial derivative per weight, mirroring [`WeightMatrix`].
pub type GradientMatrix = ParamMatrix;

impl ParamMatrix {
    /// Zero matrix for `layer_map`. Rows get `previous + 1` entries when `with_bias`.
    pub fn zeros(layer_map: &[usize], with_bias: bool) -> Self {
        let extra = usize::from(with_bias);
        let layers = layer_map
            .windows(2)
            .map(|w| vec![vec![0.0; w[0] + extra]; w[1]])
            .collect();
        Self { layers }
    }

    /// Zero matrix with the same shape as `other`.
    pub fn zeros_like(other: &ParamMatrix) -> Self {
        let layers = other
            .layers
            .iter()
            .map(|layer| layer.iter().map(|row| vec![0.0; row.len()]).collect())
            .collect();
        Self { layers }
    }

    /// Number of weight layers (network layers minus the input layer).
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> &[Vec<f64>] {
        &self.layers[idx]
    }

    #[inline]
    pub fn row(&self, layer: usize, neuron: usize) -> &[f64] {
        &self.layers[layer][neuron]
    }

    #[inline]
    pub fn row_mut(&mut self, layer: usize, neuron: usize) -> &mut [f64] {
        &mut self.layers[layer][neuron]
    }

    /// Total number of scalars.
    pub fn len(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(Vec::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row lengths per layer, e.g. `[[3, 3], [3]]` for a biased 2-2-1 network.
    pub fn shape(&self) -> Vec<Vec<usize>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(Vec::len).collect())
            .collect()
    }

    pub fn same_shape(&self, other: &ParamMatrix) -> bool {
        self.layers.len() == other.layers.len()
            && self.layers.iter().zip(&other.layers).all(|(a, b)| {
                a.len() == b.len() && a.iter().zip(b).all(|(ra, rb)| ra.len() == rb.len())
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.layers.iter().flatten().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.layers.iter_mut().flatten().flatten()
    }

    pub fn fill(&mut self, value: f64) {
        self.iter_mut().for_each(|v| *v = value);
    }

    pub fn scale(&mut self, factor: f64) {
        self.iter_mut().for_each(|v| *v *= factor);
    }

    /// Overwrite with `other` without reallocating.
    ///
    /// Panics if the shapes differ.
    pub fn copy_from(&mut self, other: &ParamMatrix) {
        assert!(
            self.same_shape(other),
            "cannot copy a {:?} matrix into a {:?} matrix",
            other.shape(),
            self.shape()
        );
        for (dst, src) in self.iter_mut().zip(other.iter()) {
            *dst = *src;
        }
    }

    /// Overwrite with `other`, reallocating only when the shapes differ.
    pub fn assign(&mut self, other: &ParamMatrix) {
        if self.same_shape(other) {
            self.copy_from(other);
        } else {
            *self = other.clone();
        }
    }

    /// Sum of element-wise products. Panics if the shapes differ.
    pub fn dot(&self, other: &ParamMatrix) -> f64 {
        assert!(self.same_shape(other), "dot of differently shaped matrices");
        self.iter().zip(other.iter()).map(|(a, b)| a * b).sum()
    }

    /// Largest absolute entry (0.0 for an empty matrix).
    pub fn max_abs(&self) -> f64 {
        self.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

impl From<Vec<Vec<Vec<f64>>>> for ParamMatrix {
    fn from(layers: Vec<Vec<Vec<f64>>>) -> Self {
        Self { layers }
    }
}

impl Index<(usize, usize, usize)> for ParamMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, (layer, neuron, connection): (usize, usize, usize)) -> &f64 {
        &self.layers[layer][neuron][connection]
    }
}

impl IndexMut<(usize, usize, usize)> for ParamMatrix {
    #[inline]
    fn index_mut(&mut self, (layer, neuron, connection): (usize, usize, usize)) -> &mut f64 {
        &mut self.layers[layer][neuron][connection]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_follow_the_layer_map() {
        let m = ParamMatrix::zeros(&[2, 3, 1], true);
        assert_eq!(m.shape(), vec![vec![3, 3, 3], vec![4]]);
        assert_eq!(m.len(), 13);

        let unbiased = ParamMatrix::zeros(&[5, 4], false);
        assert_eq!(unbiased.shape(), vec![vec![5; 4]]);
        assert!(!unbiased.same_shape(&ParamMatrix::zeros(&[5, 4], true)));
    }

    #[test]
    fn arithmetic_helpers() {
        let mut a = ParamMatrix::zeros(&[1, 2], true);
        a.fill(2.0);
        let mut b = ParamMatrix::zeros_like(&a);
        b[(0, 1, 0)] = -3.0;
        assert_eq!(a.dot(&b), -6.0);
        assert_eq!(b.max_abs(), 3.0);

        a.scale(0.5);
        assert!(a.iter().all(|&v| v == 1.0));

        b.copy_from(&a);
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic]
    fn copy_from_rejects_other_shapes() {
        let mut a = ParamMatrix::zeros(&[2, 2], true);
        let b = ParamMatrix::zeros(&[2, 3], true);
        a.copy_from(&b);
    }
}
