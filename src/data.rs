//! Training examples.
//!
//! A [`Dataset`] is an ordered list of `(input, desired)` pairs. Row lengths are not
//! checked on insertion: an example that does not fit the network is skipped by the
//! error computation. Call [`Dataset::validate_for`] to reject such data up front.

use crate::{Error, Result};

/// One supervised example.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Example {
    pub input: Vec<f64>,
    pub desired: Vec<f64>,
}

impl Example {
    pub fn new(input: Vec<f64>, desired: Vec<f64>) -> Self {
        Self { input, desired }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dataset {
    examples: Vec<Example>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from `(input, desired)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Vec<f64>, Vec<f64>)>,
    {
        Self {
            examples: pairs
                .into_iter()
                .map(|(input, desired)| Example::new(input, desired))
                .collect(),
        }
    }

    /// Build a dataset from parallel input and desired-output rows.
    ///
    /// Fails only when the two lists have different lengths.
    pub fn from_rows(inputs: &[Vec<f64>], desired: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != desired.len() {
            return Err(Error::data(format!(
                "inputs/desired length mismatch: {} vs {}",
                inputs.len(),
                desired.len()
            )));
        }

        Ok(Self::from_pairs(
            inputs.iter().cloned().zip(desired.iter().cloned()),
        ))
    }

    pub fn push(&mut self, input: Vec<f64>, desired: Vec<f64>) {
        self.examples.push(Example::new(input, desired));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.examples.iter()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Example> {
        self.examples.get(idx)
    }

    /// Check every example against a network shape.
    ///
    /// Reports the first example whose input does not match `layer_map[0]` or whose
    /// desired output does not match the last layer.
    pub fn validate_for(&self, layer_map: &[usize]) -> Result<()> {
        let (Some(&input_len), Some(&output_len)) = (layer_map.first(), layer_map.last()) else {
            return Err(Error::config("layer map must not be empty"));
        };

        for (i, ex) in self.examples.iter().enumerate() {
            if ex.input.len() != input_len {
                return Err(Error::data(format!(
                    "example {i} has input len {}, expected {input_len}",
                    ex.input.len()
                )));
            }
            if ex.desired.len() != output_len {
                return Err(Error::data(format!(
                    "example {i} has desired len {}, expected {output_len}",
                    ex.desired.len()
                )));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Example;
    type IntoIter = std::slice::Iter<'a, Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}

impl FromIterator<Example> for Dataset {
    fn from_iter<T: IntoIterator<Item = Example>>(iter: T) -> Self {
        Self {
            examples: iter.into_iter().collect(),
        }
    }
}
