//! Look-up-table weak learner.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// A weak learner mapping each discretized value of one feature to a response.
///
/// # Example
///
/// ```
/// use visioner::model::Lut;
///
/// let mut lut = Lut::new(3, 4);
/// lut[2] = -1.0;
/// assert_eq!(lut.feature(), 3);
/// assert_eq!(lut.eval(2), -1.0);
/// assert_eq!(lut.eval(0), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Lut {
    feature: usize,
    entries: Vec<f64>,
}

impl Lut {
    /// Zero LUT over `n_entries` values of `feature`.
    pub fn new(feature: usize, n_entries: usize) -> Self {
        Self {
            feature,
            entries: vec![0.0; n_entries],
        }
    }

    /// LUT returning `value` whatever the feature value.
    pub fn constant(feature: usize, n_entries: usize, value: f64) -> Self {
        Self {
            feature,
            entries: vec![value; n_entries],
        }
    }

    #[inline]
    pub fn feature(&self) -> usize {
        self.feature
    }

    #[inline]
    pub fn set_feature(&mut self, feature: usize) {
        self.feature = feature;
    }

    #[inline]
    pub fn n_entries(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn entries(&self) -> &[f64] {
        &self.entries
    }

    #[inline]
    pub fn entries_mut(&mut self) -> &mut [f64] {
        &mut self.entries
    }

    /// Response for the discretized feature value `u`.
    #[inline]
    pub fn eval(&self, u: u16) -> f64 {
        self.entries[u as usize]
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.entries.iter_mut().for_each(|e| *e *= factor);
    }

    /// Copy of this LUT with every entry multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut lut = self.clone();
        lut.scale(factor);
        lut
    }
}

impl Index<usize> for Lut {
    type Output = f64;

    #[inline]
    fn index(&self, u: usize) -> &f64 {
        &self.entries[u]
    }
}

impl IndexMut<usize> for Lut {
    #[inline]
    fn index_mut(&mut self, u: usize) -> &mut f64 {
        &mut self.entries[u]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_leaves_original() {
        let mut lut = Lut::new(0, 3);
        lut[0] = 1.0;
        lut[1] = -1.0;
        let half = lut.scaled(0.5);
        assert_eq!(half.entries(), &[0.5, -0.5, 0.0]);
        assert_eq!(lut.entries(), &[1.0, -1.0, 0.0]);
    }

    #[test]
    fn constant_lut() {
        let lut = Lut::constant(7, 4, 0.25);
        assert!(lut.entries().iter().all(|&e| e == 0.25));
        assert_eq!(lut.n_entries(), 4);
    }
}
