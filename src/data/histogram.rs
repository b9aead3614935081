//! Fixed-range histogram.
//!
//! Used to accumulate distributions of normalized localization errors.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Histogram of `n_bins` equal-width bins over `[min, max]`.
///
/// Values outside the range are clamped into the first or last bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    min: f64,
    max: f64,
    delta: f64,
    bins: Vec<f64>,
}

impl Histogram {
    /// Create an empty histogram.
    ///
    /// # Panics
    ///
    /// Panics if `n_bins == 0` or `max <= min`.
    pub fn new(n_bins: usize, min: f64, max: f64) -> Self {
        assert!(n_bins > 0, "n_bins must be positive");
        assert!(max > min, "histogram range must be non-empty");
        Self {
            min,
            max,
            delta: (max - min) / n_bins as f64,
            bins: vec![0.0; n_bins],
        }
    }

    /// Number of bins.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Lower bound of the range.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound of the range.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Bin width.
    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Bin contents.
    #[inline]
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Center of bin `i`.
    #[inline]
    pub fn bin_center(&self, i: usize) -> f64 {
        self.min + (i as f64 + 0.5) * self.delta
    }

    /// Bin index a value falls into (clamped).
    pub fn bin_index(&self, value: f64) -> usize {
        let pos = ((value - self.min) / self.delta).floor();
        if pos.is_nan() || pos < 0.0 {
            0
        } else {
            (pos as usize).min(self.bins.len() - 1)
        }
    }

    /// Add one observation.
    pub fn add(&mut self, value: f64) {
        let i = self.bin_index(value);
        self.bins[i] += 1.0;
    }

    /// Add every observation of an iterator.
    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for v in values {
            self.add(v);
        }
    }

    /// Total mass.
    pub fn sum(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Scale bins to sum to one (no-op on an empty histogram).
    pub fn norm(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            let inv = 1.0 / sum;
            self.bins.iter_mut().for_each(|b| *b *= inv);
        }
    }

    /// Replace every bin by the running sum up to and including it.
    pub fn cumulate(&mut self) {
        let mut acc = 0.0;
        for b in &mut self.bins {
            acc += *b;
            *b = acc;
        }
    }

    /// Reset every bin to zero.
    pub fn clear(&mut self) {
        self.bins.fill(0.0);
    }

    /// Write `center value` lines, one per bin.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for (i, value) in self.bins.iter().enumerate() {
            writeln!(writer, "{:.6} {:.6}", self.bin_center(i), value)?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_clamps_out_of_range() {
        let mut h = Histogram::new(4, 0.0, 1.0);
        h.add(-3.0);
        h.add(0.3);
        h.add(0.99);
        h.add(7.0);
        assert_eq!(h.bins(), &[1.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn norm_then_cumulate() {
        let mut h = Histogram::new(2, 0.0, 2.0);
        h.extend([0.5, 1.5, 1.5, 1.7]);
        h.norm();
        assert_eq!(h.bins(), &[0.25, 0.75]);
        h.cumulate();
        assert_eq!(h.bins(), &[0.25, 1.0]);
    }

    #[test]
    fn norm_of_empty_histogram_is_noop() {
        let mut h = Histogram::new(3, 0.0, 1.0);
        h.norm();
        assert_eq!(h.sum(), 0.0);
    }

    #[test]
    fn save_writes_one_line_per_bin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.histo");
        let mut h = Histogram::new(5, 0.0, 0.5);
        h.add(0.12);
        h.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "0.150000 1.000000");
    }
}
