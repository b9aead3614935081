//! Multi-block binary pattern features.
//!
//! Every feature lays a 3×3 grid of equally sized cells inside the model
//! window and turns the nine cell sums into a discrete code. The cells are
//! numbered clockwise from the top-left corner, the center last:
//!
//! ```text
//! 0 1 2
//! 7 8 3
//! 6 5 4
//! ```
//!
//! | kind  | bit `i` set when                                   | entries |
//! |-------|----------------------------------------------------|---------|
//! | LBP   | `n_i ≥ center`                                     | 256     |
//! | mLBP  | `n_i ≥ mean` of all nine cells                     | 256     |
//! | tLBP  | `n_i ≥ n_{i+1}` (wrapping)                         | 256     |
//! | dLBP  | 2 bits per opposite pair `(i, i+4)`, see below     | 256     |
//! | MCT   | `n_i ≥ mean` for all nine cells                    | 512     |
//!
//! dLBP encodes, for each pair, whether both neighbours lie on the same side
//! of the center and whether the first one is at least as far from it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cv::IntegralImage;

/// Neighbour cells in code order, as `(column, row)` in the 3×3 grid.
const NEIGHBOURS: [(usize, usize); 8] = [
    (0, 0),
    (1, 0),
    (2, 0),
    (2, 1),
    (2, 2),
    (1, 2),
    (0, 2),
    (0, 1),
];

// =============================================================================
// Feature kinds and families
// =============================================================================

/// Code computed from the nine cell sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Lbp,
    MLbp,
    TLbp,
    DLbp,
    Mct,
}

impl FeatureKind {
    /// Number of distinct codes.
    pub fn n_entries(self) -> usize {
        match self {
            Self::Mct => 512,
            _ => 256,
        }
    }

    /// Code of a 3×3 block of cell sums, indexed as in [`NEIGHBOURS`] with the
    /// center at position 8.
    pub fn code(self, cells: &[u64; 9]) -> u16 {
        let center = cells[8];
        let total: u64 = cells.iter().sum();
        // n ≥ mean ⇔ 9 n ≥ total
        let above_mean = |n: u64| 9 * n >= total;

        let mut code = 0u16;
        match self {
            Self::Lbp => {
                for (i, &n) in cells[..8].iter().enumerate() {
                    code |= u16::from(n >= center) << i;
                }
            }
            Self::MLbp => {
                for (i, &n) in cells[..8].iter().enumerate() {
                    code |= u16::from(above_mean(n)) << i;
                }
            }
            Self::TLbp => {
                for i in 0..8 {
                    code |= u16::from(cells[i] >= cells[(i + 1) % 8]) << i;
                }
            }
            Self::DLbp => {
                let c = center as i64;
                for i in 0..4 {
                    let a = cells[i] as i64 - c;
                    let b = cells[i + 4] as i64 - c;
                    code |= u16::from((a >= 0) == (b >= 0)) << (2 * i);
                    code |= u16::from(a.abs() >= b.abs()) << (2 * i + 1);
                }
            }
            Self::Mct => {
                for (i, &n) in cells.iter().enumerate() {
                    code |= u16::from(above_mean(n)) << i;
                }
            }
        }
        code
    }
}

/// Named pool of feature kinds a model draws its features from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureFamily {
    /// Multi-block LBP.
    #[default]
    Lbp,
    /// LBP together with its modified, transitional and direction-coded variants.
    Elbp,
    /// Multi-block modified census transform.
    Mct,
}

impl FeatureFamily {
    pub const ALL: [FeatureFamily; 3] = [Self::Lbp, Self::Elbp, Self::Mct];

    pub fn name(self) -> &'static str {
        match self {
            Self::Lbp => "lbp",
            Self::Elbp => "elbp",
            Self::Mct => "mct",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Lbp => "multi-block local binary patterns",
            Self::Elbp => "multi-block LBP with modified, transitional and direction-coded variants",
            Self::Mct => "multi-block modified census transform",
        }
    }

    pub fn kinds(self) -> &'static [FeatureKind] {
        match self {
            Self::Lbp => &[FeatureKind::Lbp],
            Self::Elbp => &[
                FeatureKind::Lbp,
                FeatureKind::MLbp,
                FeatureKind::TLbp,
                FeatureKind::DLbp,
            ],
            Self::Mct => &[FeatureKind::Mct],
        }
    }

    /// Number of distinct codes shared by every feature of the family.
    pub fn n_entries(self) -> usize {
        self.kinds()[0].n_entries()
    }
}

// =============================================================================
// Feature
// =============================================================================

/// One feature: a code kind and a 3×3 cell grid in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    pub kind: FeatureKind,
    /// Top-left corner of the grid inside the window.
    pub x: usize,
    pub y: usize,
    /// Cell size.
    pub cw: usize,
    pub ch: usize,
}

impl Feature {
    /// Evaluate on the window whose top-left corner is `(wx, wy)`.
    #[inline]
    pub fn eval(&self, integral: &IntegralImage, wx: usize, wy: usize) -> u16 {
        let (x0, y0) = (wx + self.x, wy + self.y);
        let cell = |(i, j): (usize, usize)| integral.sum(x0 + i * self.cw, y0 + j * self.ch, self.cw, self.ch);

        let mut cells = [0u64; 9];
        for (k, &pos) in NEIGHBOURS.iter().enumerate() {
            cells[k] = cell(pos);
        }
        cells[8] = cell((1, 1));
        self.kind.code(&cells)
    }
}

// =============================================================================
// FeaturePool
// =============================================================================

/// Every feature of a family on a window, with grid positions and cell sizes
/// restricted to multiples of `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePool {
    family: FeatureFamily,
    step: usize,
    features: Vec<Feature>,
}

impl FeaturePool {
    pub fn new(family: FeatureFamily, rows: usize, cols: usize, step: usize) -> Self {
        let step = step.max(1);
        let mut features = Vec::new();

        for &kind in family.kinds() {
            for ch in (step..=rows / 3).step_by(step) {
                for cw in (step..=cols / 3).step_by(step) {
                    for y in (0..=rows - 3 * ch).step_by(step) {
                        for x in (0..=cols - 3 * cw).step_by(step) {
                            features.push(Feature { kind, x, y, cw, ch });
                        }
                    }
                }
            }
        }

        Self {
            family,
            step,
            features,
        }
    }

    /// Finest non-empty pool with a step of at most `max_step`.
    pub fn coarsest(family: FeatureFamily, rows: usize, cols: usize, max_step: usize) -> Self {
        let mut step = max_step.max(1);
        loop {
            let pool = Self::new(family, rows, cols, step);
            if !pool.is_empty() || step == 1 {
                return pool;
            }
            step /= 2;
        }
    }

    #[inline]
    pub fn family(&self) -> FeatureFamily {
        self.family
    }

    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[inline]
    pub fn get(&self, f: usize) -> Option<&Feature> {
        self.features.get(f)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Position of every feature, for remapping after a projection.
    pub fn index(&self) -> HashMap<Feature, usize> {
        self.features.iter().enumerate().map(|(i, f)| (*f, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use rstest::rstest;

    #[test]
    fn lbp_code_orders_neighbours_clockwise() {
        // only the top-right neighbour (position 2) is brighter than the center
        let cells = [1, 1, 9, 1, 1, 1, 1, 1, 5];
        assert_eq!(FeatureKind::Lbp.code(&cells), 1 << 2);
        // a flat block sets every bit
        assert_eq!(FeatureKind::Lbp.code(&[3; 9]), 0xFF);
        assert_eq!(FeatureKind::Mct.code(&[3; 9]), 0x1FF);
    }

    #[test]
    fn transitional_and_direction_codes() {
        let cells = [8, 7, 6, 5, 4, 3, 2, 1, 0];
        // decreasing ring: every n_i ≥ n_{i+1} except the wrap 1 → 8
        assert_eq!(FeatureKind::TLbp.code(&cells), 0x7F);
        // all above the center, and n_i further than n_{i+4}
        assert_eq!(FeatureKind::DLbp.code(&cells), 0xFF);
    }

    #[rstest]
    #[case(FeatureKind::Lbp)]
    #[case(FeatureKind::MLbp)]
    #[case(FeatureKind::TLbp)]
    #[case(FeatureKind::DLbp)]
    #[case(FeatureKind::Mct)]
    fn codes_stay_below_entry_count(#[case] kind: FeatureKind) {
        let mut seed = 17u64;
        for _ in 0..200 {
            let mut cells = [0u64; 9];
            for c in &mut cells {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                *c = (seed >> 40) % 1000;
            }
            assert!((kind.code(&cells) as usize) < kind.n_entries());
        }
    }

    #[test]
    fn pool_respects_window_and_step() {
        let pool = FeaturePool::new(FeatureFamily::Lbp, 6, 6, 1);
        // cells 1x1: 4x4 positions, 1x2/2x1: 4 each, 2x2: 1
        assert_eq!(pool.len(), 16 + 4 + 4 + 1);
        for f in pool.features() {
            assert!(f.x + 3 * f.cw <= 6 && f.y + 3 * f.ch <= 6);
        }

        let coarse = FeaturePool::new(FeatureFamily::Lbp, 6, 6, 2);
        assert_eq!(coarse.features(), &[Feature { kind: FeatureKind::Lbp, x: 0, y: 0, cw: 2, ch: 2 }]);

        let elbp = FeaturePool::new(FeatureFamily::Elbp, 6, 6, 1);
        assert_eq!(elbp.len(), 4 * pool.len());
    }

    #[test]
    fn coarsest_halves_step_until_non_empty() {
        let pool = FeaturePool::coarsest(FeatureFamily::Mct, 6, 6, 8);
        assert_eq!(pool.step(), 2);
        assert!(!pool.is_empty());
    }

    #[test]
    fn feature_eval_uses_cell_sums() {
        // bright pixel in the top-right cell of a 3x3 grid of 1x1 cells
        let mut image = GrayImage::from_pixel(5, 5, Luma([10]));
        image.put_pixel(3, 1, Luma([200]));
        let integral = IntegralImage::from_gray(&image);

        let feature = Feature {
            kind: FeatureKind::Lbp,
            x: 1,
            y: 1,
            cw: 1,
            ch: 1,
        };
        assert_eq!(feature.eval(&integral, 0, 0), 0xFF);

        let mct = Feature {
            kind: FeatureKind::Mct,
            ..feature
        };
        // only cell 2 is above the mean
        assert_eq!(mct.eval(&integral, 0, 0), 1 << 2);
    }
}
