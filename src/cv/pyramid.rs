//! Multi-scale image pyramid.
//!
//! The detector scans a fixed-size model window (`Param::rows × Param::cols`)
//! over every level of an [`ImagePyramid`]. Level 0 is the original image;
//! each following level is smaller by `Param::scale_factor`, until the model
//! window no longer fits. Every level keeps its integral image so the feature
//! families can sum rectangular cells in constant time, plus the ground truth
//! objects scaled to that level.

use std::ops::Index;

use image::imageops::{self, FilterType};
use image::GrayImage;

use super::{Object, Rect};
use crate::config::Param;

// =============================================================================
// IntegralImage
// =============================================================================

/// Summed-area table of a grayscale image.
///
/// Stored with one extra leading row and column of zeros, so the sum over any
/// rectangle is four lookups without bounds special-casing.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    data: Vec<u64>,
}

impl IntegralImage {
    pub fn from_gray(image: &GrayImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let stride = width + 1;
        let mut data = vec![0u64; stride * (height + 1)];

        for y in 0..height {
            let mut row_sum = 0u64;
            for x in 0..width {
                row_sum += u64::from(image.get_pixel(x as u32, y as u32)[0]);
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row_sum;
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sum of the pixels in `[x, x + w) × [y, y + h)`.
    ///
    /// The rectangle must lie inside the image.
    #[inline]
    pub fn sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let stride = self.width + 1;
        let a = self.data[y * stride + x];
        let b = self.data[y * stride + x + w];
        let c = self.data[(y + h) * stride + x];
        let d = self.data[(y + h) * stride + x + w];
        d + a - b - c
    }
}

// =============================================================================
// PyramidScale
// =============================================================================

/// One level of an image pyramid.
#[derive(Debug, Clone)]
pub struct PyramidScale {
    /// Size of this level relative to the original image.
    pub scale: f64,
    pub image: GrayImage,
    pub integral: IntegralImage,
    /// Ground truth scaled to this level.
    pub objects: Vec<Object>,
}

impl PyramidScale {
    pub fn new(scale: f64, image: GrayImage, objects: &[Object]) -> Self {
        let integral = IntegralImage::from_gray(&image);
        Self {
            scale,
            image,
            integral,
            objects: objects.iter().map(|o| o.scaled(scale)).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.integral.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.integral.height()
    }

    /// Whether a `rows × cols` window at `(x, y)` lies inside this level.
    pub fn fits(&self, x: i64, y: i64, rows: usize, cols: usize) -> bool {
        x >= 0
            && y >= 0
            && x as usize + cols <= self.width()
            && y as usize + rows <= self.height()
    }
}

// =============================================================================
// SubWindow
// =============================================================================

/// Position of the model window inside a pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubWindow {
    /// Pyramid level.
    pub s: usize,
    /// Top-left corner at that level; may be negative when mapped from a
    /// region partly outside the image.
    pub x: i64,
    pub y: i64,
}

impl SubWindow {
    pub const fn new(s: usize, x: i64, y: i64) -> Self {
        Self { s, x, y }
    }
}

// =============================================================================
// ImagePyramid
// =============================================================================

/// Scale pyramid of one image with its ground truth.
#[derive(Debug, Clone, Default)]
pub struct ImagePyramid {
    scales: Vec<PyramidScale>,
}

impl ImagePyramid {
    /// Build the pyramid of `image` for the model window of `param`.
    ///
    /// Levels are added while the model window fits. An image smaller than
    /// the window yields an empty pyramid.
    pub fn build(image: &GrayImage, objects: &[Object], param: &Param) -> Self {
        let (width, height) = (f64::from(image.width()), f64::from(image.height()));
        let mut scales = Vec::new();
        let mut scale = 1.0;

        loop {
            let w = (width * scale).round() as u32;
            let h = (height * scale).round() as u32;
            if (w as usize) < param.cols || (h as usize) < param.rows {
                break;
            }

            let level = if scales.is_empty() {
                image.clone()
            } else {
                imageops::resize(image, w, h, FilterType::Triangle)
            };
            scales.push(PyramidScale::new(scale, level, objects));
            scale *= param.scale_factor;
        }

        log::debug!(
            "built {} pyramid levels for a {}x{} image",
            scales.len(),
            image.width(),
            image.height()
        );
        Self { scales }
    }

    /// Wrap already scaled levels.
    pub fn from_scales(scales: Vec<PyramidScale>) -> Self {
        Self { scales }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    pub fn scales(&self) -> &[PyramidScale] {
        &self.scales
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PyramidScale> {
        self.scales.iter()
    }

    /// Sub-window whose model window best covers `region`.
    ///
    /// Picks the level where the scaled region size is closest to the model
    /// window (first level on ties). The result is not checked against the
    /// level bounds; see [`check`](Self::check).
    pub fn map(&self, region: &Rect, param: &Param) -> SubWindow {
        let (rows, cols) = (param.rows as f64, param.cols as f64);

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (s, level) in self.scales.iter().enumerate() {
            let dist = (region.width * level.scale - cols).abs()
                + (region.height * level.scale - rows).abs();
            if dist < best_dist {
                best_dist = dist;
                best = s;
            }
        }

        let scale = self.scales.get(best).map_or(1.0, |level| level.scale);
        SubWindow::new(
            best,
            (region.x * scale).round() as i64,
            (region.y * scale).round() as i64,
        )
    }

    /// Whether the model window at `sw` lies inside the pyramid.
    pub fn check(&self, sw: &SubWindow, param: &Param) -> bool {
        self.scales
            .get(sw.s)
            .is_some_and(|level| level.fits(sw.x, sw.y, param.rows, param.cols))
    }

    /// Region of the original image covered by the model window at `sw`.
    pub fn to_region(&self, sw: &SubWindow, param: &Param) -> Rect {
        let scale = self.scales.get(sw.s).map_or(1.0, |level| level.scale);
        Rect::new(
            sw.x as f64 / scale,
            sw.y as f64 / scale,
            param.cols as f64 / scale,
            param.rows as f64 / scale,
        )
    }

    /// Every in-bounds sub-window, level by level, row by row, with strides
    /// `cx` and `cy`.
    pub fn sub_windows<'a>(&'a self, param: &'a Param) -> impl Iterator<Item = SubWindow> + 'a {
        self.scales.iter().enumerate().flat_map(move |(s, level)| {
            let max_y = level.height().saturating_sub(param.rows);
            let max_x = level.width().saturating_sub(param.cols);
            (0..=max_y).step_by(param.cy).flat_map(move |y| {
                (0..=max_x)
                    .step_by(param.cx)
                    .map(move |x| SubWindow::new(s, x as i64, y as i64))
            })
        })
    }
}

impl Index<usize> for ImagePyramid {
    type Output = PyramidScale;

    fn index(&self, s: usize) -> &PyramidScale {
        &self.scales[s]
    }
}

impl<'a> IntoIterator for &'a ImagePyramid {
    type Item = &'a PyramidScale;
    type IntoIter = std::slice::Iter<'a, PyramidScale>;

    fn into_iter(self) -> Self::IntoIter {
        self.scales.iter()
    }
}
