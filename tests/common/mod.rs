//! Fixtures shared by the integration tests.
//!
//! Images are written as PNG with their ground truth as JSON in a temporary
//! directory, the way a training set is laid out on disk.
//! For assertion helpers, use `visioner::testing`.

#![allow(dead_code)]

use std::path::PathBuf;

use image::{GrayImage, Luma};
use tempfile::TempDir;

#[allow(unused_imports)]
pub use visioner::assert_approx_eq;
#[allow(unused_imports)]
pub use visioner::testing::{assert_slice_approx_eq, synthetic_dataset, DEFAULT_TOLERANCE};

use visioner::config::Param;
use visioner::cv::{save_objects, Object, Rect};
use visioner::model::{FeatureFamily, Lut, Model};

pub const BACKGROUND: u8 = 20;
pub const FOREGROUND: u8 = 200;

/// Background image with an 8x8 object at `(x, y)` whose left half is bright.
pub fn half_bright_square(width: u32, height: u32, x: u32, y: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |px, py| {
        let inside = px >= x && px < x + 4 && py >= y && py < y + 8;
        Luma([if inside { FOREGROUND } else { BACKGROUND }])
    })
}

/// Image and ground truth files in a temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub images: Vec<PathBuf>,
    pub groundtruths: Vec<PathBuf>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            images: Vec::new(),
            groundtruths: Vec::new(),
        }
    }

    /// Write one image and its objects.
    pub fn add(&mut self, image: &GrayImage, objects: &[Object]) {
        let n = self.images.len();
        let image_path = self.dir.path().join(format!("{n:03}.png"));
        let gt_path = self.dir.path().join(format!("{n:03}.json"));
        image.save(&image_path).expect("write image");
        save_objects(&gt_path, objects).expect("write ground truth");
        self.images.push(image_path);
        self.groundtruths.push(gt_path);
    }

    pub fn pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.images
            .iter()
            .cloned()
            .zip(self.groundtruths.iter().cloned())
            .collect()
    }
}

/// 8x8 window, single pyramid level on images up to 24x16.
pub fn small_param(tagger: &str, labels: &[&str]) -> Param {
    Param::builder()
        .rows(8)
        .cols(8)
        .cx(4)
        .cy(4)
        .scale_factor(0.4)
        .labels(labels.iter().map(|l| l.to_string()).collect())
        .tagger(tagger)
        .build()
        .expect("valid param")
}

/// Model answering `values[o]` on output `o` everywhere.
pub fn constant_model(param: Param, values: &[f64]) -> Model {
    let mut model = Model::new(param, FeatureFamily::Lbp, values.len());
    let luts = values
        .iter()
        .map(|&v| vec![Lut::constant(0, model.n_fvalues(), v)])
        .collect();
    model.set_luts(luts).expect("valid luts");
    model
}

pub fn object(kind: &str, x: f64, y: f64) -> Object {
    Object::new(kind, Rect::new(x, y, 8.0, 8.0))
}
