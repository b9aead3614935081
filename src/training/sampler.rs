//! Training sample collection.
//!
//! Every sub-window of every pyramid is labelled by the tagger; the labelled
//! ones become samples whose feature values are the codes of every feature in
//! the model's current pool.
//!
//! Costs balance the sample types: with `k` types present and `c_t` samples
//! of type `t`, a sample of type `t` costs `n / (k · c_t)`, so every type
//! carries the same total cost and the mean cost is 1.

use std::path::PathBuf;

use super::TrainError;
use crate::cv::{load_objects, CvError, ImagePyramid, Tagger};
use crate::data::{DataSet, Matrix};
use crate::model::Model;
use crate::utils::ThreadLoop;

/// A labelled sub-window.
#[derive(Debug, Clone, Copy)]
struct Position {
    pyramid: usize,
    level: usize,
    x: usize,
    y: usize,
}

/// Label every sub-window of `pyramids` and compute its feature values.
///
/// # Errors
///
/// Fails if no sub-window could be labelled.
pub fn collect_samples(
    model: &Model,
    tagger: &Tagger,
    pyramids: &[ImagePyramid],
    threads: usize,
) -> Result<DataSet, TrainError> {
    let param = model.param();
    let n_outputs = tagger.n_outputs();

    let mut positions = Vec::new();
    let mut targets = Vec::new();
    let mut types = Vec::new();
    for (p, pyramid) in pyramids.iter().enumerate() {
        for sw in pyramid.sub_windows(param) {
            let (x, y) = (sw.x as usize, sw.y as usize);
            if let Some(tag) = tagger.check(&pyramid[sw.s], x, y) {
                positions.push(Position {
                    pyramid: p,
                    level: sw.s,
                    x,
                    y,
                });
                targets.extend_from_slice(&tag.targets);
                types.push(tag.kind);
            }
        }
    }

    let n_samples = positions.len();
    if n_samples == 0 {
        return Err(TrainError::NoSamples);
    }

    let costs = balanced_costs(&types, tagger.n_types());

    let n_features = model.n_features();
    let mut fvalues = Matrix::<u16>::new(n_features, n_samples);
    let pool = ThreadLoop::new(threads)?;
    pool.for_rows_mut(fvalues.as_mut_slice(), n_samples, |range, rows| {
        for (f, row) in range.zip(rows.chunks_exact_mut(n_samples)) {
            for (value, pos) in row.iter_mut().zip(&positions) {
                let scorer = model.preprocess(&pyramids[pos.pyramid][pos.level]);
                *value = scorer.fvalue(f, pos.x, pos.y);
            }
        }
    });

    log::info!("collected {} samples with {} features", n_samples, n_features);

    Ok(DataSet::new(
        Matrix::from_vec(targets, n_samples, n_outputs),
        costs,
        fvalues,
        model.n_fvalues(),
    )?)
}

/// Per-sample costs giving every present type the same total.
fn balanced_costs(types: &[usize], n_types: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_types.max(1)];
    for &t in types {
        if t >= counts.len() {
            counts.resize(t + 1, 0);
        }
        counts[t] += 1;
    }

    let present = counts.iter().filter(|&&c| c > 0).count();
    let n = types.len() as f64;
    types
        .iter()
        .map(|&t| n / (present as f64 * counts[t] as f64))
        .collect()
}

// =============================================================================
// Sampler
// =============================================================================

/// Training and validation images, re-sampled for every feature pool.
#[derive(Debug, Clone)]
pub struct Sampler {
    tagger: Tagger,
    train: Vec<ImagePyramid>,
    valid: Vec<ImagePyramid>,
}

impl Sampler {
    pub fn new(tagger: Tagger, train: Vec<ImagePyramid>, valid: Vec<ImagePyramid>) -> Self {
        Self {
            tagger,
            train,
            valid,
        }
    }

    /// Load `(image, ground truth)` pairs and build their pyramids for the
    /// model window of `model`.
    pub fn from_files(
        tagger: Tagger,
        model: &Model,
        train: &[(PathBuf, PathBuf)],
        valid: &[(PathBuf, PathBuf)],
    ) -> Result<Self, CvError> {
        let load = |files: &[(PathBuf, PathBuf)]| -> Result<Vec<ImagePyramid>, CvError> {
            files
                .iter()
                .map(|(image, gt)| {
                    let decoded = image::open(image)
                        .map_err(|source| CvError::Image {
                            path: image.clone(),
                            source,
                        })?
                        .to_luma8();
                    let objects = load_objects(gt)?;
                    Ok(ImagePyramid::build(&decoded, &objects, model.param()))
                })
                .collect()
        };

        Ok(Self::new(tagger, load(train)?, load(valid)?))
    }

    pub fn tagger(&self) -> &Tagger {
        &self.tagger
    }

    /// Training samples, and validation samples if any validation image was
    /// given.
    pub fn sample(&self, model: &Model, threads: usize) -> Result<(DataSet, Option<DataSet>), TrainError> {
        let train = collect_samples(model, &self.tagger, &self.train, threads)?;
        let valid = if self.valid.is_empty() {
            None
        } else {
            Some(collect_samples(model, &self.tagger, &self.valid, threads)?)
        };
        Ok((train, valid))
    }
}
