//! Sub-window labelling.
//!
//! A [`Tagger`] decides what a sub-window should be trained to predict. The
//! object taggers turn the label vocabulary into one `±1` output per class;
//! the keypoint tagger regresses keypoint coordinates inside the window.
//!
//! Every labelled sub-window also gets a sample *type*, used to balance the
//! sample costs: type 0 is background and type `c + 1` is class `c` for the
//! object taggers, while the keypoint tagger has a single type.

use serde::{Deserialize, Serialize};

use super::{Object, PyramidScale, Rect};
use crate::config::Param;
use crate::training::Jesorsky;

/// Labelling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaggerKind {
    /// Class given by [`Object::kind`].
    ObjectType,
    /// Class given by [`Object::pose`].
    ObjectPose,
    /// Class given by [`Object::id`].
    ObjectId,
    /// Coordinates of the keypoints named in the labels.
    Keypoint,
}

impl TaggerKind {
    pub const ALL: [TaggerKind; 4] = [
        Self::ObjectType,
        Self::ObjectPose,
        Self::ObjectId,
        Self::Keypoint,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ObjectType => "object_type",
            Self::ObjectPose => "object_pose",
            Self::ObjectId => "object_id",
            Self::Keypoint => "keypoint",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ObjectType => "object classification by type",
            Self::ObjectPose => "object classification by pose",
            Self::ObjectId => "object classification by identity",
            Self::Keypoint => "keypoint regression, normalized by the window size",
        }
    }

    /// Whether the tagger produces class labels.
    pub fn is_classification(self) -> bool {
        !matches!(self, Self::Keypoint)
    }
}

/// Target vector and sample type of a labelled sub-window.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub targets: Vec<f64>,
    pub kind: usize,
}

/// A [`TaggerKind`] bound to the labels and window of a [`Param`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tagger {
    kind: TaggerKind,
    labels: Vec<String>,
    rows: usize,
    cols: usize,
    min_gt_overlap: f64,
}

impl Tagger {
    pub fn new(kind: TaggerKind, param: &Param) -> Self {
        Self {
            kind,
            labels: param.labels.clone(),
            rows: param.rows,
            cols: param.cols,
            min_gt_overlap: param.min_gt_overlap,
        }
    }

    #[inline]
    pub fn kind(&self) -> TaggerKind {
        self.kind
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Length of the target vectors.
    pub fn n_outputs(&self) -> usize {
        match self.kind {
            TaggerKind::Keypoint => 2 * self.labels.len(),
            _ => self.labels.len(),
        }
    }

    /// Number of sample types.
    pub fn n_types(&self) -> usize {
        match self.kind {
            TaggerKind::Keypoint => 1,
            _ => self.labels.len() + 1,
        }
    }

    /// Class index of a ground truth object.
    ///
    /// `None` for objects whose attribute is not in the vocabulary and for
    /// the keypoint tagger, which has no classes.
    pub fn find(&self, object: &Object) -> Option<usize> {
        let value = match self.kind {
            TaggerKind::ObjectType => &object.kind,
            TaggerKind::ObjectPose => &object.pose,
            TaggerKind::ObjectId => &object.id,
            TaggerKind::Keypoint => return None,
        };
        self.labels.iter().position(|l| l == value)
    }

    /// Label the model window at `(x, y)` of a pyramid level.
    ///
    /// Returns `None` for ambiguous windows that should not be used for
    /// training: partial overlaps, and for keypoints any window without a
    /// fully annotated object or whose eye keypoints coincide.
    pub fn check(&self, scale: &PyramidScale, x: usize, y: usize) -> Option<Tag> {
        let window = Rect::new(x as f64, y as f64, self.cols as f64, self.rows as f64);
        match self.kind {
            TaggerKind::Keypoint => self.check_keypoints(&scale.objects, &window),
            _ => self.check_class(&scale.objects, &window),
        }
    }

    fn check_class(&self, objects: &[Object], window: &Rect) -> Option<Tag> {
        let mut any_overlap = false;
        let mut best: Option<(usize, f64)> = None;
        for object in objects {
            let overlap = window.overlap(&object.bbx);
            any_overlap |= overlap > 0.0;

            let Some(class) = self.find(object) else {
                continue;
            };
            if overlap >= self.min_gt_overlap && best.map_or(true, |(_, o)| overlap > o) {
                best = Some((class, overlap));
            }
        }

        match best {
            Some((class, _)) => {
                let mut targets = vec![-1.0; self.labels.len()];
                targets[class] = 1.0;
                Some(Tag {
                    targets,
                    kind: class + 1,
                })
            }
            None if !any_overlap => Some(Tag {
                targets: vec![-1.0; self.labels.len()],
                kind: 0,
            }),
            None => None,
        }
    }

    fn check_keypoints(&self, objects: &[Object], window: &Rect) -> Option<Tag> {
        let object = objects
            .iter()
            .map(|object| (object, window.overlap(&object.bbx)))
            .filter(|(_, overlap)| *overlap >= self.min_gt_overlap)
            .fold(None, |best: Option<(&Object, f64)>, (object, overlap)| match best {
                Some((_, o)) if o >= overlap => best,
                _ => Some((object, overlap)),
            })
            .map(|(object, _)| object)?;

        let mut targets = Vec::with_capacity(self.n_outputs());
        for label in &self.labels {
            let keypoint = object.keypoint(label)?;
            targets.push((keypoint.x - window.x) / window.width);
            targets.push((keypoint.y - window.y) / window.height);
        }
        // coincident eyes cannot normalize the localization error
        if targets.len() >= 4 && Jesorsky::eye_dist(&targets) <= 0.0 {
            return None;
        }
        Some(Tag { targets, kind: 0 })
    }
}
