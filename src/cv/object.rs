//! Ground truth objects.
//!
//! Ground truth files are JSON arrays of objects:
//!
//! ```json
//! [
//!   {
//!     "type": "face",
//!     "pose": "frontal",
//!     "id": "subject01",
//!     "bbx": { "x": 10.0, "y": 12.0, "width": 40.0, "height": 48.0 },
//!     "keypoints": [ { "id": "leye", "x": 22.0, "y": 28.0 } ]
//!   }
//! ]
//! ```
//!
//! `pose`, `id` and `keypoints` may be omitted.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CvError, Rect};

/// Named point of interest (eye center, nose tip, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Annotated object in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pose: String,
    #[serde(default)]
    pub id: String,
    pub bbx: Rect,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
}

impl Object {
    pub fn new(kind: impl Into<String>, bbx: Rect) -> Self {
        Self {
            kind: kind.into(),
            pose: String::new(),
            id: String::new(),
            bbx,
            keypoints: Vec::new(),
        }
    }

    pub fn with_pose(mut self, pose: impl Into<String>) -> Self {
        self.pose = pose.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_keypoint(mut self, id: impl Into<String>, x: f64, y: f64) -> Self {
        self.keypoints.push(Keypoint {
            id: id.into(),
            x,
            y,
        });
        self
    }

    /// Keypoint with the given name.
    pub fn keypoint(&self, id: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.id == id)
    }

    /// Object with its box and keypoints multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            kind: self.kind.clone(),
            pose: self.pose.clone(),
            id: self.id.clone(),
            bbx: self.bbx.scaled(factor),
            keypoints: self
                .keypoints
                .iter()
                .map(|k| Keypoint {
                    id: k.id.clone(),
                    x: k.x * factor,
                    y: k.y * factor,
                })
                .collect(),
        }
    }
}

/// Load the ground truth objects of one image.
pub fn load_objects(path: &Path) -> Result<Vec<Object>, CvError> {
    let file = File::open(path).map_err(|source| CvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CvError::GroundTruth {
        path: path.to_path_buf(),
        source,
    })
}

/// Save the ground truth objects of one image.
pub fn save_objects(path: &Path, objects: &[Object]) -> Result<(), CvError> {
    let file = File::create(path).map_err(|source| CvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), objects).map_err(|source| {
        CvError::GroundTruth {
            path: path.to_path_buf(),
            source,
        }
    })
}
