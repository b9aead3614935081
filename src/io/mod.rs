//! Model persistence.
//!
//! The storage format is chosen from the file extension:
//!
//! | extension | format                                      |
//! |-----------|---------------------------------------------|
//! | `.vbin`   | native binary ([`NativeCodec`])             |
//! | `.vbgz`   | native binary, zstd-compressed payload      |
//! | `.gz`     | JSON text, zstd-compressed                  |
//! | other     | JSON text                                   |
//!
//! Every format stores the same [`ModelData`]: the training parameters, the
//! feature family and pool step, and the LUTs. The feature pool itself is
//! rebuilt on load.

mod native;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use native::{
    compute_checksum, DeserializeError, FormatFlags, FormatHeader, NativeCodec, PayloadKind,
    SerializeError, HEADER_SIZE, MAGIC,
};

use crate::config::Param;
use crate::model::{FeatureFamily, Lut, Model, ModelError};

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while saving or loading a model.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: SerializeError,
    },

    #[error("{path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: DeserializeError,
    },

    #[error("{path}: invalid model: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

// =============================================================================
// Formats
// =============================================================================

/// Storage format of a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    CompressedJson,
    Binary,
    CompressedBinary,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("vbin") => Self::Binary,
            Some("vbgz") => Self::CompressedBinary,
            Some("gz") => Self::CompressedJson,
            _ => Self::Json,
        }
    }
}

/// Serialized form of a [`Model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    pub param: Param,
    pub family: FeatureFamily,
    pub step: usize,
    pub luts: Vec<Vec<Lut>>,
}

impl From<&Model> for ModelData {
    fn from(model: &Model) -> Self {
        Self {
            param: model.param().clone(),
            family: model.family(),
            step: model.step(),
            luts: model.luts().to_vec(),
        }
    }
}

impl ModelData {
    pub fn into_model(self) -> Result<Model, ModelError> {
        Model::from_parts(self.param, self.family, self.step, self.luts)
    }
}

// =============================================================================
// Save / load
// =============================================================================

/// Save `model` to `path` in the format implied by its extension.
pub fn save_model(model: &Model, path: &Path) -> Result<(), PersistError> {
    let data = ModelData::from(model);
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json_err = |source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    match ModelFormat::from_path(path) {
        ModelFormat::Json => serde_json::to_writer(&mut writer, &data).map_err(json_err)?,
        ModelFormat::CompressedJson => {
            let text = serde_json::to_vec(&data).map_err(json_err)?;
            let packed = zstd::encode_all(text.as_slice(), native::DEFAULT_COMPRESSION_LEVEL)
                .map_err(io_err)?;
            writer.write_all(&packed).map_err(io_err)?;
        }
        format @ (ModelFormat::Binary | ModelFormat::CompressedBinary) => {
            let codec = if format == ModelFormat::Binary {
                NativeCodec::new()
            } else {
                NativeCodec::compressed()
            };
            let bytes = codec
                .serialize(
                    PayloadKind::LutModel,
                    model.n_features() as u32,
                    model.n_outputs() as u32,
                    &data,
                )
                .map_err(|source| PersistError::Serialize {
                    path: path.to_path_buf(),
                    source,
                })?;
            writer.write_all(&bytes).map_err(io_err)?;
        }
    }

    writer.flush().map_err(io_err)?;
    log::debug!("saved model to {}", path.display());
    Ok(())
}

/// Load a model from `path` in the format implied by its extension.
pub fn load_model(path: &Path) -> Result<Model, PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json_err = |source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);

    let data: ModelData = match ModelFormat::from_path(path) {
        ModelFormat::Json => serde_json::from_reader(reader).map_err(json_err)?,
        ModelFormat::CompressedJson => {
            let text = zstd::decode_all(reader).map_err(io_err)?;
            serde_json::from_slice(&text).map_err(json_err)?
        }
        ModelFormat::Binary | ModelFormat::CompressedBinary => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).map_err(io_err)?;
            let deserialize_err = |source| PersistError::Deserialize {
                path: path.to_path_buf(),
                source,
            };
            let (header, data): (_, ModelData) =
                NativeCodec::new().deserialize(&bytes).map_err(deserialize_err)?;
            if header.kind != PayloadKind::LutModel {
                return Err(deserialize_err(DeserializeError::TypeMismatch {
                    expected: PayloadKind::LutModel,
                    actual: header.kind,
                }));
            }
            data
        }
    };

    let model = data.into_model().map_err(|source| PersistError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "loaded model from {}: {} outputs, {} features",
        path.display(),
        model.n_outputs(),
        model.n_features()
    );
    Ok(model)
}
