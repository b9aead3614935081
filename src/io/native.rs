//! Native binary storage format for visioner models.
//!
//! The format consists of a 32-byte header followed by a Postcard-encoded
//! payload, optionally compressed with zstd.
//!
//! # Format Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Header (32 bytes)                        │
//! ├────────────────────────────────────────────────────────────┤
//! │                    Payload (variable)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use visioner::io::{NativeCodec, PayloadKind};
//!
//! let codec = NativeCodec::compressed();
//! let bytes = codec.serialize(PayloadKind::LutModel, 10, 2, &vec![1u32, 2, 3]).unwrap();
//!
//! let (header, payload): (_, Vec<u32>) = codec.deserialize(&bytes).unwrap();
//! assert_eq!(header.n_features, 10);
//! assert_eq!(payload, vec![1, 2, 3]);
//! ```

use std::io::{Read, Write};

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a visioner model file.
pub const MAGIC: &[u8; 4] = b"VSNR";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

// ============================================================================
// Payload Kind
// ============================================================================

/// Payload type identifier stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadKind {
    /// Boosted LUT model.
    LutModel = 0,
}

impl PayloadKind {
    /// Convert from u8, returning None for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::LutModel),
            _ => None,
        }
    }
}

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield flags for format features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// Payload is compressed with zstd.
    pub const COMPRESSED: u16 = 1 << 0;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header for the native storage format.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("VSNR")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       1     Payload kind
/// 7       1     Reserved (padding)
/// 8       2     Flags (bitfield)
/// 10      2     Reserved
/// 12      4     Payload size (bytes)
/// 16      4     CRC32 checksum of payload
/// 20      4     Number of features in the pool
/// 24      4     Number of outputs
/// 28      4     Reserved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub kind: PayloadKind,
    pub flags: FormatFlags,
    /// Size of the stored (possibly compressed) payload in bytes.
    pub payload_size: u32,
    /// CRC32 checksum of the stored payload.
    pub checksum: u32,
    pub n_features: u32,
    pub n_outputs: u32,
}

impl FormatHeader {
    /// Create a new header with current version.
    pub fn new(kind: PayloadKind, n_features: u32, n_outputs: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            kind,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            n_features,
            n_outputs,
        }
    }

    /// Serialize header to 32 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.kind as u8;
        buf[8..10].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_features.to_le_bytes());
        buf[24..28].copy_from_slice(&self.n_outputs.to_le_bytes());

        buf
    }

    /// Parse header from 32 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let kind = PayloadKind::from_u8(buf[6])
            .ok_or(DeserializeError::CorruptPayload("invalid payload kind".into()))?;

        let le_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        Ok(Self {
            version_major,
            version_minor,
            kind,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: le_u32(12),
            checksum: le_u32(16),
            n_features: le_u32(20),
            n_outputs: le_u32(24),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("compression error: {0}")]
    Compression(std::io::Error),
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// Wrong magic bytes.
    #[error("not a visioner model file")]
    NotAModel,

    #[error("model requires format {major}.{minor} or later", major = .major, minor = .minor)]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("file truncated: expected {expected} bytes")]
    Truncated { expected: usize },

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),

    #[error("decompression error: {0}")]
    Decompression(std::io::Error),

    #[error("payload kind mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: PayloadKind,
        actual: PayloadKind,
    },
}

/// Compute CRC32 checksum of data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ============================================================================
// Native Codec
// ============================================================================

/// Codec for serializing/deserializing models in native format.
#[derive(Debug, Clone, Default)]
pub struct NativeCodec {
    /// zstd level, `None` for uncompressed payloads.
    compression_level: Option<i32>,
}

impl NativeCodec {
    /// Codec writing uncompressed payloads (`.vbin`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec writing zstd-compressed payloads (`.vbgz`).
    pub fn compressed() -> Self {
        Self {
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
        }
    }

    /// Set compression level (1-22).
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level.clamp(1, 22));
        self
    }

    /// Write header and payload to a writer.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        let stored = match self.compression_level {
            Some(level) => {
                header.flags.set(FormatFlags::COMPRESSED);
                zstd::encode_all(payload, level).map_err(SerializeError::Compression)?
            }
            None => payload.to_vec(),
        };

        header.payload_size = stored.len() as u32;
        header.checksum = compute_checksum(&stored);

        writer.write_all(&header.to_bytes())?;
        writer.write_all(&stored)?;
        Ok(())
    }

    /// Read header and payload from a reader.
    ///
    /// The checksum is verified on the stored bytes, then the payload is
    /// decompressed if the header says so.
    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let truncated = |expected: usize| {
            move |e: std::io::Error| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    DeserializeError::Truncated { expected }
                } else {
                    DeserializeError::Io(e)
                }
            }
        };

        let mut header_buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_buf).map_err(truncated(HEADER_SIZE))?;
        let header = FormatHeader::from_bytes(&header_buf)?;

        let mut payload = vec![0u8; header.payload_size as usize];
        reader
            .read_exact(&mut payload)
            .map_err(truncated(header.payload_size as usize))?;

        let actual = compute_checksum(&payload);
        if actual != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let payload = if header.flags.contains(FormatFlags::COMPRESSED) {
            zstd::decode_all(payload.as_slice()).map_err(DeserializeError::Decompression)?
        } else {
            payload
        };

        Ok((header, payload))
    }

    /// Serialize a payload to bytes with header.
    pub fn serialize<T: serde::Serialize>(
        &self,
        kind: PayloadKind,
        n_features: u32,
        n_outputs: u32,
        payload: &T,
    ) -> Result<Vec<u8>, SerializeError> {
        let payload_bytes = postcard::to_allocvec(payload)?;

        let mut header = FormatHeader::new(kind, n_features, n_outputs);
        let mut output = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
        self.write_to(&mut output, &mut header, &payload_bytes)?;
        Ok(output)
    }

    /// Deserialize a payload from bytes.
    pub fn deserialize<T: for<'de> serde::Deserialize<'de>>(
        &self,
        bytes: &[u8],
    ) -> Result<(FormatHeader, T), DeserializeError> {
        let (header, payload_bytes) = self.read_from(&mut std::io::Cursor::new(bytes))?;
        let payload = postcard::from_bytes(&payload_bytes)?;
        Ok((header, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FormatHeader {
            version_major: 1,
            version_minor: 2,
            kind: PayloadKind::LutModel,
            flags: FormatFlags::from_bits(FormatFlags::COMPRESSED),
            payload_size: 12345,
            checksum: 0xDEADBEEF,
            n_features: 5796,
            n_outputs: 3,
        };

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"VSNR");
        assert_eq!(FormatHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn header_wrong_magic() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BSTR");
        assert!(matches!(
            FormatHeader::from_bytes(&buf),
            Err(DeserializeError::NotAModel)
        ));
    }

    #[test]
    fn header_unsupported_version() {
        let mut header = FormatHeader::new(PayloadKind::LutModel, 10, 1);
        header.version_major = 99;
        assert!(matches!(
            FormatHeader::from_bytes(&header.to_bytes()),
            Err(DeserializeError::UnsupportedVersion { major: 99, .. })
        ));
    }

    #[test]
    fn codec_roundtrip_with_and_without_compression() {
        let payload = vec![0.25f64; 1000];
        for codec in [NativeCodec::new(), NativeCodec::compressed()] {
            let bytes = codec.serialize(PayloadKind::LutModel, 7, 2, &payload).unwrap();
            let (header, back): (_, Vec<f64>) = codec.deserialize(&bytes).unwrap();
            assert_eq!(header.n_features, 7);
            assert_eq!(header.n_outputs, 2);
            assert_eq!(back, payload);
        }
    }

    #[test]
    fn compressed_payload_is_smaller_and_flagged() {
        let payload = vec![1.0f64; 4096];
        let plain = NativeCodec::new().serialize(PayloadKind::LutModel, 1, 1, &payload).unwrap();
        let packed = NativeCodec::compressed()
            .serialize(PayloadKind::LutModel, 1, 1, &payload)
            .unwrap();
        assert!(packed.len() < plain.len());

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&packed[..HEADER_SIZE]);
        assert!(FormatHeader::from_bytes(&header)
            .unwrap()
            .flags
            .contains(FormatFlags::COMPRESSED));
    }

    #[test]
    fn codec_detects_corruption() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(PayloadKind::LutModel, 5, 2);
        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, b"some model data").unwrap();

        buffer[HEADER_SIZE + 5] ^= 0xFF;
        assert!(matches!(
            codec.read_from(&mut buffer.as_slice()),
            Err(DeserializeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn codec_detects_truncation() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(PayloadKind::LutModel, 5, 2);
        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, b"some model data").unwrap();
        buffer.truncate(HEADER_SIZE + 3);

        assert!(matches!(
            codec.read_from(&mut buffer.as_slice()),
            Err(DeserializeError::Truncated { expected: 15 })
        ));
    }
}
