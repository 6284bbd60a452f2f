//! Error types for the vector store and engines

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("IO error on {path}: {source}")]
    IoPathError {
        path: String,
        source: std::io::Error,
    },

    #[error("Bad magic token: expected {expected:?}, got {actual:?}")]
    BadMagic { expected: [u8; 4], actual: [u8; 4] },

    #[error("Float width mismatch: store uses {stored}-byte floats, this build uses {native}-byte floats")]
    FloatWidthMismatch { stored: u8, native: u8 },

    #[error("Shape mismatch: store is {expected}, sample is {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Bits per pixel must be a multiple of 8, got {0}")]
    UnalignedBitsPerPixel(u16),

    #[error("Store file is {actual} bytes, header implies {expected}")]
    TruncatedStore { expected: u64, actual: u64 },

    #[error("A store needs at least 2 classes, got {0}")]
    TooFewClasses(usize),

    #[error("Class {0:?} has no samples")]
    EmptyClass(String),

    #[error("Class name {0:?} exceeds 255 bytes")]
    ClassNameTooLong(String),

    #[error("Offset arithmetic overflow while addressing the vector store")]
    OffsetOverflow,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl StoreError {
    /// Attach the offending path to a raw I/O error.
    pub fn io_at(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::IoPathError {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
