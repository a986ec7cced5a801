use std::path::PathBuf;
use thiserror::Error;

use crate::split::Bucket;
use crate::validation::ValidationReport;

/// The main error type for boxmark operations.
#[derive(Debug, Error)]
pub enum BoxmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Image {image} is not inside the project root {root}")]
    ImageOutsideProject { image: PathBuf, root: PathBuf },

    #[error("Failed to read image {path}: {message}")]
    ImageRead { path: PathBuf, message: String },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("Invalid class name: {0}")]
    InvalidClassName(String),

    #[error("Class name '{0}' already exists")]
    DuplicateClassName(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Bounding box is degenerate after clamping ({width}x{height})")]
    DegenerateBox { width: f64, height: f64 },

    #[error("Invalid split ratios: {message}")]
    InvalidSplitRatios { message: String },

    #[error("An export is already running")]
    ExportInProgress,

    #[error("Export of bucket '{bucket}' failed: {message}")]
    BucketFailed { bucket: Bucket, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
