//! Error types for the training engine
//!
//! Every failure in this crate is fail-fast: invalid parameters, shape
//! conflicts and bad files are detected at the point of violation and
//! propagated to the caller. There is no retry or recovery policy.

use crate::tensor::Shape;

/// Errors produced by tensors, layers, models and codecs.
#[derive(Debug, thiserror::Error)]
pub enum CnnError {
    /// A layer or tensor was constructed with invalid parameters
    /// (zero-sized dimension, kernel smaller than stride, probability
    /// outside [0, 1], non-finite hyperparameter).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Two tensors had incompatible shapes for the requested operation,
    /// including activating a layer on a wrongly-shaped input.
    #[error("shape mismatch in {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// A coordinate or sub-region fell outside a tensor's extent.
    #[error("region at {origin} with size {size} out of bounds for tensor {bounds}")]
    Bounds {
        origin: Shape,
        size: Shape,
        bounds: Shape,
    },

    /// A serialized tensor or dataset was written by an incompatible
    /// format version.
    #[error("unsupported format version: expected {expected}, found {found}")]
    Version { expected: i32, found: i32 },

    /// File not found, truncated, or otherwise unreadable.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON configuration file failed to parse.
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type CnnResult<T> = Result<T, CnnError>;
