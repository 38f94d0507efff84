//! Error types shared across the tfbind crates.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a raw sequence into model input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    #[error("sequence is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum TfBindError {
    /// Invalid symbol or empty sequence.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A pretrained model was requested but is not loaded or reachable.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Tensor dimensions checked before inference.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    /// A named artifact (embedding, weights) does not exist on disk.
    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A required file exists but could not be read or decoded.
    #[error("data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("an operation is already running in this session")]
    SessionBusy,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

impl TfBindError {
    pub fn data_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn shape_mismatch(
        what: &'static str,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            what,
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, TfBindError>;
