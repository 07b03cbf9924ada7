//! Error types for the encoders.

use recursive_core::{CoreError, Shape};
use recursive_nlp::NlpError;
use thiserror::Error;

/// Errors raised while building, running, training or persisting an encoder.
#[derive(Debug, Error)]
pub enum NetError {
    /// The parse did not form a usable tree, or shapes disagreed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The parser or tokenizer failed.
    #[error(transparent)]
    Nlp(#[from] NlpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embeddings or gradients were requested before any forward pass.
    #[error("No forward pass has been run")]
    NoForwardPass,

    /// A batch without a single word.
    #[error("Batch contains no words")]
    EmptyBatch,

    /// The error gradient handed to a backward pass has the wrong shape.
    #[error("Error gradient has shape {got}, expected {expected}")]
    GradientShape { expected: Shape, got: Shape },

    /// Parts of a model disagree about the embedding dimension.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A pretrained vector has the wrong length.
    #[error("Pretrained vector for '{word}' has {got} entries, expected {expected}")]
    PretrainedDimension {
        word: String,
        expected: usize,
        got: usize,
    },

    /// A configuration value is unusable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A parameter holds NaN or an infinity, which JSON cannot store.
    #[error("Parameter {path} is not finite")]
    NonFiniteParameter { path: String },
}
