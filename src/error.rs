use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the question answering pipeline and its surfaces.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The requested model variant is not in the registry.
    #[error("Unknown model variant '{name}', expected one of: {known}")]
    UnknownModelVariant { name: String, known: String },

    /// The batch handed to the pipeline violates its contract.
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Model loading or forward pass failure.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The engine answered the batch but skipped this question.
    #[error("Engine returned no prediction for question id '{0}'")]
    MissingPrediction(String),

    /// Dataset file could not be understood.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The operation is not available on the active engine.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_batch(msg: impl Into<String>) -> Self {
        Self::InvalidBatch(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
