//! Error handling for the interview agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index unavailable ({asset}): {reason}")]
    IndexUnavailable { asset: String, reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Could not parse oracle decision: {reason}")]
    DecisionParse { reason: String, raw: String },

    #[error("Interview session is closed; no further turns are accepted")]
    SessionClosed,

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

pub type Result<T> = std::result::Result<T, InterviewError>;

impl InterviewError {
    pub fn index_unavailable(asset: impl Into<String>, reason: impl ToString) -> Self {
        InterviewError::IndexUnavailable {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    /// Raw oracle text attached to a parse failure, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            InterviewError::DecisionParse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Whether repeating the same turn may succeed without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InterviewError::DecisionParse { .. } | InterviewError::Oracle(_)
        )
    }
}

/// Convert anyhow errors (model2vec loading) to our custom error type
impl From<anyhow::Error> for InterviewError {
    fn from(err: anyhow::Error) -> Self {
        InterviewError::ModelError(err.to_string())
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for InterviewError {
    fn from(err: candle_core::Error) -> Self {
        InterviewError::ModelError(err.to_string())
    }
}

impl From<reqwest::Error> for InterviewError {
    fn from(err: reqwest::Error) -> Self {
        InterviewError::Oracle(err.to_string())
    }
}
