//! Error taxonomy shared by the engine and its collaborators

use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Language name not present in the language table
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Forbidden(String),

    /// Execution service could not be reached or answered with an error
    #[error("Execution service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Execution service timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// Durable store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn problem_not_found(id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: "Problem",
            id: id.to_string(),
        }
    }

    pub fn submission_not_found(id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: "Submission",
            id: id.to_string(),
        }
    }

    /// Stable machine-readable kind, surfaced to callers next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnsupportedLanguage(_) => "UnsupportedLanguage",
            EngineError::NotFound { .. } => "NotFound",
            EngineError::Forbidden(_) => "Forbidden",
            EngineError::ServiceUnavailable(_) => "ServiceUnavailable",
            EngineError::Timeout(_) => "Timeout",
            EngineError::Validation(_) => "ValidationError",
            EngineError::Storage(_) => "StorageError",
        }
    }

    /// True for failures of the execution collaborator
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, EngineError::ServiceUnavailable(_) | EngineError::Timeout(_))
    }
}

impl From<redis::RedisError> for EngineError {
    fn from(err: redis::RedisError) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Storage(format!("serialization error: {}", err))
    }
}
