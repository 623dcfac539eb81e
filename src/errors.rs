use thiserror::Error;

// Errors raised while building descriptors, bindings or configuration.
// Evaluation itself never fails; broken inputs degrade to "hidden".
#[derive(Debug, Error)]
pub enum EngineError {
    // Priorities registered in code must be positive
    #[error("invalid priority {0}: requires an integer greater than 0")]
    InvalidPriority(i64),

    // The JSON-encoded required values of one dependent could not be used
    #[error("malformed required values for `{dependent}` (controller `{controller}`): {reason}")]
    MalformedRequiredValues { dependent: String, controller: String, reason: String },

    #[error("malformed dependency attributes: {0}")]
    MalformedDependency(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// Type alias for results that use `EngineError` as the error type
pub type Result<T> = std::result::Result<T, EngineError>;
