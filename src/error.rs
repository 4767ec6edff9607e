//! Error types for the life insurance advisor

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Input Errors
    // =============================

    #[error("Invalid form field '{field}': {reason}")]
    InvalidForm { field: &'static str, reason: String },

    #[error("Invalid discount rate: {0}")]
    InvalidDiscountRate(f64),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // Agent Pipeline Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Agent exceeded {0} tool rounds without a final answer")]
    ToolLoopExceeded(u32),

    #[error("Agent response error: {0}")]
    Response(#[from] ResponseError),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdvisorError {
    pub fn invalid_form(field: &'static str, reason: impl Into<String>) -> Self {
        AdvisorError::InvalidForm {
            field,
            reason: reason.into(),
        }
    }
}

/// Why the agent's final answer could not be turned into a recommendation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseError {
    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
