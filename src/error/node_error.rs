use thiserror::Error;

/// Node-level errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("State error: {0}")]
    StateError(String),
    #[error("Missing input: {0}")]
    MissingInput(String),
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}
