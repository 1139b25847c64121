//! Error types for engine and database calls

/// Alias for Results returning [`EngineError`]
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure talking to, or preparing a call for, the external graph services
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request input rejected before reaching the engine
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Engine answered with a non-success status
    #[error("Engine API error: HTTP {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Query statement rejected by the database
    #[error("Query error: {0}")]
    Query(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Response decoded but did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl EngineError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = EngineError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Engine API error: HTTP 502 - bad gateway");
    }

    #[test]
    fn test_validation_helper() {
        let err = EngineError::validation("name must not be empty");
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("name must not be empty"));
        assert!(matches!(EngineError::config("x"), EngineError::Config(_)));
    }
}
