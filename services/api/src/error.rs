//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors_convert_into_api_error() {
        let config = ApiError::from(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        assert!(matches!(config, ApiError::Config(_)));
        assert!(config.to_string().starts_with("Configuration error:"));

        let io = ApiError::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken"));
        assert!(matches!(io, ApiError::Io(_)));
    }
}
