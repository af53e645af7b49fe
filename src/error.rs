//! Error types for the listings aggregation layer

use thiserror::Error;

/// Errors that can occur when calling the upstream provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error (non-2xx or error status block)
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors returned by the query pipeline
///
/// Every variant maps onto one numeric code carried in the response envelope.
/// Upstream details stay in the logs; `public_message` is what callers see.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A query parameter was malformed or out of range
    #[error("Invalid value for '{param}': {message}")]
    Validation { param: String, message: String },

    /// Symbol lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream listings or quotes call failed
    #[error("External API error: {0}")]
    ExternalApi(#[from] ProviderError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Creates a Validation error
    pub fn validation(param: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// Creates a Validation error for an enum parameter, naming the allowed set
    pub fn not_one_of(param: &str, value: &str, allowed: &[&str]) -> Self {
        Self::validation(
            param,
            format!("'{}' is not one of [{}]", value, allowed.join(", ")),
        )
    }

    /// Creates a NotFound error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Numeric code for the response envelope (HTTP status class)
    pub fn error_code(&self) -> u16 {
        match self {
            QueryError::Validation { .. } => 400,
            QueryError::NotFound(_) => 404,
            QueryError::ExternalApi(_) => 500,
            QueryError::Internal(_) => 500,
        }
    }

    /// Message safe to return to the caller
    pub fn public_message(&self) -> String {
        match self {
            QueryError::Validation { .. } | QueryError::NotFound(_) => self.to_string(),
            QueryError::ExternalApi(_) => "Failed to fetch data from upstream provider".to_string(),
            QueryError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Errors raised while constructing configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable missing or blank
    #[error("Missing required environment variable {0}")]
    MissingVar(String),

    /// Variable present but unusable
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
