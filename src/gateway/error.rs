//! Typed errors for gateway calls
//!
//! Lets the proxy layer distinguish failure modes without string matching
//! when shaping its own error responses.

use thiserror::Error;

/// Gateway operation errors with typed variants
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credential rejected by the gateway (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Quota exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400); caller error, not transient
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Gateway error: {0}")]
    ServiceError(String),

    /// Network connectivity issue (connection refused, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway answered 2xx but the body wasn't a usable completion
    #[error("Malformed gateway response: {0}")]
    Malformed(String),

    /// Other errors not fitting the above categories
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// Convert HTTP status code and error text into a typed variant
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 => GatewayError::Unauthorized(error_text),
            429 => GatewayError::RateLimited(error_text),
            400 => GatewayError::BadRequest(error_text),
            500..=599 => GatewayError::ServiceError(error_text),
            _ => GatewayError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into a typed variant
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            GatewayError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else {
            GatewayError::Other(e.into())
        }
    }
}
