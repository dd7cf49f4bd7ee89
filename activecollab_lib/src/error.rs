//! Error types for the ActiveCollab API client.

use thiserror::Error;

/// Base error type for ActiveCollab operations.
///
/// Every failure is surfaced to the caller as one of these kinds; nothing is
/// retried or recovered internally.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid client configuration or call arguments.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Endpoint not covered by this client. Raised before any network call.
    #[error("Not implemented")]
    NotImplemented,
}

impl Error {
    /// HTTP status attached to the failure, when one exists.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.http_status),
            Error::Decode(e) => Some(e.http_status),
            Error::NotImplemented => Some(501),
            Error::Config(_) | Error::Transport(_) => None,
        }
    }
}

/// Raised when the request never completes: DNS, connect or timeout failure.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

/// Raised when the API returns an error response.
#[derive(Error, Debug)]
#[error("{message} (HTTP {http_status})")]
pub struct ApiError {
    /// Server-supplied `message`, with `field_errors` appended when present.
    pub message: String,
    pub http_status: u16,
}

/// Raised when JSON was expected but the body held none.
#[derive(Error, Debug)]
#[error("invalid response (HTTP {http_status})")]
pub struct DecodeError {
    pub http_status: u16,
    pub raw_body: String,
}
