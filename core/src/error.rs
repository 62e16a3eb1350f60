//! Failure taxonomy for the request pipeline.
//!
//! # Design
//! Timeout and connection failure get dedicated variants because callers
//! branch on them (retry vs reconfigure); every other transport problem
//! lands in `Transport` with its detail text, and panics caught at the
//! dispatch boundary land in `Internal`. Each variant owns the status code
//! its outcome reports, and the `Display` strings are part of the caller
//! contract; hosts show them verbatim.

use thiserror::Error;

/// Errors surfaced through `ResponseOutcome::failure`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint selector is not one of the eight recognized values.
    #[error("Unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timeout")]
    Timeout,

    /// The server could not be reached at all.
    #[error("Connection error")]
    ConnectionFailed,

    /// The server answered, but the body was not valid JSON.
    #[error("Invalid JSON response")]
    MalformedResponse {
        /// Whatever text the server did send, kept for debugging.
        raw: String,
    },

    /// Any other transport-level failure.
    #[error("Request error: {0}")]
    Transport(String),

    /// A panic escaped the builder or transport pipeline.
    #[error("Error processing request: {0}")]
    Internal(String),
}

impl ClientError {
    /// The status code the outcome reports for this failure class.
    pub fn status(&self) -> u16 {
        match self {
            ClientError::UnsupportedEndpoint(_) => 400,
            ClientError::Timeout => 408,
            ClientError::ConnectionFailed => 503,
            ClientError::MalformedResponse { .. } => 502,
            ClientError::Transport(_) | ClientError::Internal(_) => 500,
        }
    }
}
