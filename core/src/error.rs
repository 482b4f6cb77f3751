//! Error types for the Workfront API client.
//!
//! # Design
//! One enum covers the whole core. Three groups matter to callers:
//! configuration (`MissingCredentials`), validation (`Validation`, raised
//! before any request leaves the client) and transport (everything the
//! service or the host's executor reports). Segmented and paginated
//! operations never catch these; the first error ends the operation.

use thiserror::Error;

/// Errors returned by the client, the session driver and the planners.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Neither a session id nor an API key is configured.
    #[error("no credential configured: set a session id or an API key")]
    MissingCredentials,

    /// Input rejected before any request was built.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// A 2xx response carried the service's error envelope.
    #[error("API error: {0}")]
    Remote(String),

    /// The host's executor failed before a response was produced.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// True for errors produced by the remote side or the executor, as
    /// opposed to errors caught while building the request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound
                | ApiError::HttpError { .. }
                | ApiError::Remote(_)
                | ApiError::Transport(_)
                | ApiError::DeserializationError(_)
        )
    }
}
