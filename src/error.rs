//! Closed error taxonomy shared across the pipeline.

use thiserror::Error;

/// Every failure the pipeline can surface to a consumer.
///
/// Pagination and decoding failures terminate the stream (`Error` is the
/// `Item` of the fallible stream); per-entry follow failures are instead
/// recorded as strings on the emitted entry (see [`crate::follow`]) and never
/// reach this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A URL string was rejected before any I/O was attempted.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A transport-level failure (connect/read/write timeout, reset, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// The JSON envelope or an HTML document failed to parse.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The HTTP call succeeded but the response did not match the expected
    /// `{total, offset, limit, data}` envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A document referenced by an entry could not be produced.
    #[error("document not found")]
    DocumentNotFound,

    /// A user-supplied `map`/`filter` closure returned an error, or an
    /// operator was given a structurally invalid argument (`limit(0)`,
    /// negative `skip`, `slice(a, a)`).
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_url(input: impl Into<String>) -> Self {
        Error::InvalidUrl(input.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::OperationFailed(message.into())
    }
}
