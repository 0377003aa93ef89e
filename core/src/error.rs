//! Error types for the content API client.
//!
//! # Design
//! `ApiError` is the single error returned by client operations. Decode
//! failures keep the already-received `HttpResponse` inside the error so the
//! caller can still inspect the raw status. Cache and reference-URI failures
//! have their own enums because they surface independently: a `CacheError`
//! is usually non-fatal (see `CacheStatus::Skipped`), and `ReferenceError` is
//! returned directly by `parse_reference_uri`.

use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpResponse;

/// Boxed error produced by a `Transport` implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `ContentClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The server answered with an empty body.
    #[error("{status_text}")]
    EmptyBody {
        status_text: String,
        response: Box<HttpResponse>,
    },

    /// The body was not a valid `{ "data": [...] }` envelope.
    #[error("deserialization failed: {reason}")]
    Decode {
        reason: String,
        response: Box<HttpResponse>,
    },

    /// The outbound record could not be turned into form values.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A file-valued field pointed at a path that could not be read.
    #[error("failed to read file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl ApiError {
    /// The raw response carried by decode failures, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::EmptyBody { response, .. } | ApiError::Decode { response, .. } => {
                Some(&**response)
            }
            _ => None,
        }
    }
}

/// Reasons a response could not be stored in the `ResponseCache`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("missing 'Cache-Control' header")]
    MissingDirective,

    #[error("malformed 'Cache-Control' header: {0}")]
    MalformedDirective(String),

    #[error("malformed 'max-age' value {value:?}: {source}")]
    InvalidMaxAge {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Reasons a reference URI could not be resolved to a `Target`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("improperly formatted reference URI: {0}")]
    Malformed(String),

    #[error("reference URI missing 'type' value: {0}")]
    MissingType(String),

    #[error("reference URI missing 'id' value: {0}")]
    MissingId(String),

    #[error(transparent)]
    InvalidId(#[from] ParseIntError),
}
