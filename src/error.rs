//! Error types for leak-enricher
//!
//! Almost nothing in the enrichment pipeline is fatal: fetch failures, parse
//! misses and cache read errors all degrade to "use what we already have".
//! The [`Error`] type exists so that the building blocks (fetcher, emitter,
//! configuration loading) can report *why* they failed, and so that the
//! retry loop can classify failures as transient or permanent.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for leak-enricher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for leak-enricher
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.max_wait")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP error (timeout, connect, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a status the fetcher does not accept
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Upstream answered 429 Too Many Requests
    #[error("rate limited by {url}")]
    RateLimited {
        /// Requested URL
        url: String,
    },

    /// Every retry attempt failed with a transient error
    #[error("giving up on {url} after {attempts} attempts")]
    RetriesExhausted {
        /// Requested URL
        url: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// A URL could not be built from the configured base URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// NFO document could not be written
    #[error("XML error: {0}")]
    Xml(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record has no usable id
    #[error("record has no id")]
    MissingId,

    /// Output file could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::RateLimited { .. } => Some(429),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}
