//! Error types for reqsweep
//!
//! Errors fall into three families:
//! - [`SpecError`]: the request family itself is malformed. Raised while building
//!   descriptors, before anything touches the network.
//! - [`TransportError`]: a single request failed on the wire. Captured on the
//!   descriptor and used to cancel the rest of the batch.
//! - [`StorageError`]: a single write failed. Reported, never escalated.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reqsweep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reqsweep
#[derive(Debug, Error)]
pub enum Error {
    /// The request specification is invalid
    #[error("invalid request specification: {0}")]
    Spec(#[from] SpecError),

    /// A request failed in transit
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response could not be persisted
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dispatch task panicked or was aborted by the runtime
    #[error("task failed: {0}")]
    Task(String),
}

/// Errors in the shape of a request family.
///
/// Every variant is detected at construction time; a value that passed
/// validation never produces one of these later.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    /// A field declared more than one dynamic axis
    #[error("{field}: only one dynamic key is allowed, {count} were given")]
    TooManyDynamicAxes {
        /// Axis the offending spec belongs to (e.g. "param")
        field: String,
        /// Number of dynamic keys supplied
        count: usize,
    },

    /// A dynamic key mapped to a scalar instead of a list
    #[error("{field}: dynamic value for '{key}' must be a list, e.g. {{\"{key}\": [1, 2, 3]}}")]
    DynamicValueMustBeSequence {
        /// Axis the offending spec belongs to
        field: String,
        /// Dynamic key holding a scalar
        key: String,
    },

    /// A static key mapped to a list
    #[error("{field}: static value for '{key}' must be a string or integer")]
    StaticValueMustBeScalar {
        /// Axis the offending spec belongs to
        field: String,
        /// Static key holding a list
        key: String,
    },

    /// A list was nested inside another list
    #[error("{field}: nested lists are not allowed (at '{key}')")]
    NestedSequence {
        /// Axis the offending spec belongs to
        field: String,
        /// Key or segment position holding the nested list
        key: String,
    },

    /// The template references a name that has no argument
    #[error("placeholder '{{{name}}}' in '{template}' has no matching argument")]
    UnresolvedPlaceholder {
        /// Placeholder name as written in the template
        name: String,
        /// The template being expanded
        template: String,
    },

    /// An axis was supplied with the wrong kind of value
    #[error("{axis}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Axis name (e.g. "header")
        axis: String,
        /// What the axis accepts
        expected: &'static str,
        /// What was supplied
        found: &'static str,
    },

    /// HTTP method outside GET/POST/PUT/DELETE
    #[error("unsupported method '{0}': only GET, POST, PUT and DELETE are accepted")]
    UnsupportedMethod(String),

    /// Rate limit with a non-positive rate or limit
    #[error("rate limit needs rate > 0 and limit > 0, got rate={rate}s limit={limit}")]
    InvalidRateLimit {
        /// Pacing delay in seconds
        rate: f64,
        /// Maximum concurrent units
        limit: usize,
    },

    /// Strict alignment found axes whose lengths cannot be paired
    #[error("axis lengths {lengths:?} differ; strict alignment only broadcasts length-1 axes")]
    MismatchedAxisLengths {
        /// Length of each aligned axis, in order
        lengths: Vec<usize>,
    },
}

/// Per-request transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not connect to the remote host
    #[error("connection to {url} failed: {reason}")]
    Connect {
        /// Requested URL
        url: String,
        /// Underlying cause
        reason: String,
    },

    /// The request did not complete in time
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// The response body could not be read or parsed
    #[error("unreadable response body from {url}: {reason}")]
    Body {
        /// Requested URL
        url: String,
        /// Underlying cause
        reason: String,
    },

    /// The resolved URL is not a valid absolute URL
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Anything else the transport reports
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Classify a reqwest error for the given URL.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Per-write storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying write failed
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// I/O cause
        #[source]
        source: std::io::Error,
    },

    /// The storage backend refused the destination
    #[error("refused to write {path}: {reason}")]
    Rejected {
        /// Destination path as requested
        path: String,
        /// Why it was refused
        reason: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_error_converts_into_top_level_error() {
        let err: Error = SpecError::UnsupportedMethod("PATCH".into()).into();
        assert!(matches!(err, Error::Spec(SpecError::UnsupportedMethod(_))));
        assert_eq!(
            err.to_string(),
            "invalid request specification: unsupported method 'PATCH': only GET, POST, PUT and DELETE are accepted"
        );
    }

    #[test]
    fn dynamic_value_message_shows_list_example() {
        let err = SpecError::DynamicValueMustBeSequence {
            field: "param".into(),
            key: "page".into(),
        };
        assert_eq!(
            err.to_string(),
            "param: dynamic value for 'page' must be a list, e.g. {\"page\": [1, 2, 3]}"
        );
    }

    #[test]
    fn unresolved_placeholder_message_keeps_braces() {
        let err = SpecError::UnresolvedPlaceholder {
            name: "id".into(),
            template: "http://h/{id}".into(),
        };
        assert_eq!(
            err.to_string(),
            "placeholder '{id}' in 'http://h/{id}' has no matching argument"
        );
    }

    #[test]
    fn storage_error_keeps_io_source() {
        let err = StorageError::Io {
            path: PathBuf::from("out/a.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("out/a.json"));
    }
}
