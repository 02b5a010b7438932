//! Error types for Dagflow.
//!
//! All errors in Dagflow are represented by the `DagflowError` enum,
//! which provides specific variants for different error categories.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Dagflow operations.
///
/// Structural problems surface as [`DagflowError::Invalid`] before a run starts.
/// Everything raised by a node executor is recorded on that node's result and
/// only decides whether the run halts.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum DagflowError {
    /// Engine-level errors (startup, registry).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML, etc.).
    #[error("{0}")]
    Convert(String),

    /// Workflow definition errors.
    #[error("{0}")]
    Workflow(String),

    /// The graph failed structural validation.
    #[error("invalid workflow: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Node configuration or execution errors.
    #[error("{0}")]
    Node(String),

    /// Outbound HTTP errors.
    #[error("http error: {0}")]
    Http(String),

    /// Errors returned by an external collaborator (language model, retrieval).
    #[error("service error: {0}")]
    Service(String),

    /// A node or the whole run exceeded its deadline.
    #[error("{0}")]
    Timeout(String),

    /// Template variables that could not be resolved under the `fail` policy.
    #[error("{0}")]
    Template(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<DagflowError> for String {
    fn from(val: DagflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for DagflowError {
    fn from(error: std::io::Error) -> Self {
        DagflowError::IoError(error.to_string())
    }
}

impl From<DagflowError> for std::io::Error {
    fn from(val: DagflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for DagflowError {
    fn from(_: FromUtf8Error) -> Self {
        DagflowError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for DagflowError {
    fn from(error: serde_json::Error) -> Self {
        DagflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for DagflowError {
    fn from(error: toml::de::Error) -> Self {
        DagflowError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for DagflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        DagflowError::Node(format!("invalid node config: {}", error))
    }
}

impl From<regex::Error> for DagflowError {
    fn from(error: regex::Error) -> Self {
        DagflowError::Node(format!("invalid regex: {}", error))
    }
}

impl From<reqwest::Error> for DagflowError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            DagflowError::Timeout(format!("http request timed out: {}", error))
        } else {
            DagflowError::Http(error.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for DagflowError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        DagflowError::Timeout(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_joins_messages() {
        let err = DagflowError::Invalid(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "invalid workflow: a; b");
    }

    #[test]
    fn test_io_round_trip_keeps_message() {
        let io: std::io::Error = DagflowError::Node("boom".to_string()).into();
        assert_eq!(io.to_string(), "boom");
    }
}
