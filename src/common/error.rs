//! Error types for gh-rdm
//!
//! Errors fall into four families: transport (cannot reach or bind the
//! endpoint), protocol (malformed or unknown envelope), precondition (missing
//! argument) and capability (the host clipboard/open program failed). Each one
//! maps onto a response status so the server can report it to the caller.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::ipc::protocol::Status;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gh-rdm
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Server not running. Start it with 'gh-rdm server'")]
    ServerNotRunning,

    #[error("Failed to connect to server: {0}")]
    ConnectionFailed(#[source] io::Error),

    #[error("Server communication error: {0}")]
    ServerCommunication(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("server already running at {}", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("Failed to bind {}: {source}", .path.display())]
    BindFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Protocol Errors ===
    #[error("parse command: {0}")]
    MalformedEnvelope(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    // === Precondition Errors ===
    #[error("{0} requires an argument")]
    MissingArgument(&'static str),

    // === Capability Errors ===
    #[error("{op} failed: {message}")]
    Capability { op: &'static str, message: String },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // === Application Errors ===
    #[error("{message}")]
    CommandFailed { status: u16, message: String },

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a failure of a host capability with the operation name
    pub fn capability(op: &'static str, message: impl Into<String>) -> Self {
        Self::Capability {
            op,
            message: message.into(),
        }
    }

    /// Create a bind failure for the given endpoint
    pub fn bind_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::BindFailed {
            path: path.into(),
            source,
        }
    }

    /// Response status the server reports for this error
    pub fn status(&self) -> Status {
        match self {
            Error::MalformedEnvelope(_)
            | Error::UnknownCommand(_)
            | Error::MissingArgument(_) => Status::BadRequest,
            _ => Status::Internal,
        }
    }

    /// Whether the error means the endpoint could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::ServerNotRunning
                | Error::ConnectionFailed(_)
                | Error::ServerCommunication(_)
                | Error::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_are_client_errors() {
        assert_eq!(
            Error::UnknownCommand("paint".into()).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::MalformedEnvelope("eof".into()).status(),
            Status::BadRequest
        );
        assert_eq!(Error::MissingArgument("copy").status(), Status::BadRequest);
    }

    #[test]
    fn test_capability_error_names_operation() {
        let err = Error::capability("paste", "exit status: 1");
        assert_eq!(err.status(), Status::Internal);
        assert_eq!(err.to_string(), "paste failed: exit status: 1");
    }

    #[test]
    fn test_timeout_reports_subsecond_duration() {
        let err = Error::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "Operation timed out after 200ms");
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::ServerNotRunning.is_transport());
        assert!(Error::Timeout(Duration::from_secs(10)).is_transport());
        assert!(!Error::CommandFailed {
            status: 500,
            message: "copy failed".into()
        }
        .is_transport());
    }
}
