//! Error types for strm-mirror
//!
//! This module defines the error hierarchy used across the crate:
//! - Remote access errors (connect, list, open)
//! - Configuration and CLI errors
//! - Terminal action errors (pointer write, full copy)
//! - Per-file failure records collected during a run
//!
//! Library code uses thiserror; the binary wraps everything in anyhow.

use crate::classify::Action;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a mirror run
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Remote access errors (connect, listing)
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A file failed its terminal action
    #[error("{0}")]
    File(Box<FileFailure>),

    /// I/O errors outside of a terminal action
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The dispatch pool was closed while the walk was still running
    #[error("Dispatch pool closed unexpectedly")]
    PoolClosed,

    /// A background task could not be joined
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl From<FileFailure> for MirrorError {
    fn from(failure: FileFailure) -> Self {
        MirrorError::File(Box::new(failure))
    }
}

/// Errors reported by a remote filesystem backend
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    /// Base address could not be parsed
    #[error("Invalid remote address '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP client could not be built
    #[error("Failed to initialize remote client: {0}")]
    InitFailed(String),

    /// Server unreachable
    #[error("Failed to connect to '{url}': {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Credentials rejected
    #[error("Authentication failed for '{url}' (HTTP {status})")]
    AuthFailed { url: String, status: u16 },

    /// Directory listing failed
    #[error("Failed to list directory '{path}': {reason}")]
    ListFailed { path: String, reason: String },

    /// Read stream could not be opened
    #[error("Failed to open '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    /// Permission denied
    #[error("Permission denied: '{path}'")]
    PermissionDenied { path: String },

    /// Path not found
    #[error("Path not found: '{path}'")]
    NotFound { path: String },

    /// Malformed response body
    #[error("Malformed response for '{path}': {reason}")]
    Protocol { path: String, reason: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Both extension lists are empty
    #[error("No extensions configured: at least one pointer or copy extension is required")]
    NoExtensions,

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Invalid remote address
    #[error("Invalid remote address '{url}': {reason}")]
    InvalidAddress { url: String, reason: String },

    /// Local root unusable
    #[error("Invalid local directory '{path}': {reason}")]
    InvalidLocalRoot { path: PathBuf, reason: String },
}

/// Failure of a single terminal action
#[derive(Error, Debug)]
pub enum ActionError {
    /// Remote stream could not be opened
    #[error(transparent)]
    Open(#[from] RemoteError),

    /// Local directory could not be created
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Local file could not be created
    #[error("Failed to create file '{path}': {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing the local file failed
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Remote stream broke off mid-transfer
    #[error("Transfer interrupted after {copied} bytes into '{path}': {source}")]
    Interrupted {
        path: PathBuf,
        copied: u64,
        source: std::io::Error,
    },

    /// Worker task panicked
    #[error("Worker panicked: {0}")]
    Panicked(String),
}

/// A recorded failure for one discovered file
#[derive(Error, Debug)]
#[error("Failed to {} '{path}': {error}", .action.verb())]
pub struct FileFailure {
    /// Full remote path of the file
    pub path: String,

    /// Action that was attempted
    pub action: Action,

    /// What went wrong
    pub error: ActionError,
}

/// Result type alias for MirrorError
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for RemoteError
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_into_mirror_error() {
        let auth = RemoteError::AuthFailed {
            url: "http://host/dav".into(),
            status: 401,
        };
        let err: MirrorError = auth.into();
        assert!(matches!(err, MirrorError::Remote(RemoteError::AuthFailed { status: 401, .. })));
        assert!(err.to_string().contains("HTTP 401"));
    }

    #[test]
    fn test_file_failure_message() {
        let failure = FileFailure {
            path: "/movies/Foo.nfo".into(),
            action: Action::FullCopy,
            error: ActionError::Open(RemoteError::NotFound {
                path: "/movies/Foo.nfo".into(),
            }),
        };
        let msg = failure.to_string();
        assert!(msg.contains("copy"));
        assert!(msg.contains("/movies/Foo.nfo"));

        let err: MirrorError = failure.into();
        assert!(matches!(err, MirrorError::File(_)));
    }
}
