//! Error types for Roomzin operations.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Classification of an error for caller-side handling.
///
/// Every [`RoomzinError`] falls into exactly one bucket; the dispatcher
/// recovers locally on `Retry` within its retry budget, everything else
/// surfaces to the caller as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// SDK misuse: bad configuration, missing or rejected credentials.
    Client,
    /// The server rejected this particular request (validation, not-found,
    /// overflow, forbidden).
    Request,
    /// Transient cluster state; repeating the operation may succeed.
    Retry,
    /// Protocol violations, parse failures, unknown server codes.
    Internal,
}

/// The main error type for Roomzin operations.
#[derive(Debug, Error, Clone)]
pub enum RoomzinError {
    /// Configuration errors (missing seed hosts, ports, token).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server rejected the login handshake.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Local request validation failed before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    /// An empty payload was handed to the dispatcher.
    #[error("payload must not be empty")]
    EmptyPayload,

    /// No leader is currently known to the cluster handler.
    #[error("cluster has no leader")]
    NoLeader,

    /// No follower connection is currently usable.
    #[error("no follower connection available")]
    NoFollower,

    /// The connection carrying the request closed before a response arrived.
    #[error("connection closed")]
    ConnClosed,

    /// The caller-supplied deadline fired.
    #[error("request timed out")]
    Timeout,

    /// Network-level failures (dial, read, write).
    #[error("connection error: {0}")]
    Connection(String),

    /// Wire protocol violations: bad magic, truncated frames, trailing bytes.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An in-band error response from the server, kept verbatim.
    #[error("server error ({code}): {message}")]
    Server {
        /// The ASCII code from the first error field, e.g. `"429"` or
        /// `"VALIDATION_ERROR"`.
        code: String,
        /// The human-readable message from the second error field, if any.
        message: String,
    },

    /// I/O errors from the standard library (wrapped in `Arc` for `Clone`).
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for RoomzinError {
    fn from(err: io::Error) -> Self {
        RoomzinError::Io(Arc::new(err))
    }
}

/// Maps a server error code to its [`ErrorKind`] bucket.
pub fn kind_of_code(code: &str) -> ErrorKind {
    match code {
        "AUTH_ERROR" => ErrorKind::Client,
        "VALIDATION_ERROR" | "NOT_FOUND" | "OVERFLOW" | "UNDERFLOW" | "FORBIDDEN" => {
            ErrorKind::Request
        }
        "308" | "405" | "429" | "503" => ErrorKind::Retry,
        _ => ErrorKind::Internal,
    }
}

impl RoomzinError {
    /// Builds a server-error variant from the two wire strings.
    pub fn classify(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns the bucket this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Authentication(_) | Self::EmptyPayload => {
                ErrorKind::Client
            }
            Self::Validation(_) => ErrorKind::Request,
            Self::NoLeader | Self::NoFollower | Self::ConnClosed | Self::Timeout => {
                ErrorKind::Retry
            }
            Self::Connection(_) | Self::Protocol(_) | Self::Io(_) => ErrorKind::Internal,
            Self::Server { code, .. } => kind_of_code(code),
        }
    }

    /// Returns `true` for SDK-misuse errors.
    pub fn is_client(&self) -> bool {
        self.kind() == ErrorKind::Client
    }

    /// Returns `true` for per-request rejections.
    pub fn is_request(&self) -> bool {
        self.kind() == ErrorKind::Request
    }

    /// Returns `true` for transient cluster conditions.
    pub fn is_retry(&self) -> bool {
        self.kind() == ErrorKind::Retry
    }

    /// Returns `true` for protocol violations and parse failures.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Returns the server error code if this is a server error.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A specialized `Result` type for Roomzin operations.
pub type Result<T> = std::result::Result<T, RoomzinError>;
