//! Error taxonomy shared by every fallible boundary in the workspace.
//!
//! The kinds mirror the propagation policy: filesystem and network errors
//! are retried by the caller up to `retry_count` times; [`CoreError::Fatal`]
//! always surfaces; [`CoreError::Retriable`] is the wrapper the retry helper
//! in the engine matches on.

use std::fmt;
use std::io;

/// The coarse category of an I/O failure, used to decide retry eligibility
/// independent of the platform's raw `io::ErrorKind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoErrorKind {
    /// The path does not exist.
    NotFound,
    /// The path already exists (e.g. a `fail_if_exists` copy).
    AlreadyExists,
    /// Another process holds the file open in a conflicting mode.
    SharingViolation,
    /// The caller lacks permission for the operation.
    PermissionDenied,
    /// Any other I/O failure.
    Other,
}

impl IoErrorKind {
    /// Classifies a [`std::io::Error`] into the coarse taxonomy.
    #[must_use]
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            #[allow(unreachable_patterns)]
            _ => Self::Other,
        }
    }
}

/// The workspace-wide error taxonomy (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A filesystem primitive failed for a single path.
    #[error("io error ({kind:?}) on {path}: {source}")]
    Io {
        /// Coarse classification of the underlying error.
        kind: IoErrorKind,
        /// The path the operation targeted.
        path: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The network connection was closed, timed out, or spoke an
    /// unexpected protocol version.
    #[error("network error: {0}")]
    Network(String),

    /// A framed command or response violated the wire contract (oversize
    /// frame, unexpected response tag, truncated payload).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Wraps another error kind and marks it retry-eligible.
    #[error("attempt {attempt} failed, retry eligible: {source}")]
    Retriable {
        /// 1-based attempt number that produced this error.
        attempt: u32,
        /// The underlying error.
        #[source]
        source: Box<CoreError>,
    },

    /// Wraps another error kind that must surface to the caller without
    /// further retry (e.g. a security-file handshake failure).
    #[error("fatal: {source}")]
    Fatal {
        /// The underlying error.
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Builds an [`CoreError::Io`] from a path and a raw `io::Error`.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        let kind = IoErrorKind::classify(&source);
        Self::Io {
            kind,
            path: path.into(),
            source,
        }
    }

    /// Wraps `self` as retry-eligible at the given attempt number.
    #[must_use]
    pub fn retriable(self, attempt: u32) -> Self {
        Self::Retriable {
            attempt,
            source: Box::new(self),
        }
    }

    /// Wraps `self` as fatal (not retry-eligible regardless of kind).
    #[must_use]
    pub fn fatal(self) -> Self {
        Self::Fatal {
            source: Box::new(self),
        }
    }

    /// Whether the retry wrapper should attempt this operation again.
    ///
    /// `Fatal` is never retriable. A bare `Io`/`Network`/`Protocol` error is
    /// retriable unless the I/O kind is [`IoErrorKind::PermissionDenied`] or
    /// [`IoErrorKind::AlreadyExists`], which will not resolve by retrying.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Fatal { .. } => false,
            Self::Retriable { .. } => true,
            Self::Io { kind, .. } => {
                !matches!(kind, IoErrorKind::PermissionDenied | IoErrorKind::AlreadyExists)
            }
            Self::Network(_) | Self::Protocol(_) => true,
        }
    }
}

impl fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Convenience alias for results returning [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_is_never_retriable() {
        let err = CoreError::Network("closed".into()).fatal();
        assert!(!err.is_retriable());
    }

    #[test]
    fn permission_denied_is_not_retriable() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = CoreError::io("/x", io_err);
        assert!(!err.is_retriable());
    }

    #[test]
    fn generic_io_error_is_retriable() {
        let io_err = io::Error::other("transient");
        let err = CoreError::io("/x", io_err);
        assert!(err.is_retriable());
    }
}
