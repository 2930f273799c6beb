//! Error taxonomy for configuration tree operations.
//!
//! Every handler and backend reports failures through [`Error`]. The
//! dispatcher hands a single ([`ErrorKind`], numeric code) pair to the RPC
//! layer; see [`Error::code`].
//!
//! OS and kernel failures are always carried as [`Error::Backend`] with the
//! original errno, whichever backend produced them.

use std::io;

use crate::netlink;

/// Result type for configuration tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Agent-specific codes for kinds that have no errno equivalent.
pub mod code {
    /// Instance name or value does not follow its grammar.
    pub const EFMT: i32 = 1001;
    /// External helper program returned non-zero.
    pub const ESHCMD: i32 = 1002;
    /// Value does not fit the caller's buffer.
    pub const ESMALLBUF: i32 = 1003;
}

/// Error kind, independent of the message carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidFormat,
    InvalidValue,
    ResourceExhausted,
    Unsupported,
    ShellCommandFailed,
    Backend,
    OutOfMemory,
    PermissionDenied,
    BufferTooSmall,
}

/// Errors returned by object handlers and backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Object or instance does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up.
        what: String,
    },

    /// Object or instance already exists.
    #[error("{what} already exists")]
    AlreadyExists {
        /// What was about to be created.
        what: String,
    },

    /// Instance name or value fails its grammar.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Well-formed but semantically illegal value.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A bounded resource has no free entry left.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Operation not available on this object or platform.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// External helper program failed.
    #[error("command failed: {command}")]
    ShellCommandFailed {
        /// The command line that was run.
        command: String,
    },

    /// OS or kernel error.
    #[error("{message} (errno {errno})")]
    Backend {
        /// Positive errno value.
        errno: i32,
        /// Human-readable message, possibly prefixed with the operation.
        message: String,
    },

    /// Allocation failed.
    #[error("out of memory")]
    OutOfMemory,

    /// Operation refused for this instance.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Value is longer than the caller's buffer.
    #[error("value of {len} bytes does not fit a {limit} byte buffer")]
    BufferTooSmall {
        /// Length of the value.
        len: usize,
        /// Buffer capacity.
        limit: usize,
    },
}

impl Error {
    /// Create a backend error from a positive errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(errno).to_string();
        Self::Backend { errno, message }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for [`Error::AlreadyExists`].
    pub fn exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    /// Prefix backend errors with the operation that failed.
    ///
    /// Other kinds are returned unchanged.
    pub fn with_context(self, operation: impl AsRef<str>) -> Self {
        match self {
            Self::Backend { errno, message } => Self::Backend {
                errno,
                message: format!("{}: {}", operation.as_ref(), message),
            },
            other => other,
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::InvalidValue(_) => ErrorKind::InvalidValue,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::ShellCommandFailed { .. } => ErrorKind::ShellCommandFailed,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::OutOfMemory => ErrorKind::OutOfMemory,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
        }
    }

    /// Numeric code reported to the RPC layer alongside the kind.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => libc::ENOENT,
            Self::AlreadyExists { .. } => libc::EEXIST,
            Self::InvalidFormat(_) => code::EFMT,
            Self::InvalidValue(_) => libc::EINVAL,
            Self::ResourceExhausted(_) => libc::ENOSPC,
            Self::Unsupported(_) => libc::EOPNOTSUPP,
            Self::ShellCommandFailed { .. } => code::ESHCMD,
            Self::Backend { errno, .. } => *errno,
            Self::OutOfMemory => libc::ENOMEM,
            Self::PermissionDenied(_) => libc::EPERM,
            Self::BufferTooSmall { .. } => code::ESMALLBUF,
        }
    }

    /// The OS errno, for backend errors.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Backend { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this is an "already exists" error.
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Check if the OS reported that a neighbor entry is already gone.
    pub fn is_neighbor_gone(&self) -> bool {
        matches!(
            self.errno(),
            Some(libc::ENXIO | libc::ENETDOWN | libc::ENETUNREACH)
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(errno) => Self::Backend {
                errno,
                message: err.to_string(),
            },
            None if err.kind() == io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            None => Self::Backend {
                errno: libc::EIO,
                message: err.to_string(),
            },
        }
    }
}

impl From<netlink::Error> for Error {
    fn from(err: netlink::Error) -> Self {
        match err {
            netlink::Error::Io(e) => e.into(),
            netlink::Error::Kernel { errno, message } => Self::Backend { errno, message },
            other => Self::Backend {
                errno: libc::EPROTO,
                message: other.to_string(),
            },
        }
    }
}
