use crate::fs::RealOp;
use std::{io, path::PathBuf};

/// Shared error type for the engine and the interception flows built on it.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// File system I/O failure.
    #[error("I/O error while accessing {0}")]
    Io(PathBuf, #[source] io::Error),

    /// A path is invalid for the current operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A required input is missing.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// The policy decided the file must be left untouched.
    #[error("access denied by trash policy: {0}")]
    AccessDenied(PathBuf),

    /// An internal step failed and IN_CASE_OF_FAILURE is PROTECT.
    #[error("operation refused after an internal failure: {0}")]
    Refused(PathBuf),

    /// The real uid could not be put back after a permission probe.
    #[error("unable to restore the real user id {uid}")]
    IdentityRestore {
        uid: libc::uid_t,
        #[source]
        source: io::Error,
    },

    /// One of the real operations could not be located.
    #[error("real operation unavailable: {0}")]
    UnavailableOperation(RealOp),

    /// The trash placement failed.
    #[error(transparent)]
    Graft(#[from] GraftError),
}

impl CoreError {
    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingValue(message.into())
    }

    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    /// Underlying OS error, when this error wraps one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io(_, err) => Some(err),
            Self::IdentityRestore { source, .. } => Some(source),
            Self::Graft(err) => Some(err.source_error()),
            _ => None,
        }
    }

    /// The errno a syscall wrapper reports for this error.
    ///
    /// `Refused` maps to 0 so that callers are not misled by a stale errno
    /// left over from whatever internal step failed.
    pub fn errno(&self) -> i32 {
        match self {
            Self::AccessDenied(_) => libc::EACCES,
            Self::Refused(_) => 0,
            Self::Graft(GraftError::Other { .. }) => 0,
            _ => self
                .io_error()
                .and_then(io::Error::raw_os_error)
                .unwrap_or(0),
        }
    }
}

/// Failure to relocate a file into the trash can.
#[derive(thiserror::Error, Debug)]
pub enum GraftError {
    /// Insufficient permission or a read-only store.
    #[error("not permitted to move {path} into the trash can")]
    Denied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Anything else: exhaustion, unexpected I/O failure, broken invariant.
    #[error("failed to move {path} into the trash can")]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GraftError {
    /// Classifies `source` as `Denied` or `Other`.
    pub fn classify(path: impl Into<PathBuf>, source: io::Error) -> Self {
        if is_denial(&source) {
            Self::Denied {
                path: path.into(),
                source,
            }
        } else {
            Self::Other {
                path: path.into(),
                source,
            }
        }
    }

    pub fn other(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Other {
            path: path.into(),
            source: io::Error::other(message.into()),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    pub fn source_error(&self) -> &io::Error {
        match self {
            Self::Denied { source, .. } | Self::Other { source, .. } => source,
        }
    }
}

/// Failure of the copy-then-delete fallback used across devices.
#[derive(thiserror::Error, Debug)]
pub enum MoveError {
    #[error("not permitted to move {path}")]
    Denied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {path}")]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MoveError {
    pub fn classify(path: impl Into<PathBuf>, source: io::Error) -> Self {
        if is_denial(&source) {
            Self::Denied {
                path: path.into(),
                source,
            }
        } else {
            Self::Other {
                path: path.into(),
                source,
            }
        }
    }

    pub fn other(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Other {
            path: path.into(),
            source,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

impl From<MoveError> for GraftError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::Denied { path, source } => Self::Denied { path, source },
            MoveError::Other { path, source } => Self::Other { path, source },
        }
    }
}

/// EACCES, EPERM and EROFS all mean "you may not write here".
pub fn is_denial(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EACCES) | Some(libc::EPERM) | Some(libc::EROFS)
    )
}

pub fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
