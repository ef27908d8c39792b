//! Typed error definitions for xfer.
//! Every primitive filesystem failure is classified into a small set of kinds the
//! engine reacts to (collision, no space, cancellation, everything else).

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fs_ops::build_message;

/// Coarse classification the engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    AlreadyExists,
    NoSpace,
    PermissionDenied,
    NotFound,
    DirectoryNotEmpty,
    Cancelled,
    Other,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Target already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("No space left on device while writing {path}")]
    NoSpace { path: PathBuf },

    #[error("Permission denied on {path}: {context}")]
    PermissionDenied { path: PathBuf, context: String },

    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Directory not empty: {path}")]
    DirectoryNotEmpty { path: PathBuf },

    #[error("Cannot transfer {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("Invalid transfer endpoint {path}: {reason}")]
    InvalidEndpoint { path: PathBuf, reason: String },

    #[error("Source and target lists differ in length ({sources} sources, {targets} targets)")]
    LengthMismatch { sources: usize, targets: usize },

    #[error("{message}")]
    Io {
        op: &'static str,
        path: PathBuf,
        message: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TransferError>;

impl TransferError {
    /// Classify an `io::Error` raised by `op` on `path`.
    pub fn from_io(op: &'static str, path: &Path, e: io::Error) -> Self {
        let path_buf = path.to_path_buf();
        #[cfg(unix)]
        {
            if let Some(code) = e.raw_os_error() {
                match code {
                    libc::EEXIST => return TransferError::AlreadyExists { path: path_buf },
                    libc::ENOSPC | libc::EDQUOT => return TransferError::NoSpace { path: path_buf },
                    libc::EACCES | libc::EPERM => {
                        return TransferError::PermissionDenied {
                            path: path_buf,
                            context: build_message(op, path, &e),
                        };
                    }
                    libc::ENOENT => return TransferError::NotFound { path: path_buf },
                    libc::ENOTEMPTY => return TransferError::DirectoryNotEmpty { path: path_buf },
                    _ => {}
                }
            }
        }
        match e.kind() {
            io::ErrorKind::AlreadyExists => TransferError::AlreadyExists { path: path_buf },
            io::ErrorKind::StorageFull => TransferError::NoSpace { path: path_buf },
            io::ErrorKind::PermissionDenied => TransferError::PermissionDenied {
                context: build_message(op, path, &e),
                path: path_buf,
            },
            io::ErrorKind::NotFound => TransferError::NotFound { path: path_buf },
            io::ErrorKind::DirectoryNotEmpty => TransferError::DirectoryNotEmpty { path: path_buf },
            _ => TransferError::Io {
                op,
                message: build_message(op, path, &e),
                path: path_buf,
                source: e,
            },
        }
    }

    pub fn kind(&self) -> IoErrorKind {
        match self {
            TransferError::Cancelled => IoErrorKind::Cancelled,
            TransferError::AlreadyExists { .. } => IoErrorKind::AlreadyExists,
            TransferError::NoSpace { .. } => IoErrorKind::NoSpace,
            TransferError::PermissionDenied { .. } => IoErrorKind::PermissionDenied,
            TransferError::NotFound { .. } => IoErrorKind::NotFound,
            TransferError::DirectoryNotEmpty { .. } => IoErrorKind::DirectoryNotEmpty,
            _ => IoErrorKind::Other,
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }

    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            TransferError::Cancelled => 10,
            TransferError::AlreadyExists { .. } => 20,
            TransferError::NoSpace { .. } => 21,
            TransferError::PermissionDenied { .. } => 22,
            TransferError::NotFound { .. } => 23,
            TransferError::DirectoryNotEmpty { .. } => 24,
            TransferError::Unsupported { .. } => 25,
            TransferError::InvalidEndpoint { .. } => 30,
            TransferError::LengthMismatch { .. } => 31,
            TransferError::Io { .. } => 40,
        }
    }
}

/// `.map_err` adapter, in the spirit of `io_error_with_help`.
pub fn io_err<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> TransferError + 'a {
    move |e| TransferError::from_io(op, path, e)
}
