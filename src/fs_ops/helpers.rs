//! I/O helper utilities.
//!
//! Enriches io::Error with op/path context and platform-aware hints. Used by
//! `TransferError::from_io` and the CLI when reporting failures.
//!
//! Usage:
//!   fs::create_dir(dir).map_err(io_err("create dir", dir))?;

use std::io;
use std::path::Path;

/// Format a human-friendly message with op/path plus platform-aware hints.
pub fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let hint = match code {
                libc::EACCES | libc::EPERM => {
                    Some("permission denied; check ownership and write permissions.")
                }
                libc::EXDEV => Some("cross-filesystem; atomic rename not possible."),
                libc::EBUSY => Some("resource busy; ensure no other process is writing."),
                libc::ENOENT => Some("path not found; verify it exists."),
                libc::EEXIST => Some("already exists; choose another name or replace the target."),
                libc::ENOSPC | libc::EDQUOT => Some("insufficient space on device."),
                libc::EROFS => Some("read-only filesystem; cannot write here."),
                libc::ELOOP => Some("too many symbolic link levels (ELOOP); possible symlink cycle."),
                libc::ENAMETOOLONG => Some("filename or path too long; shorten path segments."),
                libc::EMFILE => {
                    Some("process file descriptor limit reached; close files or raise limits.")
                }
                libc::ENFILE => Some("system-wide file table overflow; reduce open files."),
                _ => None,
            };
            if let Some(h) = hint {
                msg.push_str(" - ");
                msg.push_str(h);
            }
        }
        msg.push_str(&format!(" [os code: {}]", code));
    } else {
        let hint = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                Some("permission denied; check ownership and write permissions.")
            }
            io::ErrorKind::NotFound => Some("path not found; verify it exists."),
            io::ErrorKind::AlreadyExists => Some("already exists; remove or choose another name."),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                Some("busy/timed out; retry after the current write finishes.")
            }
            _ => None,
        };
        if let Some(h) = hint {
            msg.push_str(" - ");
            msg.push_str(h);
        }
    }

    msg
}
