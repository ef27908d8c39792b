//! Streaming copy of one regular file with progress and cancellation.
//!
//! - Destination is created with `create_new(true)` (O_EXCL); an existing target
//!   surfaces as `AlreadyExists` and is never clobbered.
//! - Data moves in `buffer_size` chunks; the progress callback runs after every
//!   chunk and may stop the copy.
//! - On stop or on any error the partially written destination is removed.
//!
//! Snapshot semantics: the source is read once from start to EOF; bytes appended
//! concurrently are not included.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{debug, trace, warn};

use super::ProgressFn;
use crate::config::Durability;
use crate::errors::{Result, TransferError, io_err};

/// Smallest buffer accepted; smaller requests are rounded up.
const MIN_BUF: usize = 4 * 1024;

/// Outcome of the raw byte loop before cleanup is applied.
enum Stop {
    Cancelled,
    Failed(TransferError),
}

/// Copy `src` -> `dst`, returning the number of bytes written.
pub(super) fn copy_regular(
    src: &Path,
    dst: &Path,
    buffer_size: usize,
    durability: Durability,
    on_progress: &mut ProgressFn<'_>,
) -> Result<u64> {
    let src_f = File::open(src).map_err(io_err("open source", src))?;

    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.custom_flags(libc::O_NOFOLLOW);
    }
    let dst_f = opts.open(dst).map_err(|e| map_create_error(dst, e))?;

    match pump(&src_f, &dst_f, dst, buffer_size.max(MIN_BUF), durability, on_progress) {
        Ok(bytes) => {
            trace!(src = %src.display(), dst = %dst.display(), bytes, "copied regular file");
            Ok(bytes)
        }
        Err(stop) => {
            drop(dst_f);
            if let Err(e) = std::fs::remove_file(dst) {
                warn!(path = %dst.display(), error = %e, "failed to remove partial copy");
            } else {
                debug!(path = %dst.display(), "removed partial copy");
            }
            match stop {
                Stop::Cancelled => Err(TransferError::Cancelled),
                Stop::Failed(e) => Err(e),
            }
        }
    }
}

// An existing directory or busy executable at the target is still a collision.
fn map_create_error(dst: &Path, e: io::Error) -> TransferError {
    #[cfg(unix)]
    {
        if let Some(code) = e.raw_os_error()
            && matches!(code, libc::EISDIR | libc::EMLINK | libc::ETXTBSY | libc::ELOOP)
        {
            return TransferError::AlreadyExists { path: dst.to_path_buf() };
        }
    }
    TransferError::from_io("create", dst, e)
}

fn pump(
    src_f: &File,
    dst_f: &File,
    dst: &Path,
    buf_size: usize,
    durability: Durability,
    on_progress: &mut ProgressFn<'_>,
) -> std::result::Result<u64, Stop> {
    let mut total: u64 = 0;

    // Fast-path: on Linux, try copy_file_range for in-kernel copy when supported.
    #[cfg(target_os = "linux")]
    let kernel_done = {
        use std::os::unix::io::AsRawFd;
        let mut done = false;
        loop {
            let rc = unsafe {
                libc::copy_file_range(
                    src_f.as_raw_fd(),
                    std::ptr::null_mut(),
                    dst_f.as_raw_fd(),
                    std::ptr::null_mut(),
                    buf_size,
                    0,
                )
            };
            if rc > 0 {
                total += rc as u64;
                if on_progress(total).is_break() {
                    return Err(Stop::Cancelled);
                }
                continue;
            }
            if rc == 0 {
                done = true;
                break;
            }
            let err = io::Error::last_os_error();
            let unsupported = matches!(
                err.raw_os_error(),
                Some(libc::EXDEV | libc::ENOSYS | libc::EINVAL | libc::EPERM | libc::EOPNOTSUPP)
            );
            if total == 0 && unsupported {
                trace!("copy_file_range unsupported here; falling back to read/write");
                break;
            }
            return Err(Stop::Failed(TransferError::from_io("write", dst, err)));
        }
        done
    };
    #[cfg(not(target_os = "linux"))]
    let kernel_done = false;

    if !kernel_done {
        let mut reader = src_f;
        let mut writer = dst_f;
        let mut buf = vec![0u8; buf_size];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Stop::Failed(TransferError::from_io("read", dst, e))),
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| Stop::Failed(TransferError::from_io("write", dst, e)))?;
            total += n as u64;
            if let ControlFlow::Break(()) = on_progress(total) {
                return Err(Stop::Cancelled);
            }
        }
        writer
            .flush()
            .map_err(|e| Stop::Failed(TransferError::from_io("flush", dst, e)))?;
    }

    if matches!(durability, Durability::Full) {
        dst_f
            .sync_all()
            .map_err(|e| Stop::Failed(TransferError::from_io("fsync", dst, e)))?;
    }
    Ok(total)
}
