//! Fast move: a single rename of the whole entry.
//!
//! Never replaces an existing target. On Linux `renameat2(RENAME_NOREPLACE)` makes
//! that atomic; elsewhere (or on filesystems without support) an lstat check
//! precedes the plain rename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::util::{fsync_dir, is_cross_device};
use crate::errors::{Result, TransferError};

pub(super) fn try_fast_move(src: &Path, dst: &Path) -> Result<PathBuf> {
    match rename_noreplace(src, dst) {
        Ok(()) => {
            if let Some(parent) = dst.parent() {
                let _ = fsync_dir(parent);
            }
            trace!(src = %src.display(), dst = %dst.display(), "renamed entry");
            Ok(dst.to_path_buf())
        }
        Err(e) => {
            if is_cross_device(&e) {
                debug!(src = %src.display(), dst = %dst.display(), "rename crosses filesystems");
            }
            Err(TransferError::from_io("rename", dst, e))
        }
    }
}

#[cfg(target_os = "linux")]
fn rename_noreplace(src: &Path, dst: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let src_c = CString::new(src.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;
    let dst_c = CString::new(dst.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;
    let rc = unsafe {
        libc::syscall(
            libc::SYS_renameat2,
            libc::AT_FDCWD,
            src_c.as_ptr(),
            libc::AT_FDCWD,
            dst_c.as_ptr(),
            libc::RENAME_NOREPLACE,
        )
    };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Kernel or filesystem lacks RENAME_NOREPLACE.
        Some(libc::EINVAL) | Some(libc::ENOSYS) => checked_rename(src, dst),
        _ => Err(err),
    }
}

#[cfg(not(target_os = "linux"))]
fn rename_noreplace(src: &Path, dst: &Path) -> io::Result<()> {
    checked_rename(src, dst)
}

fn checked_rename(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::symlink_metadata(dst) {
        Ok(_) => Err(io::Error::from(io::ErrorKind::AlreadyExists)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::rename(src, dst),
        Err(e) => Err(e),
    }
}
