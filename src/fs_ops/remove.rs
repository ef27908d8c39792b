use std::fs;
use std::io;
use std::path::Path;
use tracing::trace;

use crate::errors::{Result, TransferError};

/// Remove one entry. Directories must already be empty.
pub(super) fn remove_entry(path: &Path, ignore_not_found: bool) -> Result<()> {
    let res = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir(path).map_err(|e| map_rmdir_error(path, e)),
        Ok(_) => fs::remove_file(path).map_err(|e| TransferError::from_io("remove", path, e)),
        Err(e) => Err(TransferError::from_io("stat", path, e)),
    };
    match res {
        Err(TransferError::NotFound { .. }) if ignore_not_found => {
            trace!(path = %path.display(), "remove: already gone");
            Ok(())
        }
        Ok(()) => {
            trace!(path = %path.display(), "removed entry");
            Ok(())
        }
        other => other,
    }
}

// Some systems report a non-empty directory as EEXIST.
fn map_rmdir_error(path: &Path, e: io::Error) -> TransferError {
    #[cfg(unix)]
    {
        if e.raw_os_error() == Some(libc::EEXIST) {
            return TransferError::DirectoryNotEmpty { path: path.to_path_buf() };
        }
    }
    TransferError::from_io("remove dir", path, e)
}
