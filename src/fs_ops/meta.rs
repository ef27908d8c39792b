//! Metadata preservation.
//! - Permissions (mode bits on Unix, readonly elsewhere) and optionally atime/mtime.
//! - Best-effort: failures are logged and ignored; the data copy already succeeded.
//! - Symlinks are skipped (their own metadata is not portable to set).

use filetime::{FileTime, set_file_times};
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

use super::CopyOptions;

pub(super) fn apply(dest: &Path, src_meta: &fs::Metadata, opts: &CopyOptions) {
    if src_meta.file_type().is_symlink() {
        return;
    }
    if opts.preserve_timestamps {
        preserve_times(dest, src_meta);
    }
    if opts.preserve_permissions {
        preserve_permissions(dest, src_meta);
    }
}

fn preserve_times(dest: &Path, src_meta: &fs::Metadata) {
    #[cfg(unix)]
    let times = {
        use std::os::unix::fs::MetadataExt;
        Some((
            FileTime::from_unix_time(src_meta.atime(), src_meta.atime_nsec() as u32),
            FileTime::from_unix_time(src_meta.mtime(), src_meta.mtime_nsec() as u32),
        ))
    };
    #[cfg(not(unix))]
    let times = match (src_meta.accessed(), src_meta.modified()) {
        (Ok(a), Ok(m)) => Some((FileTime::from_system_time(a), FileTime::from_system_time(m))),
        _ => None,
    };

    if let Some((at, mt)) = times {
        if let Err(e) = set_file_times(dest, at, mt) {
            warn!(path = %dest.display(), error = %e, "failed to set atime/mtime on destination");
        } else {
            trace!(path = %dest.display(), "set atime/mtime on destination");
        }
    }
}

fn preserve_permissions(dest: &Path, src_meta: &fs::Metadata) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut mode = src_meta.permissions().mode() & 0o7777;
        if src_meta.is_dir() {
            // Keep directories writable for ourselves; we still have to fill them.
            mode |= 0o700;
        }
        if let Err(e) = fs::set_permissions(dest, fs::Permissions::from_mode(mode)) {
            warn!(path = %dest.display(), mode = format!("{:o}", mode), error = %e, "failed to set permissions on destination");
        } else {
            trace!(path = %dest.display(), mode = format!("{:o}", mode), "set permissions on destination");
        }
    }
    #[cfg(not(unix))]
    {
        if let Ok(meta) = fs::metadata(dest) {
            let mut perms = meta.permissions();
            perms.set_readonly(src_meta.permissions().readonly());
            let _ = fs::set_permissions(dest, perms);
        }
    }
}
