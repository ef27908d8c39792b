//! `FileOps` for the local filesystem.
//! Dispatches one entry by its lstat type: regular files are streamed,
//! directories created (or merged), symlinks and FIFOs recreated.

use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::{EntryInfo, EntryType, FileOps, LocalFs, ProgressFn, atomic, io_copy, meta, remove, space};
use super::util::{fsync_dir, same_entry};
use crate::config::Durability;
use crate::cancel::CancelToken;
use crate::errors::{Result, TransferError, io_err};
use crate::naming::{self, MAX_NAME_ATTEMPTS, NameKind};

impl FileOps for LocalFs {
    fn stat(&self, path: &Path) -> Result<EntryInfo> {
        let meta = fs::symlink_metadata(path).map_err(io_err("stat", path))?;
        Ok(EntryInfo {
            path: path.to_path_buf(),
            kind: EntryType::from_file_type(meta.file_type()),
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn list_children(&self, path: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path).map_err(io_err("read dir", path))? {
            cancel.check()?;
            let entry = entry.map_err(io_err("read dir", path))?;
            out.push(entry.path());
        }
        // Stable order independent of the directory's on-disk layout.
        out.sort();
        Ok(out)
    }

    fn copy_entry(
        &self,
        source: &Path,
        target: &Path,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<PathBuf> {
        if !same_entry(source, target) {
            self.copy_one(source, target, true, on_progress)?;
            return Ok(target.to_path_buf());
        }

        // Copying onto itself: pick "copy of X", "another copy of X", ...
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        for n in 1..=MAX_NAME_ATTEMPTS {
            let candidate = naming::alternate_path(dir, source, n, NameKind::Copy);
            match self.copy_one(source, &candidate, false, on_progress) {
                Ok(()) => {
                    debug!(src = %source.display(), dest = %candidate.display(), "created duplicate");
                    return Ok(candidate);
                }
                Err(TransferError::AlreadyExists { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(TransferError::AlreadyExists { path: target.to_path_buf() })
    }

    fn remove(&self, path: &Path, ignore_not_found: bool) -> Result<()> {
        remove::remove_entry(path, ignore_not_found)
    }

    fn try_fast_move(&self, source: &Path, target: &Path) -> Result<PathBuf> {
        atomic::try_fast_move(source, target)
    }

    fn available_space(&self, path: &Path) -> Option<u64> {
        space::available_space(path)
    }
}

impl LocalFs {
    /// Create a symlink to `source` inside `target_dir` named "link to X",
    /// "another link to X", ... (first free name).
    pub fn link_entry(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        for n in 1..=MAX_NAME_ATTEMPTS {
            let candidate = naming::alternate_path(target_dir, source, n, NameKind::Link);
            match make_symlink(source, &candidate) {
                Ok(()) => {
                    debug!(src = %source.display(), link = %candidate.display(), "created link");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(TransferError::from_io("symlink", &candidate, e)),
            }
        }
        Err(TransferError::AlreadyExists { path: target_dir.to_path_buf() })
    }

    fn copy_one(
        &self,
        source: &Path,
        target: &Path,
        merge_dirs: bool,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<()> {
        let src_meta = fs::symlink_metadata(source).map_err(io_err("stat", source))?;
        let kind = EntryType::from_file_type(src_meta.file_type());
        debug!(src = %source.display(), dest = %target.display(), ?kind, "dispatch copy_entry");

        let created = match kind {
            EntryType::Regular => {
                io_copy::copy_regular(
                    source,
                    target,
                    self.options().buffer_size,
                    self.options().durability,
                    on_progress,
                )?;
                meta::apply(target, &src_meta, self.options());
                if self.options().durability == Durability::Full
                    && let Some(parent) = target.parent()
                    && let Err(e) = fsync_dir(parent)
                {
                    warn!(dir = %parent.display(), error = %e, "fsync of target directory failed");
                }
                return Ok(());
            }
            EntryType::Directory => create_dir(target, &src_meta, merge_dirs)?,
            EntryType::Symlink => {
                let link = fs::read_link(source).map_err(io_err("read link", source))?;
                make_symlink(&link, target).map_err(io_err("symlink", target))?;
                true
            }
            EntryType::Fifo => {
                make_fifo(target, &src_meta)?;
                true
            }
            EntryType::Other => {
                return Err(TransferError::Unsupported {
                    path: source.to_path_buf(),
                    reason: "special file (socket or device)".into(),
                });
            }
        };

        if created {
            meta::apply(target, &src_meta, self.options());
        }
        let size = if kind == EntryType::Directory { 0 } else { src_meta.len() };
        if let ControlFlow::Break(()) = on_progress(size) {
            if created {
                let _ = remove::remove_entry(target, true);
            }
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }
}

/// Returns false when an existing directory was merged into.
fn create_dir(target: &Path, src_meta: &fs::Metadata, merge: bool) -> Result<bool> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        builder.mode(src_meta.permissions().mode() | 0o700);
    }
    #[cfg(not(unix))]
    let _ = src_meta;

    match builder.create(target) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && merge => {
            match fs::symlink_metadata(target) {
                Ok(m) if m.is_dir() => {
                    trace!(path = %target.display(), "merging into existing directory");
                    Ok(false)
                }
                _ => Err(TransferError::AlreadyExists { path: target.to_path_buf() }),
            }
        }
        Err(e) => Err(TransferError::from_io("create dir", target, e)),
    }
}

#[cfg(unix)]
fn make_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn make_symlink(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported on this platform"))
}

#[cfg(unix)]
fn make_fifo(target: &Path, src_meta: &fs::Metadata) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::PermissionsExt;

    let c = CString::new(target.as_os_str().as_bytes()).map_err(|_| TransferError::Unsupported {
        path: target.to_path_buf(),
        reason: "path contains NUL".into(),
    })?;
    let mode = (src_meta.permissions().mode() & 0o777) as libc::mode_t;
    let rc = unsafe { libc::mkfifo(c.as_ptr(), mode) };
    if rc != 0 {
        return Err(TransferError::from_io("mkfifo", target, io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_fifo(target: &Path, _src_meta: &fs::Metadata) -> Result<()> {
    Err(TransferError::Unsupported {
        path: target.to_path_buf(),
        reason: "FIFOs are not supported on this platform".into(),
    })
}
