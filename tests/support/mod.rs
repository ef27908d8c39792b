#![allow(dead_code)]

//! Test doubles shared by the integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use xfer::fs_ops::ProgressFn;
use xfer::{CancelToken, CopyOptions, EntryInfo, FileOps, LocalFs, Result, TransferError};

/// `LocalFs` with call counters and switchable failure modes.
#[derive(Default)]
pub struct Instrumented {
    pub inner: LocalFs,
    pub copies: AtomicUsize,
    pub listings: AtomicUsize,
    pub renames: AtomicUsize,
    pub stats: AtomicUsize,
    pub removes: AtomicUsize,
    /// Every rename attempt fails, forcing the copy path.
    pub no_rename: bool,
    /// The first N copies fail with permission denied.
    pub fail_copies: AtomicUsize,
    /// Every copy fails with "no space".
    pub disk_full: bool,
    /// Reported free space, if any.
    pub free_space: Option<u64>,
    /// `stat` of this path reports not found, as if it vanished after listing.
    pub vanished: Option<PathBuf>,
    /// The first N source removals (not overwrites) fail with permission denied.
    pub fail_removes: AtomicUsize,
}

impl Instrumented {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer_size: usize) -> Self {
        Self {
            inner: LocalFs::new(CopyOptions {
                buffer_size,
                ..CopyOptions::default()
            }),
            ..Self::default()
        }
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn renames(&self) -> usize {
        self.renames.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

impl FileOps for Instrumented {
    fn stat(&self, path: &Path) -> Result<EntryInfo> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        if self.vanished.as_deref() == Some(path) {
            return Err(TransferError::NotFound { path: path.to_path_buf() });
        }
        self.inner.stat(path)
    }

    fn list_children(&self, path: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.inner.list_children(path, cancel)
    }

    fn copy_entry(&self, source: &Path, target: &Path, on_progress: &mut ProgressFn<'_>) -> Result<PathBuf> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.disk_full {
            return Err(TransferError::NoSpace { path: target.to_path_buf() });
        }
        let pending = self.fail_copies.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_copies.store(pending - 1, Ordering::SeqCst);
            return Err(TransferError::PermissionDenied {
                path: target.to_path_buf(),
                context: "test".into(),
            });
        }
        self.inner.copy_entry(source, target, on_progress)
    }

    fn remove(&self, path: &Path, ignore_not_found: bool) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        let pending = self.fail_removes.load(Ordering::SeqCst);
        if !ignore_not_found && pending > 0 {
            self.fail_removes.store(pending - 1, Ordering::SeqCst);
            return Err(TransferError::PermissionDenied {
                path: path.to_path_buf(),
                context: "test".into(),
            });
        }
        self.inner.remove(path, ignore_not_found)
    }

    fn try_fast_move(&self, source: &Path, target: &Path) -> Result<PathBuf> {
        self.renames.fetch_add(1, Ordering::SeqCst);
        if self.no_rename {
            return Err(TransferError::Unsupported {
                path: source.to_path_buf(),
                reason: "rename disabled".into(),
            });
        }
        self.inner.try_fast_move(source, target)
    }

    fn available_space(&self, path: &Path) -> Option<u64> {
        self.free_space.or_else(|| self.inner.available_space(path))
    }
}

/// Shared handle so a test can inspect the counters after the job ran.
pub fn shared(ops: Instrumented) -> Arc<Instrumented> {
    Arc::new(ops)
}

/// Counter for prompts seen by a closure-backed port.
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}
