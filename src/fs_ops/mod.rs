//! Primitive filesystem operations.
//!
//! `FileOps` is the seam between the transfer engine and the filesystem: one
//! entry at a time, no recursion, no prompting. `LocalFs` implements it on top
//! of std/libc.

mod atomic;
mod entry;
mod helpers;
mod io_copy;
mod meta;
mod remove;
mod space;
mod util;

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cancel::CancelToken;
use crate::config::{Config, Durability};
use crate::errors::Result;

pub use helpers::build_message;
pub use space::format_bytes;

/// Progress callback handed to `copy_entry`: receives the bytes copied so far for
/// the current entry and returns `Break` to stop the copy.
pub type ProgressFn<'a> = dyn FnMut(u64) -> ControlFlow<()> + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Regular,
    Directory,
    Symlink,
    Fifo,
    Other,
}

impl EntryType {
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_symlink() {
            return EntryType::Symlink;
        }
        if ft.is_dir() {
            return EntryType::Directory;
        }
        if ft.is_file() {
            return EntryType::Regular;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if ft.is_fifo() {
                return EntryType::Fifo;
            }
        }
        EntryType::Other
    }
}

/// Result of `FileOps::stat` (lstat semantics: symlinks are not followed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub path: PathBuf,
    pub kind: EntryType,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

pub trait FileOps: Send + Sync {
    fn stat(&self, path: &Path) -> Result<EntryInfo>;

    /// Immediate children of a directory, excluding `.` and `..`.
    fn list_children(&self, path: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>>;

    /// Copy a single entry (a directory is created, not recursed into).
    /// Returns the path actually written, which differs from `target` when a
    /// duplicate name had to be generated.
    fn copy_entry(&self, source: &Path, target: &Path, on_progress: &mut ProgressFn<'_>)
    -> Result<PathBuf>;

    fn remove(&self, path: &Path, ignore_not_found: bool) -> Result<()>;

    /// Atomic rename of a whole entry; never replaces an existing target.
    fn try_fast_move(&self, source: &Path, target: &Path) -> Result<PathBuf>;

    /// Bytes available to unprivileged writers on the filesystem holding `path`.
    fn available_space(&self, _path: &Path) -> Option<u64> {
        None
    }
}

/// Tunables for `LocalFs`.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub buffer_size: usize,
    pub durability: Durability,
    pub preserve_permissions: bool,
    pub preserve_timestamps: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: crate::config::DEFAULT_BUFFER_SIZE,
            durability: Durability::Data,
            preserve_permissions: true,
            preserve_timestamps: false,
        }
    }
}

impl From<&Config> for CopyOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            buffer_size: cfg.buffer_size,
            durability: cfg.durability,
            preserve_permissions: cfg.preserve_permissions,
            preserve_timestamps: cfg.preserve_timestamps,
        }
    }
}

/// Local filesystem implementation of `FileOps`.
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    opts: CopyOptions,
}

impl LocalFs {
    pub fn new(opts: CopyOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &CopyOptions {
        &self.opts
    }
}
