//! Transfer engine: executes a planned forest depth-first.
//!
//! Per node: fast move (move jobs, non-top-level), copy with collision and error
//! prompts (overwrite, skip, or keep both under a fresh "copy of" name), recurse into directories against the real target, then remove the
//! source when moving. Any error that is not resolved by a prompt terminates
//! the whole job.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::cancel::CancelToken;
use crate::errors::{Result, TransferError};
use crate::fs_ops::{EntryInfo, EntryType, FileOps};
use crate::interaction::{Choice, Choices, InteractionPort};
use crate::naming::{MAX_NAME_ATTEMPTS, NameKind, alternate_path};
use crate::node::TransferNode;
use crate::progress::{Progress, ProgressSink};

/// Remembered "to all" answers, scoped to one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobPolicy {
    /// `YesToAll`, `NoToAll` or `RenameAll` from an earlier collision prompt.
    pub earlier_overwrite: Option<Choice>,
    /// `YesToAll` from an earlier skip prompt.
    pub earlier_skip: Option<Choice>,
}

enum Collision {
    Overwrite,
    Rename,
    Skip,
    Retry,
}

enum Recovery {
    Retry,
    Skip,
}

pub struct Engine<'a> {
    ops: &'a dyn FileOps,
    port: &'a dyn InteractionPort,
    sink: &'a dyn ProgressSink,
    cancel: &'a CancelToken,
    move_files: bool,
    policy: JobPolicy,
    progress: Progress,
}

impl<'a> Engine<'a> {
    pub fn new(
        ops: &'a dyn FileOps,
        port: &'a dyn InteractionPort,
        sink: &'a dyn ProgressSink,
        cancel: &'a CancelToken,
        move_files: bool,
        progress: Progress,
    ) -> Self {
        Self {
            ops,
            port,
            sink,
            cancel,
            move_files,
            policy: JobPolicy::default(),
            progress,
        }
    }

    pub fn policy(&self) -> JobPolicy {
        self.policy
    }

    pub fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    pub fn port(&self) -> &'a dyn InteractionPort {
        self.port
    }

    pub fn sink(&self) -> &'a dyn ProgressSink {
        self.sink
    }

    /// One atomic rename attempt. `Ok(None)` means "fall back to copying".
    pub fn fast_move(&mut self, source: &Path, target: &Path) -> Result<Option<PathBuf>> {
        self.cancel.check()?;
        match self.ops.try_fast_move(source, target) {
            Ok(dest) => {
                info!(src = %source.display(), dest = %dest.display(), "Moved by rename");
                Ok(Some(dest))
            }
            Err(TransferError::Cancelled) => Err(TransferError::Cancelled),
            Err(e) => {
                debug!(src = %source.display(), dest = %target.display(), error = %e, "rename not possible; copying instead");
                Ok(None)
            }
        }
    }

    /// Transfer `node` to `target`. Returns the confirmed target, or `None`
    /// when the node was skipped.
    ///
    /// `try_fast` is false for top-level nodes whose rename was already tried
    /// before planning.
    pub fn transfer(&mut self, node: &TransferNode, target: &Path, try_fast: bool) -> Result<Option<PathBuf>> {
        self.cancel.check()?;
        self.sink.on_current_item(&node.display_name());

        if self.move_files
            && try_fast
            && let Some(dest) = self.fast_move(&node.source, target)?
        {
            self.progress.add(node.total_size(), self.sink);
            return Ok(Some(dest));
        }

        let Some(real_target) = self.copy_with_prompts(node, target)? else {
            self.progress.add(node.total_size() - node.size, self.sink);
            return Ok(None);
        };

        if node.is_dir() {
            for child in &node.children {
                let name = child.source.file_name().map(PathBuf::from).unwrap_or_default();
                self.transfer(child, &real_target.join(name), true)?;
            }
        }

        if self.move_files {
            self.remove_source(&node.source)?;
        }

        trace!(src = %node.source.display(), dest = %real_target.display(), "node done");
        Ok(Some(real_target))
    }

    fn copy_with_prompts(&mut self, node: &TransferNode, target: &Path) -> Result<Option<PathBuf>> {
        let mut dest = target.to_path_buf();
        self.progress.begin_entry();
        loop {
            self.cancel.check()?;

            let result = {
                let Engine { ops, sink, cancel, progress, .. } = self;
                let mut on_progress = |done: u64| {
                    progress.advance_entry(done, *sink);
                    cancel.wait_while_paused();
                    if cancel.is_cancelled() {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                };
                ops.copy_entry(&node.source, &dest, &mut on_progress)
            };

            let err = match result {
                Ok(done) => return Ok(Some(done)),
                Err(e) => e,
            };
            match err {
                TransferError::Cancelled => return Err(TransferError::Cancelled),
                TransferError::NoSpace { .. } => {
                    warn!(src = %node.source.display(), dest = %dest.display(), "destination is full");
                    return Err(err);
                }
                TransferError::AlreadyExists { .. } => match self.ask_replace(&node.source, &dest)? {
                    Collision::Retry => continue,
                    Collision::Skip => {
                        self.progress.skip_entry(node.size, self.sink);
                        return Ok(None);
                    }
                    Collision::Rename => match self.fresh_name(&node.source, &dest) {
                        Ok(renamed) => {
                            debug!(src = %node.source.display(), dest = %renamed.display(), "copying under a new name");
                            dest = renamed;
                        }
                        Err(TransferError::Cancelled) => return Err(TransferError::Cancelled),
                        Err(e) => {
                            if let Recovery::Skip = self.ask_skip(&e)? {
                                self.progress.skip_entry(node.size, self.sink);
                                return Ok(None);
                            }
                        }
                    },
                    Collision::Overwrite => {
                        debug!(path = %dest.display(), "removing existing target");
                        if let Err(e) = self.ops.remove(&dest, true) {
                            if e.is_cancelled() {
                                return Err(e);
                            }
                            if let Recovery::Skip = self.ask_skip(&e)? {
                                self.progress.skip_entry(node.size, self.sink);
                                return Ok(None);
                            }
                        }
                    }
                },
                other => match self.ask_skip(&other)? {
                    Recovery::Retry => continue,
                    Recovery::Skip => {
                        self.progress.skip_entry(node.size, self.sink);
                        return Ok(None);
                    }
                },
            }
        }
    }

    // First "copy of" name for `source` that is free next to `target`.
    fn fresh_name(&self, source: &Path, target: &Path) -> Result<PathBuf> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        for n in 1..=MAX_NAME_ATTEMPTS {
            self.cancel.check()?;
            let candidate = alternate_path(dir, source, n, NameKind::Copy);
            match self.ops.stat(&candidate) {
                Ok(_) => continue,
                Err(TransferError::NotFound { .. }) => return Ok(candidate),
                Err(e) => return Err(e),
            }
        }
        Err(TransferError::AlreadyExists { path: target.to_path_buf() })
    }

    fn remove_source(&mut self, source: &Path) -> Result<()> {
        loop {
            self.cancel.check()?;
            match self.ops.remove(source, false) {
                Ok(()) => return Ok(()),
                Err(TransferError::DirectoryNotEmpty { .. }) => {
                    debug!(path = %source.display(), "source directory not empty; leaving it");
                    return Ok(());
                }
                Err(TransferError::Cancelled) => return Err(TransferError::Cancelled),
                Err(e) => match self.ask_skip(&e)? {
                    Recovery::Retry => continue,
                    Recovery::Skip => return Ok(()),
                },
            }
        }
    }

    fn ask_replace(&mut self, source: &Path, target: &Path) -> Result<Collision> {
        let choice = match self.policy.earlier_overwrite {
            Some(Choice::YesToAll) => Choice::Yes,
            Some(Choice::NoToAll) => Choice::No,
            Some(Choice::RenameAll) => Choice::Rename,
            _ => {
                let target_info = match self.ops.stat(target) {
                    Ok(info) => info,
                    // Gone since the copy failed: just try again.
                    Err(TransferError::NotFound { .. }) => return Ok(Collision::Retry),
                    Err(_) => placeholder(target),
                };
                let source_info = self.ops.stat(source).unwrap_or_else(|_| placeholder(source));
                let answer = self.port.ask_replace(&source_info, &target_info);
                if matches!(answer, Choice::YesToAll | Choice::NoToAll | Choice::RenameAll) {
                    self.policy.earlier_overwrite = Some(answer);
                }
                answer
            }
        };
        debug!(%choice, src = %source.display(), dest = %target.display(), "collision resolved");
        match choice {
            Choice::Yes | Choice::YesToAll | Choice::Force => Ok(Collision::Overwrite),
            Choice::No | Choice::NoToAll => Ok(Collision::Skip),
            Choice::Rename | Choice::RenameAll => Ok(Collision::Rename),
            Choice::Retry => Ok(Collision::Retry),
            Choice::Cancel => self.abort(),
        }
    }

    fn ask_skip(&mut self, err: &TransferError) -> Result<Recovery> {
        if self.policy.earlier_skip == Some(Choice::YesToAll) {
            debug!(error = %err, "skipping (skip all)");
            return Ok(Recovery::Skip);
        }
        let message = format!("{err}\n\nDo you want to skip it?");
        let choice = self.port.ask(&message, Choices::SKIP);
        debug!(%choice, code = err.code(), error = %err, "error prompt answered");
        match choice {
            Choice::YesToAll => {
                self.policy.earlier_skip = Some(Choice::YesToAll);
                Ok(Recovery::Skip)
            }
            Choice::Yes | Choice::Force => Ok(Recovery::Skip),
            Choice::Retry => Ok(Recovery::Retry),
            Choice::No | Choice::NoToAll | Choice::Rename | Choice::RenameAll | Choice::Cancel => self.abort(),
        }
    }

    fn abort<T>(&self) -> Result<T> {
        self.cancel.cancel();
        Err(TransferError::Cancelled)
    }
}

fn placeholder(path: &Path) -> EntryInfo {
    EntryInfo {
        path: path.to_path_buf(),
        kind: EntryType::Other,
        size: 0,
        modified: None,
    }
}
