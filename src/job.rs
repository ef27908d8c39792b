//! Transfer jobs: validated source/target pairs plus the machinery to run them.
//!
//! Execution order:
//! 1. Move jobs try one rename per top-level pair; renamed pairs are done.
//! 2. The remaining sources are planned and their sizes summed.
//! 3. Optional free-space check against the first target's filesystem.
//! 4. The engine walks each planned tree.
//! 5. On success the confirmed top-level targets are reported, in input order.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::config::{Config, DEFAULT_PROGRESS_INTERVAL_MS};
use crate::engine::Engine;
use crate::errors::{Result, TransferError};
use crate::fs_ops::{CopyOptions, FileOps, LocalFs, format_bytes};
use crate::interaction::{Choice, Choices, InteractionPort};
use crate::node::TransferNode;
use crate::planner;
use crate::progress::{Progress, ProgressSink};

/// Result of planning without transferring (dry run).
#[derive(Debug, Clone)]
pub struct Plan {
    pub nodes: Vec<TransferNode>,
    pub total_size: u64,
}

impl Plan {
    pub fn entry_count(&self) -> usize {
        self.nodes.iter().map(TransferNode::count).sum()
    }
}

pub struct TransferJob {
    sources: Vec<PathBuf>,
    targets: Vec<PathBuf>,
    move_files: bool,
    ops: Arc<dyn FileOps>,
    cancel: CancelToken,
    check_free_space: bool,
    progress_interval: Duration,
}

impl std::fmt::Debug for TransferJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferJob")
            .field("sources", &self.sources)
            .field("targets", &self.targets)
            .field("move_files", &self.move_files)
            .field("check_free_space", &self.check_free_space)
            .finish_non_exhaustive()
    }
}

impl TransferJob {
    /// Build a job from index-aligned source and target lists.
    ///
    /// Root paths and targets nested inside their own source are rejected. When
    /// moving, pairs whose source and target are the same location are dropped.
    pub fn new(sources: Vec<PathBuf>, targets: Vec<PathBuf>, move_files: bool) -> Result<Self> {
        if sources.len() != targets.len() {
            return Err(TransferError::LengthMismatch {
                sources: sources.len(),
                targets: targets.len(),
            });
        }

        let mut kept_sources = Vec::with_capacity(sources.len());
        let mut kept_targets = Vec::with_capacity(targets.len());
        for (src, dst) in sources.into_iter().zip(targets) {
            ensure_endpoint(&src)?;
            ensure_endpoint(&dst)?;
            let (src_n, dst_n) = (normalize(&src), normalize(&dst));
            if src == dst || src_n == dst_n {
                if move_files {
                    debug!(path = %src.display(), "dropping move onto itself");
                    continue;
                }
            } else if dst_n.starts_with(&src_n) {
                return Err(TransferError::InvalidEndpoint {
                    path: dst,
                    reason: format!("target is inside source {}", src.display()),
                });
            }
            kept_sources.push(src);
            kept_targets.push(dst);
        }

        Ok(Self {
            sources: kept_sources,
            targets: kept_targets,
            move_files,
            ops: Arc::new(LocalFs::default()),
            cancel: CancelToken::new(),
            check_free_space: true,
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        })
    }

    /// Apply copy tunables and job settings from a `Config`.
    pub fn with_config(mut self, cfg: &Config) -> Self {
        self.ops = Arc::new(LocalFs::new(CopyOptions::from(cfg)));
        self.check_free_space = cfg.check_free_space;
        self.progress_interval = cfg.progress_interval;
        self
    }

    pub fn with_ops(mut self, ops: Arc<dyn FileOps>) -> Self {
        self.ops = ops;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_free_space_check(mut self, on: bool) -> Self {
        self.check_free_space = on;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_move(&self) -> bool {
        self.move_files
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.sources
            .iter()
            .map(PathBuf::as_path)
            .zip(self.targets.iter().map(PathBuf::as_path))
    }

    /// Plan every source without touching targets.
    pub fn plan(&self) -> Result<Plan> {
        let mut total = 0u64;
        let mut nodes = Vec::with_capacity(self.sources.len());
        for src in &self.sources {
            nodes.push(planner::collect(src, self.ops.as_ref(), &self.cancel, &mut total)?);
        }
        Ok(Plan { nodes, total_size: total })
    }

    /// Run the job on the calling thread and return the new top-level paths.
    pub fn run(&self, port: &dyn InteractionPort, sink: &dyn ProgressSink) -> Result<Vec<PathBuf>> {
        info!(pairs = self.len(), move_files = self.move_files, "Starting transfer");
        let mut engine = Engine::new(
            self.ops.as_ref(),
            port,
            sink,
            &self.cancel,
            self.move_files,
            Progress::new(self.progress_interval),
        );

        let mut confirmed: Vec<Option<PathBuf>> = vec![None; self.len()];
        let mut planned: Vec<(usize, TransferNode)> = Vec::new();
        let mut total = 0u64;

        for (i, (src, dst)) in self.pairs().enumerate() {
            self.cancel.check()?;
            if self.move_files
                && let Some(dest) = engine.fast_move(src, dst)?
            {
                confirmed[i] = Some(dest);
                continue;
            }
            let node = planner::collect(src, self.ops.as_ref(), &self.cancel, &mut total)?;
            planned.push((i, node));
        }
        engine.progress_mut().set_total(total);
        debug!(total_size = total, planned = planned.len(), "planning finished");

        if self.check_free_space && !planned.is_empty() {
            self.verify_destination(&engine, total)?;
        }

        for (i, node) in &planned {
            let target = &self.targets[*i];
            confirmed[*i] = engine.transfer(node, target, false)?;
            if let Some(dest) = &confirmed[*i] {
                info!(src = %node.source.display(), dest = %dest.display(), "Transferred");
            } else {
                info!(src = %node.source.display(), "Skipped");
            }
        }

        engine.progress_mut().set_total(total);
        let completed = engine.progress_mut().completed();
        if completed < total {
            engine.progress_mut().add(total - completed, sink);
        }
        engine.progress_mut().flush(sink);

        let new_files: Vec<PathBuf> = confirmed.into_iter().flatten().collect();
        sink.on_new_files(&new_files);
        info!(new_files = new_files.len(), "Transfer finished");
        Ok(new_files)
    }

    // Ask before starting when the destination reports less free space than needed.
    fn verify_destination(&self, engine: &Engine<'_>, required: u64) -> Result<()> {
        let Some(first) = self.targets.first() else {
            return Ok(());
        };
        let probe = first.parent().unwrap_or(first);
        let Some(available) = self.ops.available_space(probe) else {
            debug!(path = %probe.display(), "free space unknown; not checking");
            return Ok(());
        };
        if available >= required {
            return Ok(());
        }
        warn!(required, available, dest = %probe.display(), "destination may be too small");
        let message = format!(
            "Only {} of space is free on the destination, but {} are needed.\n\nDo you want to proceed?",
            format_bytes(available),
            format_bytes(required)
        );
        match engine.port().ask(&message, Choices::CONFIRM) {
            Choice::Yes | Choice::YesToAll | Choice::Force => Ok(()),
            _ => {
                self.cancel.cancel();
                Err(TransferError::Cancelled)
            }
        }
    }

    /// Run the job on a dedicated worker thread.
    pub fn spawn<P, S>(self, port: P, sink: S) -> io::Result<JobHandle>
    where
        P: InteractionPort + 'static,
        S: ProgressSink + 'static,
    {
        let cancel = self.cancel.clone();
        let thread = thread::Builder::new()
            .name("xfer-worker".into())
            .spawn(move || JobOutcome::from(self.run(&port, &sink)))?;
        Ok(JobHandle { cancel, thread })
    }
}

/// How a job ended. Cancellation is an expected outcome, not a failure.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Vec<PathBuf>),
    Cancelled,
    Failed(TransferError),
}

impl From<Result<Vec<PathBuf>>> for JobOutcome {
    fn from(res: Result<Vec<PathBuf>>) -> Self {
        match res {
            Ok(files) => JobOutcome::Completed(files),
            Err(TransferError::Cancelled) => {
                info!("Transfer cancelled");
                JobOutcome::Cancelled
            }
            Err(e) => {
                error!(code = e.code(), kind = ?e.kind(), error = %e, "Transfer failed");
                JobOutcome::Failed(e)
            }
        }
    }
}

/// Handle to a job running on its worker thread.
#[derive(Debug)]
pub struct JobHandle {
    cancel: CancelToken,
    thread: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Hold the worker at its next check point (between entries or inside a
    /// file copy) until `resume` or `cancel`.
    pub fn pause(&self) {
        self.cancel.pause();
    }

    pub fn resume(&self) {
        self.cancel.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.cancel.is_paused()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker; a panic on the worker is reported as a failure.
    pub fn join(self) -> JobOutcome {
        self.thread.join().unwrap_or_else(|_| {
            JobOutcome::Failed(TransferError::Io {
                op: "join",
                path: PathBuf::new(),
                message: "transfer worker panicked".into(),
                source: io::Error::other("worker panicked"),
            })
        })
    }
}

fn ensure_endpoint(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(TransferError::InvalidEndpoint {
            path: path.to_path_buf(),
            reason: "empty path".into(),
        });
    }
    let resolved = normalize(path);
    if resolved.parent().is_none() || path.parent().is_none() {
        return Err(TransferError::InvalidEndpoint {
            path: path.to_path_buf(),
            reason: "filesystem root".into(),
        });
    }
    Ok(())
}

// Canonical form when the path (or its parent) exists; the path itself otherwise.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(p) = dunce::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => dunce::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
