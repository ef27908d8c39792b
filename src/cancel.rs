//! Cooperative cancellation and pausing.
//!
//! A `CancelToken` is a cloneable handle over two shared flags. The controlling
//! context (Ctrl-C handler, UI, test) calls `cancel()`, `pause()` or `resume()`;
//! the worker polls `check()` while planning, between engine steps and inside
//! the byte-copy loop. While paused, `check()` parks the worker until it is
//! resumed or cancelled.
//!
//! Notes:
//! - Relaxed atomics are sufficient for one-way "stop" and level "hold" flags.
//! - `cancel()` is safe to call from signal handlers and wakes a paused worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::errors::{Result, TransferError};

const PAUSE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent).
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Hold the worker at its next check point.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Block while paused; returns early once cancelled.
    pub fn wait_while_paused(&self) {
        while self.is_paused() && !self.is_cancelled() {
            thread::sleep(PAUSE_POLL);
        }
    }

    /// Wait out a pause, then `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        self.wait_while_paused();
        if self.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }
}
