//! Progress notifications.
//!
//! `ProgressSink` receives percentage updates, transfer rate and time left, the
//! name of the entry being worked on, and once per successful job the list of
//! new top-level paths. `Progress` owns the byte counters of one job, throttles
//! percentage events and keeps a smoothed bytes/sec estimate.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Minimum spacing between two rate samples.
const RATE_WINDOW: Duration = Duration::from_millis(500);
/// Weight of the running average against one new sample.
const RATE_SMOOTHING: u64 = 10;

pub trait ProgressSink: Send {
    fn on_progress(&self, _percent: f64) {}
    /// Sent right after each `on_progress`.
    fn on_throughput(&self, _status: &Throughput) {}
    fn on_current_item(&self, _name: &str) {}
    fn on_new_files(&self, _files: &[PathBuf]) {}
}

impl<T: ProgressSink + Sync + ?Sized> ProgressSink for Arc<T> {
    fn on_progress(&self, percent: f64) {
        (**self).on_progress(percent)
    }
    fn on_throughput(&self, status: &Throughput) {
        (**self).on_throughput(status)
    }
    fn on_current_item(&self, name: &str) {
        (**self).on_current_item(name)
    }
    fn on_new_files(&self, files: &[PathBuf]) {
        (**self).on_new_files(files)
    }
}

/// Byte counters plus the smoothed rate at one point of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Throughput {
    pub completed: u64,
    pub total: u64,
    /// Zero until the first full sample window has passed.
    pub bytes_per_sec: u64,
    pub remaining: Option<Duration>,
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, percent: f64) {
        trace!(percent = format!("{percent:.1}"), "progress");
    }
    fn on_throughput(&self, status: &Throughput) {
        trace!(
            completed = status.completed,
            total = status.total,
            bytes_per_sec = status.bytes_per_sec,
            remaining_secs = status.remaining.map(|d| d.as_secs()),
            "throughput"
        );
    }
    fn on_current_item(&self, name: &str) {
        debug!(item = name, "transferring");
    }
    fn on_new_files(&self, files: &[PathBuf]) {
        debug!(count = files.len(), "new files ready");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Progress(f64),
    Throughput(Throughput),
    CurrentItem(String),
    NewFiles(Vec<PathBuf>),
}

/// Forwards notifications over an mpsc channel; a closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<ProgressEvent>,
}

pub fn progress_channel() -> (ChannelSink, Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::channel();
    (ChannelSink { tx }, rx)
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, percent: f64) {
        let _ = self.tx.send(ProgressEvent::Progress(percent));
    }
    fn on_throughput(&self, status: &Throughput) {
        let _ = self.tx.send(ProgressEvent::Throughput(*status));
    }
    fn on_current_item(&self, name: &str) {
        let _ = self.tx.send(ProgressEvent::CurrentItem(name.to_string()));
    }
    fn on_new_files(&self, files: &[PathBuf]) {
        let _ = self.tx.send(ProgressEvent::NewFiles(files.to_vec()));
    }
}

/// `completed * 100 / max(total, 1)`, clamped to 0..=100.
pub fn percent(completed: u64, total: u64) -> f64 {
    let pct = completed as f64 * 100.0 / total.max(1) as f64;
    pct.clamp(0.0, 100.0)
}

/// Byte counters of one job. Both counters only ever grow.
#[derive(Debug)]
pub struct Progress {
    total: u64,
    completed: u64,
    /// Most bytes credited for the current entry over all of its attempts.
    entry_done: u64,
    interval: Duration,
    last_emit: Option<Instant>,
    rate: u64,
    sampled_at: Instant,
    sampled_bytes: u64,
}

impl Progress {
    pub fn new(interval: Duration) -> Self {
        Self {
            total: 0,
            completed: 0,
            entry_done: 0,
            interval,
            last_emit: None,
            rate: 0,
            sampled_at: Instant::now(),
            sampled_bytes: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = self.total.max(total);
    }

    pub fn percent(&self) -> f64 {
        percent(self.completed, self.total)
    }

    /// Smoothed bytes per second; zero before the first sample.
    pub fn rate(&self) -> u64 {
        self.rate
    }

    pub fn throughput(&self) -> Throughput {
        let remaining = (self.rate > 0)
            .then(|| Duration::from_secs(self.total.saturating_sub(self.completed) / self.rate));
        Throughput {
            completed: self.completed,
            total: self.total,
            bytes_per_sec: self.rate,
            remaining,
        }
    }

    /// Start copying a new entry. Retries of the same entry keep its mark.
    pub fn begin_entry(&mut self) {
        self.entry_done = 0;
    }

    /// The current attempt has `done` bytes written so far. Only bytes past the
    /// entry's high-water mark are credited, so a retry that starts over does
    /// not count the same bytes twice.
    pub fn advance_entry(&mut self, done: u64, sink: &dyn ProgressSink) {
        if done > self.entry_done {
            self.completed += done - self.entry_done;
            self.entry_done = done;
        }
        self.emit(sink, false);
    }

    /// The current entry of `size` bytes was skipped; credit what is left of it.
    pub fn skip_entry(&mut self, size: u64, sink: &dyn ProgressSink) {
        self.advance_entry(size, sink);
    }

    /// Credit bytes that were handled without copying (fast move, skipped subtree).
    pub fn add(&mut self, bytes: u64, sink: &dyn ProgressSink) {
        self.completed += bytes;
        self.emit(sink, false);
    }

    /// Emit unconditionally.
    pub fn flush(&mut self, sink: &dyn ProgressSink) {
        self.emit(sink, true);
    }

    fn emit(&mut self, sink: &dyn ProgressSink, force: bool) {
        let now = Instant::now();
        let due = match self.last_emit {
            None => true,
            Some(at) => now.duration_since(at) >= self.interval,
        };
        if force || due {
            self.last_emit = Some(now);
            self.sample_at(now);
            sink.on_progress(self.percent());
            sink.on_throughput(&self.throughput());
        }
    }

    // Fold the bytes moved since the last sample into the running average.
    fn sample_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.sampled_at);
        if elapsed < RATE_WINDOW {
            return;
        }
        let moved = self.completed.saturating_sub(self.sampled_bytes);
        let current = (moved as f64 / elapsed.as_secs_f64()) as u64;
        self.rate = if self.rate > 0 {
            (self.rate.saturating_mul(RATE_SMOOTHING) + current) / (RATE_SMOOTHING + 1)
        } else {
            current
        };
        self.sampled_at = now;
        self.sampled_bytes = self.completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<f64>>);

    impl ProgressSink for Recorder {
        fn on_progress(&self, percent: f64) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn percent_is_clamped_and_safe_for_zero_total() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(5, 0), 100.0);
        assert_eq!(percent(5, 10), 50.0);
        assert_eq!(percent(20, 10), 100.0);
    }

    #[test]
    fn retried_entry_credits_each_byte_once() {
        let sink = NullSink;
        let mut p = Progress::new(Duration::ZERO);
        p.set_total(100);
        p.begin_entry();
        p.advance_entry(30, &sink);
        p.advance_entry(30, &sink);
        assert_eq!(p.completed(), 30);

        // second attempt starts over from byte zero
        p.advance_entry(10, &sink);
        assert_eq!(p.completed(), 30);
        p.advance_entry(50, &sink);
        assert_eq!(p.completed(), 50);

        p.skip_entry(60, &sink);
        assert_eq!(p.completed(), 60);

        p.begin_entry();
        p.skip_entry(40, &sink);
        assert_eq!(p.completed(), p.total());
    }

    #[test]
    fn rate_is_smoothed_over_samples() {
        let t0 = Instant::now();
        let mut p = Progress::new(Duration::ZERO);
        p.set_total(100_000);
        p.sampled_at = t0;
        assert_eq!(p.throughput().remaining, None);

        p.completed = 1000;
        p.sample_at(t0 + Duration::from_secs(1));
        assert_eq!(p.rate(), 1000);

        p.completed = 3200;
        p.sample_at(t0 + Duration::from_secs(2));
        assert_eq!(p.rate(), (1000 * 10 + 2200) / 11);

        // inside the window: no new sample
        p.completed = 90_000;
        p.sample_at(t0 + Duration::from_millis(2100));
        assert_eq!(p.rate(), 1109);

        let status = p.throughput();
        assert_eq!(status.bytes_per_sec, 1109);
        assert_eq!(status.remaining, Some(Duration::from_secs(10_000 / 1109)));
    }

    #[test]
    fn shared_sinks_forward_through_arc() {
        let rec = Arc::new(Recorder::default());
        let shared: Arc<dyn ProgressSink + Sync> = rec.clone();
        let mut p = Progress::new(Duration::ZERO);
        p.set_total(4);
        p.add(4, &shared);
        p.add(0, &LogSink);
        assert_eq!(*rec.0.lock().unwrap(), vec![100.0]);
    }

    #[test]
    fn throttle_lets_first_and_forced_events_through() {
        let rec = Recorder::default();
        let mut p = Progress::new(Duration::from_secs(3600));
        p.set_total(10);
        p.add(1, &rec);
        p.add(1, &rec);
        p.add(1, &rec);
        p.flush(&rec);
        let seen = rec.0.lock().unwrap().clone();
        assert_eq!(seen, vec![10.0, 30.0]);
    }

    #[test]
    fn channel_sink_forwards_events() {
        let (sink, rx) = progress_channel();
        sink.on_current_item("f");
        sink.on_throughput(&Throughput {
            completed: 1,
            total: 2,
            bytes_per_sec: 1,
            remaining: Some(Duration::from_secs(1)),
        });
        sink.on_new_files(&[PathBuf::from("/x")]);
        assert_eq!(rx.recv().unwrap(), ProgressEvent::CurrentItem("f".into()));
        assert!(matches!(rx.recv().unwrap(), ProgressEvent::Throughput(t) if t.total == 2));
        assert_eq!(rx.recv().unwrap(), ProgressEvent::NewFiles(vec![PathBuf::from("/x")]));
    }
}
