mod support;

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

use support::{Instrumented, shared};
use xfer::interaction::channel;
use xfer::{
    AutoPort, CancelToken, Choice, JobOutcome, NullSink, ProgressSink, Question, TransferError,
    TransferJob,
};

/// Cancels the job as soon as any bytes have been reported.
struct CancelOnProgress(CancelToken);

impl ProgressSink for CancelOnProgress {
    fn on_progress(&self, percent: f64) {
        if percent > 0.0 {
            self.0.cancel();
        }
    }
}

/// Pauses the job once, as soon as any bytes have been reported.
struct PauseOnProgress {
    token: CancelToken,
    paused: AtomicBool,
    tx: Sender<()>,
}

impl ProgressSink for PauseOnProgress {
    fn on_progress(&self, percent: f64) {
        if percent > 0.0 && !self.paused.swap(true, Ordering::SeqCst) {
            self.token.pause();
            let _ = self.tx.send(());
        }
    }
}

#[test]
fn cancel_mid_copy_leaves_no_partial_target() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let f = src.path().join("big.bin");
    fs::write(&f, vec![42u8; 256 * 1024]).unwrap();
    let target = dst.path().join("big.bin");

    let token = CancelToken::new();
    let job = TransferJob::new(vec![f.clone()], vec![target.clone()], false)
        .unwrap()
        .with_ops(shared(Instrumented::with_buffer(4096)))
        .with_cancel_token(token.clone())
        .with_progress_interval(Duration::ZERO);

    let err = job.run(&AutoPort::default(), &CancelOnProgress(token.clone())).unwrap_err();
    assert!(matches!(err, TransferError::Cancelled));
    assert!(!target.exists(), "partial file must be removed");
    assert!(f.exists());
}

#[test]
fn cancelled_token_stops_before_any_work() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let f = src.path().join("f");
    fs::write(&f, b"x").unwrap();

    let ops = shared(Instrumented::new());
    let job = TransferJob::new(vec![f], vec![dst.path().join("f")], false)
        .unwrap()
        .with_ops(ops.clone());
    job.cancel_token().cancel();

    assert!(job.run(&AutoPort::default(), &NullSink).unwrap_err().is_cancelled());
    assert_eq!(ops.copies(), 0);
    assert_eq!(ops.listings(), 0);
}

#[test]
fn worker_thread_waits_on_prompts() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let f = src.path().join("f");
    let target = dst.path().join("f");
    fs::write(&f, b"new").unwrap();
    fs::write(&target, b"old").unwrap();

    let (port, prompts) = channel();
    let job = TransferJob::new(vec![f], vec![target.clone()], false).unwrap();
    let handle = job.spawn(port, NullSink).unwrap();

    let prompt = prompts.recv().expect("collision prompt");
    assert!(matches!(prompt.question(), Question::Replace { .. }));
    assert!(!handle.is_finished());
    prompt.respond(Choice::Yes);

    match handle.join() {
        JobOutcome::Completed(files) => assert_eq!(files, vec![target.clone()]),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fs::read(target).unwrap(), b"new");
}

#[test]
fn dropped_prompt_reports_cancelled_outcome() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let f = src.path().join("f");
    let target = dst.path().join("f");
    fs::write(&f, b"new").unwrap();
    fs::write(&target, b"old").unwrap();

    let (port, prompts) = channel();
    let job = TransferJob::new(vec![f], vec![target.clone()], false).unwrap();
    let handle = job.spawn(port, NullSink).unwrap();
    let token = handle.cancel_token();

    drop(prompts.recv().expect("collision prompt"));

    assert!(matches!(handle.join(), JobOutcome::Cancelled));
    assert!(token.is_cancelled());
    assert_eq!(fs::read(target).unwrap(), b"old");
}

#[test]
fn paused_job_waits_until_resumed() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let f = src.path().join("f");
    fs::write(&f, b"x").unwrap();
    let target = dst.path().join("f");

    let ops = shared(Instrumented::new());
    let token = CancelToken::new();
    token.pause();
    let job = TransferJob::new(vec![f], vec![target.clone()], false)
        .unwrap()
        .with_ops(ops.clone())
        .with_cancel_token(token);
    let handle = job.spawn(AutoPort::default(), NullSink).unwrap();

    thread::sleep(Duration::from_millis(200));
    assert!(handle.is_paused());
    assert!(!handle.is_finished());
    assert_eq!(ops.copies(), 0);

    handle.resume();
    match handle.join() {
        JobOutcome::Completed(files) => assert_eq!(files, vec![target.clone()]),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fs::read(target).unwrap(), b"x");
}

#[test]
fn pause_holds_a_copy_mid_file() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let f = src.path().join("big.bin");
    fs::write(&f, vec![7u8; 256 * 1024]).unwrap();
    let target = dst.path().join("big.bin");

    let token = CancelToken::new();
    let (tx, paused) = mpsc::channel();
    let sink = PauseOnProgress {
        token: token.clone(),
        paused: AtomicBool::new(false),
        tx,
    };
    let job = TransferJob::new(vec![f.clone()], vec![target.clone()], false)
        .unwrap()
        .with_ops(shared(Instrumented::with_buffer(4096)))
        .with_cancel_token(token)
        .with_progress_interval(Duration::ZERO);
    let handle = job.spawn(AutoPort::default(), sink).unwrap();

    paused.recv_timeout(Duration::from_secs(10)).expect("job paused");
    thread::sleep(Duration::from_millis(200));
    assert!(!handle.is_finished());
    let partial = fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
    assert!(partial < 256 * 1024, "copy kept going while paused");

    handle.resume();
    assert!(matches!(handle.join(), JobOutcome::Completed(_)));
    assert_eq!(fs::read(target).unwrap(), fs::read(f).unwrap());
}
