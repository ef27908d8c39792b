mod support;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tempfile::tempdir;

use support::counter;
use xfer::{
    AutoPort, CancelToken, Choice, Choices, ConflictPolicy, FnPort, NullSink, Question, TransferError, TransferJob,
};

fn three_collisions() -> (tempfile::TempDir, tempfile::TempDir, Vec<PathBuf>, Vec<PathBuf>) {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let mut sources = Vec::new();
    let mut targets = Vec::new();
    for n in ["a", "b", "c"] {
        let s = src.path().join(n);
        let t = dst.path().join(n);
        fs::write(&s, b"new").unwrap();
        fs::write(&t, b"old").unwrap();
        sources.push(s);
        targets.push(t);
    }
    (src, dst, sources, targets)
}

#[test]
fn yes_to_all_is_asked_once_and_overwrites_everything() {
    let (_src, _dst, sources, targets) = three_collisions();
    let asked = counter();
    let seen = asked.clone();
    let port = FnPort(move |q: &Question| {
        assert!(matches!(q, Question::Replace { .. }));
        seen.fetch_add(1, Ordering::SeqCst);
        Choice::YesToAll
    });

    let job = TransferJob::new(sources, targets.clone(), false).unwrap();
    let out = job.run(&port, &NullSink).unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(out, targets);
    for t in &targets {
        assert_eq!(fs::read(t).unwrap(), b"new");
    }
}

#[test]
fn no_to_all_is_asked_once_and_keeps_everything() {
    let (_src, _dst, sources, targets) = three_collisions();
    let asked = counter();
    let seen = asked.clone();
    let port = FnPort(move |_: &Question| {
        seen.fetch_add(1, Ordering::SeqCst);
        Choice::NoToAll
    });

    let job = TransferJob::new(sources, targets.clone(), false).unwrap();
    let out = job.run(&port, &NullSink).unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert!(out.is_empty(), "skipped pairs are not new files");
    for t in &targets {
        assert_eq!(fs::read(t).unwrap(), b"old");
    }
}

#[test]
fn plain_yes_is_asked_per_collision() {
    let (_src, _dst, sources, targets) = three_collisions();
    let asked = counter();
    let seen = asked.clone();
    let port = FnPort(move |_: &Question| {
        seen.fetch_add(1, Ordering::SeqCst);
        Choice::Yes
    });

    let job = TransferJob::new(sources, targets, false).unwrap();
    job.run(&port, &NullSink).unwrap();
    assert_eq!(asked.load(Ordering::SeqCst), 3);
}

#[test]
fn cancel_at_collision_aborts_and_sets_the_token() {
    let (_src, _dst, sources, targets) = three_collisions();
    let port = FnPort(|q: &Question| {
        assert_eq!(q.choices(), Choices::REPLACE);
        Choice::Cancel
    });
    let token = CancelToken::new();

    let job = TransferJob::new(sources, targets.clone(), false)
        .unwrap()
        .with_cancel_token(token.clone());
    let err = job.run(&port, &NullSink).unwrap_err();

    assert!(matches!(err, TransferError::Cancelled));
    assert!(token.is_cancelled());
    assert_eq!(fs::read(&targets[0]).unwrap(), b"old");
}

#[test]
fn keep_both_copies_under_a_fresh_name() {
    let (_src, dst, sources, targets) = three_collisions();
    let asked = counter();
    let seen = asked.clone();
    let port = FnPort(move |q: &Question| {
        assert!(q.choices().contains(Choice::Rename));
        seen.fetch_add(1, Ordering::SeqCst);
        Choice::Rename
    });

    let job = TransferJob::new(sources, targets.clone(), false).unwrap();
    let out = job.run(&port, &NullSink).unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 3);
    let renamed: Vec<PathBuf> = ["a", "b", "c"]
        .iter()
        .map(|n| dst.path().join(format!("copy of {n}")))
        .collect();
    assert_eq!(out, renamed);
    for (old, new) in targets.iter().zip(&renamed) {
        assert_eq!(fs::read(old).unwrap(), b"old");
        assert_eq!(fs::read(new).unwrap(), b"new");
    }
}

#[test]
fn rename_all_is_asked_once_and_skips_taken_names() {
    let (_src, dst, sources, targets) = three_collisions();
    fs::write(dst.path().join("copy of b"), b"older").unwrap();
    let asked = counter();
    let seen = asked.clone();
    let port = FnPort(move |_: &Question| {
        seen.fetch_add(1, Ordering::SeqCst);
        Choice::RenameAll
    });

    let job = TransferJob::new(sources, targets, false).unwrap();
    let out = job.run(&port, &NullSink).unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(
        out,
        vec![
            dst.path().join("copy of a"),
            dst.path().join("another copy of b"),
            dst.path().join("copy of c"),
        ]
    );
    assert_eq!(fs::read(dst.path().join("copy of b")).unwrap(), b"older");
    assert_eq!(fs::read(dst.path().join("another copy of b")).unwrap(), b"new");
}

#[test]
fn headless_rename_policy_keeps_both() {
    let (_src, dst, sources, targets) = three_collisions();
    let port = AutoPort {
        on_conflict: ConflictPolicy::Rename,
        ..AutoPort::default()
    };

    let job = TransferJob::new(sources, targets, false).unwrap();
    let out = job.run(&port, &NullSink).unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(fs::read(dst.path().join("copy of c")).unwrap(), b"new");
    assert_eq!(fs::read(dst.path().join("c")).unwrap(), b"old");
}

#[test]
fn renamed_directory_receives_its_children() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let d = src.path().join("d");
    fs::create_dir(&d).unwrap();
    fs::write(d.join("x"), b"x").unwrap();
    // a plain file is in the way of the directory
    fs::write(dst.path().join("d"), b"file").unwrap();

    let job = TransferJob::new(vec![d], vec![dst.path().join("d")], false).unwrap();
    let out = job.run(&FnPort(|_: &Question| Choice::Rename), &NullSink).unwrap();

    let renamed = dst.path().join("copy of d");
    assert_eq!(out, vec![renamed.clone()]);
    assert_eq!(fs::read(renamed.join("x")).unwrap(), b"x");
    assert_eq!(fs::read(dst.path().join("d")).unwrap(), b"file");
}
