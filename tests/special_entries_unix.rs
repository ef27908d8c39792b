#![cfg(unix)]

use filetime::FileTime;
use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, PermissionsExt, symlink};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use xfer::{AutoPort, Config, CopyOptions, LocalFs, NullSink, TransferJob};

fn mkfifo(path: &Path) {
    let c = CString::new(path.as_os_str().as_bytes()).unwrap();
    let rc = unsafe { libc::mkfifo(c.as_ptr(), 0o640) };
    assert_eq!(rc, 0, "mkfifo failed");
}

#[test]
fn symlinks_are_recreated_not_followed() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let link = src.path().join("dangling");
    symlink("nowhere/at/all", &link)?;
    let target = dst.path().join("dangling");

    let job = TransferJob::new(vec![link.clone()], vec![target.clone()], false)?;
    job.run(&AutoPort::default(), &NullSink)?;

    let meta = fs::symlink_metadata(&target)?;
    assert!(meta.file_type().is_symlink());
    assert_eq!(fs::read_link(&target)?, Path::new("nowhere/at/all"));
    Ok(())
}

#[test]
fn fifos_are_recreated() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let d = src.path().join("d");
    fs::create_dir(&d)?;
    mkfifo(&d.join("pipe"));

    let target = dst.path().join("d");
    let job = TransferJob::new(vec![d], vec![target.clone()], false)?;
    job.run(&AutoPort::default(), &NullSink)?;

    assert!(fs::symlink_metadata(target.join("pipe"))?.file_type().is_fifo());
    Ok(())
}

#[test]
fn permissions_are_preserved_by_default() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let d = src.path().join("d");
    fs::create_dir(&d)?;
    let a = d.join("a");
    let b = d.join("b");
    fs::write(&a, b"a")?;
    fs::write(&b, b"b")?;
    fs::set_permissions(&a, fs::Permissions::from_mode(0o600))?;
    fs::set_permissions(&b, fs::Permissions::from_mode(0o644))?;
    fs::set_permissions(&d, fs::Permissions::from_mode(0o750))?;

    let target = dst.path().join("d");
    let job = TransferJob::new(vec![d], vec![target.clone()], false)?;
    job.run(&AutoPort::default(), &NullSink)?;

    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&target.join("a")), 0o600);
    assert_eq!(mode(&target.join("b")), 0o644);
    assert_eq!(mode(&target), 0o750);
    Ok(())
}

#[test]
fn timestamps_follow_config() -> Result<(), Box<dyn std::error::Error>> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let f = src.path().join("f");
    fs::write(&f, b"x")?;
    let old = FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_times(&f, old, old)?;

    let cfg = Config {
        preserve_timestamps: true,
        ..Config::default()
    };
    let kept = dst.path().join("kept");
    TransferJob::new(vec![f.clone()], vec![kept.clone()], false)?
        .with_config(&cfg)
        .run(&AutoPort::default(), &NullSink)?;
    let mtime = FileTime::from_last_modification_time(&fs::metadata(&kept)?);
    assert_eq!(mtime, old);

    let fresh = dst.path().join("fresh");
    let plain = LocalFs::new(CopyOptions::default());
    TransferJob::new(vec![f], vec![fresh.clone()], false)?
        .with_ops(Arc::new(plain))
        .run(&AutoPort::default(), &NullSink)?;
    let mtime = FileTime::from_last_modification_time(&fs::metadata(&fresh)?);
    assert_ne!(mtime, old);
    Ok(())
}
