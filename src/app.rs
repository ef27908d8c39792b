//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the Ctrl-C handler, maps
//! the command line onto source/target pairs and runs the transfer job.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use xfer::config::{CONFIG_ENV, create_template_config};
use xfer::fs_ops::format_bytes;
use xfer::interaction;
use xfer::output as out;
use xfer::progress::progress_channel;
use xfer::{AutoPort, CancelToken, Config, JobOutcome, TransferJob, default_config_path, load_config};

use crate::cli::Args;
use crate::logging::init_tracing;
use crate::prompt;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        return print_config();
    }

    // Build config (may read XML). CLI args override config values.
    let mut cfg = match load_config()? {
        Some((cfg, _path)) => cfg,
        None => Config::default(),
    };
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    // Hold the guard until the end of `run` so file logs are flushed.
    let _guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .context("failed to initialize logging")?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            out::print_warn("Received interrupt; cancelling...");
            cancel.cancel();
        })
        .context("failed to install signal handler")?;
    }

    debug!("Starting xfer: {:?}", args);

    let Some((sources, target)) = args.endpoints() else {
        bail!("expected at least one SOURCE and a TARGET");
    };
    let targets = map_targets(sources, target)?;
    let job = TransferJob::new(sources.to_vec(), targets, args.move_files)?
        .with_config(&cfg)
        .with_cancel_token(cancel);

    if job.is_empty() {
        out::print_info("Nothing to do.");
        return Ok(());
    }

    if args.dry_run {
        return dry_run(&job);
    }

    let (sink, events) = progress_channel();
    let (port, prompts) = interaction::channel();
    let interactive = !args.headless() && atty::is(atty::Stream::Stdin);
    let handle = if interactive {
        job.spawn(port, sink)?
    } else {
        drop(port);
        let auto = AutoPort {
            on_conflict: cfg.on_conflict,
            on_error: cfg.on_error,
            proceed: true,
        };
        job.spawn(auto, sink)?
    };

    prompt::serve(&handle, &prompts, &events);

    match handle.join() {
        JobOutcome::Completed(files) => {
            for f in &files {
                out::print_user(&f.display().to_string());
            }
            out::print_success(&format!("{} item(s) transferred", files.len()));
            Ok(())
        }
        JobOutcome::Cancelled => {
            out::print_warn("Transfer cancelled");
            Ok(())
        }
        JobOutcome::Failed(e) => Err(e.into()),
    }
}

fn print_config() -> Result<()> {
    if let Some(cfg_env) = std::env::var_os(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {}\n", PathBuf::from(cfg_env).display()));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return Ok(());
    }
    let path = default_config_path().context("could not determine a default config path")?;
    out::print_info(&format!("Default xfer config path:\n  {}\n", path.display()));
    if path.exists() {
        out::print_info("A config file already exists at that location.");
    } else {
        create_template_config(&path)?;
        out::print_success(&format!("A template config was written to: {}", path.display()));
    }
    Ok(())
}

/// One source onto a path that is not a directory lands at that path; anything
/// else lands inside the target directory under its own name.
fn map_targets(sources: &[PathBuf], target: &Path) -> Result<Vec<PathBuf>> {
    if sources.len() == 1 && !target.is_dir() {
        return Ok(vec![target.to_path_buf()]);
    }
    if !target.is_dir() {
        bail!("target '{}' is not a directory", target.display());
    }
    sources
        .iter()
        .map(|src| {
            let name = src
                .file_name()
                .with_context(|| format!("source '{}' has no file name", src.display()))?;
            Ok(target.join(name))
        })
        .collect()
}

fn dry_run(job: &TransferJob) -> Result<()> {
    let plan = job.plan()?;
    let verb = if job.is_move() { "move" } else { "copy" };
    for (src, dst) in job.pairs() {
        out::print_user(&format!("would {verb} '{}' -> '{}'", src.display(), dst.display()));
    }
    out::print_info(&format!(
        "Dry-run: {} entries, {} total",
        plan.entry_count(),
        format_bytes(plan.total_size)
    ));
    info!(entries = plan.entry_count(), total_size = plan.total_size, "Dry-run finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn single_source_onto_new_path_keeps_the_path() {
        let dir = tempdir().unwrap();
        let t = dir.path().join("new");
        let out = map_targets(&[PathBuf::from("/a/f")], &t).unwrap();
        assert_eq!(out, vec![t]);
    }

    #[test]
    fn sources_land_inside_existing_directory() {
        let dir = tempdir().unwrap();
        let out = map_targets(&[PathBuf::from("/a/f"), PathBuf::from("/b/g")], dir.path()).unwrap();
        assert_eq!(out, vec![dir.path().join("f"), dir.path().join("g")]);
    }

    #[test]
    fn several_sources_need_a_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(map_targets(&[PathBuf::from("/a/f"), PathBuf::from("/b/g")], &missing).is_err());
    }
}
