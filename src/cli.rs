//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - The last positional path is the TARGET; all earlier ones are SOURCES.
//! - --debug is a shorthand for --log-level debug.
//! - --yes, --skip-existing and --rename-existing conflict; any one implies no
//!   collision prompts.

use clap::{ArgAction, Parser, ValueHint};
use std::path::PathBuf;

use xfer::{Config, ConflictPolicy, ErrorPolicy, LogLevel};

/// Copy or move files and directory trees.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Copy or move files and directory trees with collision prompts")]
pub struct Args {
    /// Sources followed by the target.
    #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath, num_args = 1.., action = ArgAction::Append)]
    pub paths: Vec<PathBuf>,

    /// Move instead of copy.
    #[arg(short = 'm', long = "move", help = "Move instead of copy")]
    pub move_files: bool,

    /// Overwrite every existing target without asking.
    #[arg(short = 'y', long, conflicts_with = "skip_existing", help = "Overwrite existing targets without asking")]
    pub yes: bool,

    /// Keep every existing target without asking.
    #[arg(long, help = "Skip sources whose target already exists")]
    pub skip_existing: bool,

    /// Keep both: copy colliding sources under a fresh "copy of" name.
    #[arg(
        long,
        conflicts_with_all = ["yes", "skip_existing"],
        help = "Copy onto a new 'copy of' name when the target already exists"
    )]
    pub rename_existing: bool,

    /// Never prompt: conflicts and errors follow the configured policies.
    #[arg(long, help = "Never prompt; use on_conflict/on_error from the config")]
    pub no_prompt: bool,

    /// Plan only and print what would be transferred.
    #[arg(long, help = "Show what would be transferred, but do not modify anything")]
    pub dry_run: bool,

    /// Copy chunk size in bytes.
    #[arg(long, value_name = "BYTES", help = "Bytes per copy chunk (4096..=67108864)")]
    pub buffer_size: Option<usize>,

    /// Skip the free-space check before starting.
    #[arg(long, help = "Do not check free space on the destination first")]
    pub no_space_check: bool,

    /// Copy access/modification times as well as permissions.
    #[arg(long, help = "Preserve access and modification times")]
    pub preserve_timestamps: bool,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where xfer will look for the config file, then exit.
    #[arg(long, help = "Print the config file location used by xfer and exit")]
    pub print_config: bool,
}

impl Args {
    /// Split positionals into (sources, target). `None` unless at least two paths were given.
    pub fn endpoints(&self) -> Option<(&[PathBuf], &PathBuf)> {
        match self.paths.split_last() {
            Some((target, sources)) if !sources.is_empty() => Some((sources, target)),
            _ => None,
        }
    }

    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// True when collisions and errors are answered without a terminal.
    pub fn headless(&self) -> bool {
        self.no_prompt || self.yes || self.skip_existing || self.rename_existing
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(n) = self.buffer_size {
            cfg.buffer_size = n;
        }
        if self.no_space_check {
            cfg.check_free_space = false;
        }
        if self.preserve_timestamps {
            cfg.preserve_timestamps = true;
        }
        if self.yes {
            cfg.on_conflict = ConflictPolicy::Overwrite;
        }
        if self.skip_existing {
            cfg.on_conflict = ConflictPolicy::Skip;
        }
        if self.rename_existing {
            cfg.on_conflict = ConflictPolicy::Rename;
        }
        if self.headless() && cfg.on_error == ErrorPolicy::Ask {
            cfg.on_error = ErrorPolicy::Skip;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
