//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel and the policy enums parse from the strings used in XML and on the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::DEFAULT_BUFFER_SIZE;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Post-write flush behaviour for copied files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// Data reaches the page cache; no disk barrier.
    #[default]
    Data,
    /// `sync_all` every written file.
    Full,
}

impl FromStr for Durability {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data" | "fast" => Ok(Durability::Data),
            "full" | "sync" => Ok(Durability::Full),
            _ => Err(format!("invalid durability: '{s}' (expected data|full)")),
        }
    }
}

/// Answer used for collisions when nobody is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    #[default]
    Ask,
    Overwrite,
    /// Copy under the next free "copy of" name.
    Rename,
    Skip,
    Cancel,
}

impl FromStr for ConflictPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(ConflictPolicy::Ask),
            "overwrite" | "replace" => Ok(ConflictPolicy::Overwrite),
            "rename" => Ok(ConflictPolicy::Rename),
            "skip" => Ok(ConflictPolicy::Skip),
            "cancel" | "abort" => Ok(ConflictPolicy::Cancel),
            _ => Err(format!("invalid conflict policy: '{s}' (expected ask|overwrite|rename|skip|cancel)")),
        }
    }
}

/// Answer used for other recoverable errors when nobody is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Ask,
    Skip,
    Cancel,
}

impl FromStr for ErrorPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(ErrorPolicy::Ask),
            "skip" => Ok(ErrorPolicy::Skip),
            "cancel" | "abort" => Ok(ErrorPolicy::Cancel),
            _ => Err(format!("invalid error policy: '{s}' (expected ask|skip|cancel)")),
        }
    }
}

/// Runtime configuration for transfers and the CLI around them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Chunk size for the byte-copy loop
    pub buffer_size: usize,
    pub durability: Durability,
    /// Copy mode bits from source entries
    pub preserve_permissions: bool,
    /// Copy atime/mtime from source entries
    pub preserve_timestamps: bool,
    /// Ask before starting when the destination looks too small
    pub check_free_space: bool,
    pub on_conflict: ConflictPolicy,
    pub on_error: ErrorPolicy,
    /// Minimum spacing between percentage notifications
    pub progress_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_file: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            durability: Durability::Data,
            preserve_permissions: true,
            preserve_timestamps: false,
            check_free_space: true,
            on_conflict: ConflictPolicy::Ask,
            on_error: ErrorPolicy::Ask,
            progress_interval: Duration::from_millis(super::DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }
}
