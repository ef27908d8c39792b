//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template on request.
//!
//! Notes:
//! - Unknown XML fields are a hard error so misconfigurations surface early.
//! - Missing fields keep their `Config::default()` values.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, ConflictPolicy, Durability, ErrorPolicy, LogLevel};
use super::{DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_INTERVAL_MS};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    buffer_size: Option<u64>,
    durability: Option<String>,
    preserve_permissions: Option<bool>,
    preserve_timestamps: Option<bool>,
    check_free_space: Option<bool>,
    on_conflict: Option<String>,
    on_error: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    progress_interval_ms: Option<u64>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// Map XmlConfig -> Config, rejecting values that do not parse.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    if let Some(s) = non_empty(parsed.log_file.as_deref()) {
        cfg.log_file = Some(PathBuf::from(s));
    }
    if let Some(n) = parsed.buffer_size {
        cfg.buffer_size = usize::try_from(n).context("buffer_size does not fit in memory")?;
    }
    if let Some(s) = non_empty(parsed.durability.as_deref()) {
        cfg.durability = s.parse::<Durability>().map_err(|e| anyhow!(e))?;
    }
    if let Some(b) = parsed.preserve_permissions {
        cfg.preserve_permissions = b;
    }
    if let Some(b) = parsed.preserve_timestamps {
        cfg.preserve_timestamps = b;
    }
    if let Some(b) = parsed.check_free_space {
        cfg.check_free_space = b;
    }
    if let Some(s) = non_empty(parsed.on_conflict.as_deref()) {
        cfg.on_conflict = s.parse::<ConflictPolicy>().map_err(|e| anyhow!(e))?;
    }
    if let Some(s) = non_empty(parsed.on_error.as_deref()) {
        cfg.on_error = s.parse::<ErrorPolicy>().map_err(|e| anyhow!(e))?;
    }
    if let Some(ms) = parsed.progress_interval_ms {
        cfg.progress_interval = Duration::from_millis(ms);
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    let cfg = xml_to_config(parsed)
        .with_context(|| format!("invalid value in config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(cfg)
}

/// Load the effective config file, if there is one.
///
/// `$XFER_CONFIG` pointing at a missing file is an error; a missing file at the
/// default location is not (defaults apply).
pub fn load_config() -> Result<Option<(Config, PathBuf)>> {
    let explicit = std::env::var_os(super::CONFIG_ENV).is_some();
    let path = default_config_path()?;
    if !path.exists() {
        if explicit {
            bail!("config file named by {} does not exist: {}", super::CONFIG_ENV, path.display());
        }
        return Ok(None);
    }
    let cfg = load_config_from_xml_path(&path)?;
    Ok(Some((cfg, path)))
}

/// Create a commented template config file (and parent directory).
/// Refuses to follow symlinked ancestors or overwrite an existing file.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!("Refusing to create config: ancestor of {} is a symlink", path.display());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir '{}'", parent.display()))?;
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/xfer.log".into());

    let content = format!(
        "<!--\n  xfer configuration (XML)\n\n    log_level             -> quiet | normal | info | debug\n    log_file              -> path to log file (optional; stderr still used)\n    buffer_size           -> bytes per copy chunk (4096 .. 67108864)\n    durability            -> data | full (fsync every file)\n    preserve_permissions  -> copy mode bits (true/false)\n    preserve_timestamps   -> copy atime/mtime (true/false)\n    check_free_space      -> ask before starting when the destination looks too small\n    on_conflict           -> ask | overwrite | rename | skip | cancel\n    on_error              -> ask | skip | cancel\n    progress_interval_ms  -> minimum spacing of progress updates\n\n  CLI flags override XML values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <buffer_size>{}</buffer_size>\n  <durability>data</durability>\n  <preserve_permissions>true</preserve_permissions>\n  <preserve_timestamps>false</preserve_timestamps>\n  <check_free_space>true</check_free_space>\n  <on_conflict>ask</on_conflict>\n  <on_error>ask</on_error>\n  <progress_interval_ms>{}</progress_interval_ms>\n</config>\n",
        suggested_log, DEFAULT_BUFFER_SIZE, DEFAULT_PROGRESS_INTERVAL_MS
    );

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600).custom_flags(libc::O_NOFOLLOW);
    }
    let mut f = opts
        .open(path)
        .with_context(|| format!("create config '{}'", path.display()))?;
    f.write_all(content.as_bytes())
        .with_context(|| format!("write config '{}'", path.display()))?;

    info!("Created template config at {}", path.display());
    Ok(())
}
