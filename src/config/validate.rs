//! Config validation logic.
//! Range checks for tunables and safety checks for the log file location.

use anyhow::{Result, bail};
use tracing::{debug, error};

use super::paths::path_has_symlink_ancestor;
use super::types::Config;
use super::{MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};

impl Config {
    /// Validate tunables and the log file location.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            error!(buffer_size = self.buffer_size, "buffer_size out of range");
            bail!(
                "buffer_size {} is out of range ({}..={} bytes)",
                self.buffer_size,
                MIN_BUFFER_SIZE,
                MAX_BUFFER_SIZE
            );
        }

        if let Some(log) = &self.log_file {
            if log.is_dir() {
                bail!("log_file points at a directory: {}", log.display());
            }
            if path_has_symlink_ancestor(log)? {
                error!(path = %log.display(), "log_file has a symlinked ancestor");
                bail!("log_file has a symlinked ancestor: {}", log.display());
            }
        }

        debug!(
            buffer_size = self.buffer_size,
            durability = ?self.durability,
            on_conflict = ?self.on_conflict,
            on_error = ?self.on_error,
            "Config validated"
        );
        Ok(())
    }
}
