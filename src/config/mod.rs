//! Configuration: types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, ConflictPolicy, Durability, ErrorPolicy, LogLevel};
pub use xml::{create_template_config, load_config, load_config_from_xml_path};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "XFER_CONFIG";

pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
pub const MIN_BUFFER_SIZE: usize = 4 * 1024;
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;
