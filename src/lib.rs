//! Core library for `xfer`.
//!
//! Recursive copy/move of files and directory trees:
//! - `planner` walks each source into a `TransferNode` tree and sums its size.
//! - `engine` replays the tree against the target, asking an `InteractionPort`
//!   about collisions and recoverable errors and reporting to a `ProgressSink`.
//! - `job` ties both together for a list of source/target pairs and can run
//!   the whole thing on a worker thread that honours a shared `CancelToken`.
//!
//! Filesystem access goes through the `FileOps` trait; `LocalFs` is the
//! std/libc implementation.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_ops;
pub mod interaction;
pub mod job;
pub mod naming;
pub mod node;
pub mod output;
pub mod planner;
pub mod progress;

pub use cancel::CancelToken;
pub use config::{
    Config, ConflictPolicy, Durability, ErrorPolicy, LogLevel, default_config_path,
    default_log_path, load_config, path_has_symlink_ancestor,
};
pub use engine::{Engine, JobPolicy};
pub use errors::{IoErrorKind, Result, TransferError};
pub use fs_ops::{CopyOptions, EntryInfo, EntryType, FileOps, LocalFs};
pub use interaction::{
    AutoPort, ChannelPort, Choice, Choices, FnPort, InteractionPort, Prompt, PromptReceiver,
    Question,
};
pub use job::{JobHandle, JobOutcome, Plan, TransferJob};
pub use naming::{NameKind, next_name, strip_copy_name};
pub use node::TransferNode;
pub use progress::{ChannelSink, LogSink, NullSink, ProgressEvent, ProgressSink, Throughput};
