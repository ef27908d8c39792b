//! Transfer planning ("collect" phase).
//!
//! Walks one source path (lstat semantics, symlinks are never followed) into a
//! `TransferNode` tree and adds its bytes to the job total exactly once.

use std::path::Path;
use tracing::{trace, warn};

use crate::cancel::CancelToken;
use crate::errors::{Result, TransferError};
use crate::fs_ops::{EntryType, FileOps};
use crate::node::TransferNode;

/// Collect `path` into a node tree, adding its size to `total`.
///
/// A failure to stat `path` itself aborts. Inside a directory, a child failure
/// (including a child that vanished between listing and stat) is remembered
/// while its siblings are still collected, then returned.
/// Cancellation is checked before every entry.
pub fn collect(path: &Path, ops: &dyn FileOps, cancel: &CancelToken, total: &mut u64) -> Result<TransferNode> {
    cancel.check()?;
    let info = ops.stat(path)?;
    let mut node = TransferNode::leaf(path, info.kind, 0);

    if info.kind != EntryType::Directory {
        node.size = info.size;
        *total += info.size;
        trace!(path = %path.display(), size = info.size, "collected leaf");
        return Ok(node);
    }

    let mut first_err: Option<TransferError> = None;
    for child in ops.list_children(path, cancel)? {
        cancel.check()?;
        match collect(&child, ops, cancel, total) {
            Ok(n) => node.children.push(n),
            Err(TransferError::Cancelled) => return Err(TransferError::Cancelled),
            Err(e) => {
                warn!(path = %child.display(), error = %e, "failed to collect entry");
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => {
            trace!(path = %path.display(), children = node.children.len(), "collected directory");
            Ok(node)
        }
    }
}
