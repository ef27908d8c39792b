//! Planned transfer tree.

use std::path::{Path, PathBuf};

use crate::fs_ops::EntryType;

/// One planned entry; directories own their children in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferNode {
    pub source: PathBuf,
    pub kind: EntryType,
    /// Bytes this entry itself contributes (0 for directories).
    pub size: u64,
    pub children: Vec<TransferNode>,
}

impl TransferNode {
    pub fn leaf(source: impl Into<PathBuf>, kind: EntryType, size: u64) -> Self {
        Self {
            source: source.into(),
            kind,
            size,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryType::Directory
    }

    /// Size of this entry plus every descendant.
    pub fn total_size(&self) -> u64 {
        self.size + self.children.iter().map(TransferNode::total_size).sum::<u64>()
    }

    /// Number of entries in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TransferNode::count).sum::<usize>()
    }

    /// Final path component, for display.
    pub fn display_name(&self) -> String {
        display_name(&self.source)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_and_counts_cover_subtree() {
        let mut dir = TransferNode::leaf("/a", EntryType::Directory, 0);
        let mut sub = TransferNode::leaf("/a/s", EntryType::Directory, 0);
        sub.children.push(TransferNode::leaf("/a/s/x", EntryType::Regular, 5));
        dir.children.push(TransferNode::leaf("/a/f", EntryType::Regular, 10));
        dir.children.push(sub);
        assert_eq!(dir.total_size(), 15);
        assert_eq!(dir.count(), 4);
        assert_eq!(dir.display_name(), "a");
    }
}
