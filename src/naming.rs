//! Duplicate-name resolution.
//!
//! Derives human-readable alternate names for an entry that would collide with
//! itself ("copy of X", "another copy of X", "third copy of X", "4th copy of X", ...)
//! or for a new symlink pointing at it ("link to X", ...).
//!
//! Copy names are normalised first: an existing copy prefix is stripped so that
//! duplicating "copy of X" yields "another copy of X" rather than
//! "copy of copy of X". Link names are never stripped.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Copy,
    Link,
}

const COPY_PREFIXES: [&str; 3] = ["copy of ", "another copy of ", "third copy of "];
const LINK_PREFIXES: [&str; 3] = ["link to ", "another link to ", "third link to "];

/// Upper bound on alternate names tried before giving up.
pub const MAX_NAME_ATTEMPTS: u32 = 10_000;

// Conservative POSIX filename limit (bytes).
const MAX_FILENAME_LEN: usize = 255;

/// Remove one leading copy prefix, if present, returning the base name.
///
/// Recognises every template `next_name` can produce for `NameKind::Copy`,
/// including the numeric "Nth copy of X" family. A prefix with nothing after it
/// is left intact.
pub fn strip_copy_name(name: &str) -> &str {
    if let Some(rest) = strip_numeric_prefix(name, "th copy of ") {
        return rest;
    }
    // Longest first: "another copy of X" also ends with "copy of X".
    for prefix in [COPY_PREFIXES[1], COPY_PREFIXES[2], COPY_PREFIXES[0]] {
        if let Some(rest) = name.strip_prefix(prefix)
            && !rest.is_empty()
        {
            return rest;
        }
    }
    name
}

fn strip_numeric_prefix<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = name[digits..].strip_prefix(suffix)?;
    (!rest.is_empty()).then_some(rest)
}

/// Build the `n`th alternate name (n >= 1) for `name`.
///
/// `n == 0` is treated as 1.
pub fn next_name(name: &str, n: u32, kind: NameKind) -> String {
    let n = n.max(1);
    let base = match kind {
        NameKind::Copy => strip_copy_name(name),
        NameKind::Link => name,
    };
    let prefix = prefix_for(n, kind);
    let base = fit_base(base, prefix.len());
    format!("{prefix}{base}")
}

fn prefix_for(n: u32, kind: NameKind) -> String {
    let table = match kind {
        NameKind::Copy => &COPY_PREFIXES,
        NameKind::Link => &LINK_PREFIXES,
    };
    match n {
        1..=3 => table[(n - 1) as usize].to_string(),
        _ => match kind {
            NameKind::Copy => format!("{n}th copy of "),
            NameKind::Link => format!("{n}th link to "),
        },
    }
}

/// Truncate `base` on a char boundary so `prefix + base` fits the filename limit.
fn fit_base(base: &str, prefix_len: usize) -> &str {
    let budget = MAX_FILENAME_LEN.saturating_sub(prefix_len);
    if base.len() <= budget {
        return base;
    }
    let mut end = budget;
    while end > 0 && !base.is_char_boundary(end) {
        end -= 1;
    }
    trace!(base, budget, "naming: truncating base name to fit filename limit");
    &base[..end]
}

/// OsStr variant. Non-UTF-8 names are prefixed without stripping.
pub fn next_name_os(name: &OsStr, n: u32, kind: NameKind) -> OsString {
    match name.to_str() {
        Some(s) => OsString::from(next_name(s, n, kind)),
        None => {
            let mut out = OsString::from(prefix_for(n.max(1), kind));
            out.push(name);
            out
        }
    }
}

/// Candidate path for the `n`th alternate of `source` inside `dir`.
pub fn alternate_path(dir: &Path, source: &Path, n: u32, kind: NameKind) -> PathBuf {
    let name = source
        .file_name()
        .unwrap_or_else(|| source.as_os_str());
    dir.join(next_name_os(name, n, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_templates_by_attempt() {
        assert_eq!(next_name("a.txt", 1, NameKind::Copy), "copy of a.txt");
        assert_eq!(next_name("a.txt", 2, NameKind::Copy), "another copy of a.txt");
        assert_eq!(next_name("a.txt", 3, NameKind::Copy), "third copy of a.txt");
        assert_eq!(next_name("a.txt", 4, NameKind::Copy), "4th copy of a.txt");
        assert_eq!(next_name("a.txt", 21, NameKind::Copy), "21th copy of a.txt");
    }

    #[test]
    fn link_templates_by_attempt() {
        assert_eq!(next_name("a", 1, NameKind::Link), "link to a");
        assert_eq!(next_name("a", 2, NameKind::Link), "another link to a");
        assert_eq!(next_name("a", 3, NameKind::Link), "third link to a");
        assert_eq!(next_name("a", 7, NameKind::Link), "7th link to a");
    }

    #[test]
    fn copy_strips_existing_prefix() {
        assert_eq!(next_name("copy of a", 2, NameKind::Copy), "another copy of a");
        assert_eq!(next_name("another copy of a", 3, NameKind::Copy), "third copy of a");
        assert_eq!(next_name("third copy of a", 4, NameKind::Copy), "4th copy of a");
        assert_eq!(next_name("12th copy of a", 1, NameKind::Copy), "copy of a");
    }

    #[test]
    fn link_never_strips() {
        assert_eq!(next_name("copy of a", 1, NameKind::Link), "link to copy of a");
        assert_eq!(next_name("link to a", 1, NameKind::Link), "link to link to a");
    }

    #[test]
    fn resolving_twice_keeps_base() {
        for base in ["x", "report final.pdf", "copy of"] {
            let once = next_name(base, 1, NameKind::Copy);
            let twice = next_name(&once, 1, NameKind::Copy);
            assert_eq!(once, twice);
            assert_eq!(strip_copy_name(&twice), base);
        }
        let numeric = next_name("x", 9, NameKind::Copy);
        assert_eq!(strip_copy_name(&numeric), "x");
        assert_eq!(next_name(&numeric, 1, NameKind::Copy), "copy of x");
    }

    #[test]
    fn bare_prefix_is_not_stripped() {
        assert_eq!(strip_copy_name("copy of "), "copy of ");
        assert_eq!(strip_copy_name("5th copy of "), "5th copy of ");
        assert_eq!(strip_copy_name("th copy of a"), "th copy of a");
    }

    #[test]
    fn zero_attempt_behaves_like_first() {
        assert_eq!(next_name("a", 0, NameKind::Copy), "copy of a");
    }

    #[test]
    fn long_names_fit_limit() {
        let long = "é".repeat(200);
        let out = next_name(&long, 4, NameKind::Copy);
        assert!(out.len() <= MAX_FILENAME_LEN);
        assert!(out.starts_with("4th copy of "));
    }

    #[test]
    fn alternate_path_lands_in_dir() {
        let p = alternate_path(Path::new("/d"), Path::new("/src/f.txt"), 2, NameKind::Copy);
        assert_eq!(p, PathBuf::from("/d/another copy of f.txt"));
    }
}
