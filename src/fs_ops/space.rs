use std::path::Path;

pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}

/// Free space for the filesystem holding `path`, probing the nearest existing
/// ancestor when `path` itself does not exist yet.
pub(super) fn available_space(path: &Path) -> Option<u64> {
    let probe = path.ancestors().find(|p| !p.as_os_str().is_empty() && p.exists())?;
    fs2::available_space(probe).ok()
}
