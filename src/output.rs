//! Coloured user-facing messages.
//! Prefixes are coloured only when the stream they go to is a terminal.

use owo_colors::OwoColorize;
use std::time::Duration;

use crate::fs_ops::format_bytes;
use crate::progress::Throughput;

fn stdout_is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn stderr_is_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

pub fn print_info(msg: &str) {
    if stderr_is_tty() {
        eprintln!("{} {}", "info:".cyan().bold(), msg);
    } else {
        eprintln!("info: {msg}");
    }
}

pub fn print_warn(msg: &str) {
    if stderr_is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {msg}");
    }
}

pub fn print_error(msg: &str) {
    if stderr_is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {msg}");
    }
}

pub fn print_success(msg: &str) {
    if stdout_is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {msg}");
    }
}

/// Plain line on stdout (no prefix): new paths, dry-run listings.
pub fn print_user(msg: &str) {
    println!("{msg}");
}

/// Question text for an interactive prompt, on stderr.
pub fn print_question(msg: &str) {
    if stderr_is_tty() {
        eprintln!("{} {}", "?".magenta().bold(), msg);
    } else {
        eprintln!("? {msg}");
    }
}

/// Render a percentage, plus rate and time left once known, for the progress line.
pub fn progress_line(percent: f64, status: Option<&Throughput>, item: &str) -> String {
    match status {
        Some(t) if t.bytes_per_sec > 0 => {
            let left = t.remaining.map(format_duration).unwrap_or_else(|| "--:--".into());
            format!(
                "[{percent:>5.1}%] {}/s, {left} left  {item}",
                format_bytes(t.bytes_per_sec)
            )
        }
        _ => format!("[{percent:>5.1}%] {item}"),
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
