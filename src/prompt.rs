//! Terminal side of the interaction port.
//! The job runs on its worker thread; this loop runs on the main thread, answers
//! prompts from stdin and draws progress until the worker finishes.

use chrono::{DateTime, Local};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::debug;

use xfer::fs_ops::format_bytes;
use xfer::output as out;
use xfer::{Choice, Choices, EntryInfo, JobHandle, Prompt, PromptReceiver, ProgressEvent, Question};

const POLL: Duration = Duration::from_millis(100);

/// Serve prompts and progress until the job's worker has finished.
pub fn serve(handle: &JobHandle, prompts: &PromptReceiver, events: &Receiver<ProgressEvent>) {
    let show_progress = atty::is(atty::Stream::Stderr);
    let mut current = String::new();
    let mut pct = 0.0;
    let stdin = io::stdin();
    loop {
        match prompts.recv_timeout(POLL) {
            Ok(prompt) => {
                clear_line(show_progress);
                let choice = ask(&prompt, &mut stdin.lock());
                debug!(%choice, "terminal answer");
                prompt.respond(choice);
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Headless ports never send; keep drawing progress.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL),
        }
        for ev in events.try_iter() {
            match ev {
                ProgressEvent::CurrentItem(name) => current = name,
                ProgressEvent::Progress(p) => pct = p,
                ProgressEvent::Throughput(t) if show_progress => {
                    eprint!("\r{}\x1b[K", out::progress_line(pct, Some(&t), &current));
                    let _ = io::stderr().flush();
                }
                _ => {}
            }
        }
        if handle.is_finished() {
            break;
        }
    }
    clear_line(show_progress);
}

fn clear_line(show_progress: bool) {
    if show_progress {
        eprint!("\r\x1b[K");
    }
}

fn ask(prompt: &Prompt, input: &mut impl BufRead) -> Choice {
    let question = prompt.question();
    let choices = question.choices();
    out::print_question(&describe(question));
    loop {
        eprint!("{} ", legend(choices));
        let _ = io::stderr().flush();
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return Choice::Cancel,
            Ok(_) => {}
        }
        match parse_choice(line.trim(), choices) {
            Some(c) => return c,
            None => out::print_warn("Please answer with one of the letters shown."),
        }
    }
}

fn describe(question: &Question) -> String {
    match question {
        Question::Ask { message, .. } => message.clone(),
        Question::Replace { source, target } => format!(
            "{} already exists ({}).\nReplace it with {} ({}), or keep both?",
            target.path.display(),
            summary(target),
            source.path.display(),
            summary(source)
        ),
    }
}

fn summary(info: &EntryInfo) -> String {
    match info.modified {
        Some(t) => {
            let t: DateTime<Local> = t.into();
            format!("{}, modified {}", format_bytes(info.size), t.format("%d/%m/%y %H:%M:%S"))
        }
        None => format_bytes(info.size),
    }
}

fn legend(choices: Choices) -> String {
    let labels: Vec<&str> = choices
        .iter()
        .map(|c| match c {
            Choice::Yes => "[y]es",
            Choice::YesToAll => "[a]ll",
            Choice::No => "[n]o",
            Choice::NoToAll => "[N]one",
            Choice::Rename => "[k]eep both",
            Choice::RenameAll => "[K]eep all",
            Choice::Retry => "[r]etry",
            Choice::Cancel => "[c]ancel",
            Choice::Force => "[f]orce",
        })
        .collect();
    labels.join("/")
}

/// Map a typed answer onto a choice the question allows.
fn parse_choice(answer: &str, choices: Choices) -> Option<Choice> {
    let choice = match answer {
        "y" | "Y" | "yes" => Choice::Yes,
        "a" | "A" | "all" => Choice::YesToAll,
        "n" | "no" => Choice::No,
        "N" | "none" => Choice::NoToAll,
        "k" | "keep" | "rename" => Choice::Rename,
        "K" | "keep all" | "rename all" => Choice::RenameAll,
        "r" | "R" | "retry" => Choice::Retry,
        "c" | "C" | "cancel" => Choice::Cancel,
        "f" | "F" | "force" => Choice::Force,
        _ => return None,
    };
    choices.contains(choice).then_some(choice)
}
