//! Questions the engine asks the controlling context.
//!
//! The worker blocks on `InteractionPort` until an answer arrives. Three
//! implementations ship with the crate:
//! - `ChannelPort` forwards each question over an mpsc channel as a `Prompt`
//!   and parks until the other side calls `Prompt::respond`.
//! - `AutoPort` answers from configured policies (headless use).
//! - `FnPort` wraps a closure (tests, embedding).

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::{ConflictPolicy, ErrorPolicy};
use crate::fs_ops::EntryInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    Yes,
    YesToAll,
    No,
    NoToAll,
    /// Keep both: copy under a fresh "copy of" name.
    Rename,
    RenameAll,
    Retry,
    Cancel,
    Force,
}

impl Choice {
    const ALL: [Choice; 9] = [
        Choice::Yes,
        Choice::YesToAll,
        Choice::No,
        Choice::NoToAll,
        Choice::Rename,
        Choice::RenameAll,
        Choice::Retry,
        Choice::Cancel,
        Choice::Force,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Choice::Yes => "yes",
            Choice::YesToAll => "yes to all",
            Choice::No => "no",
            Choice::NoToAll => "no to all",
            Choice::Rename => "rename",
            Choice::RenameAll => "rename all",
            Choice::Retry => "retry",
            Choice::Cancel => "cancel",
            Choice::Force => "force",
        };
        f.write_str(s)
    }
}

/// Set of answers a question allows.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Choices(u16);

impl Choices {
    pub const NONE: Choices = Choices(0);
    /// Collision: Yes = overwrite, No = skip, Rename = copy under a new name.
    pub const REPLACE: Choices = Choices::NONE
        .with(Choice::Yes)
        .with(Choice::YesToAll)
        .with(Choice::No)
        .with(Choice::NoToAll)
        .with(Choice::Rename)
        .with(Choice::RenameAll)
        .with(Choice::Retry)
        .with(Choice::Cancel);
    /// Recoverable error: Yes = skip this entry, YesToAll = skip all further errors.
    pub const SKIP: Choices = Choices::NONE
        .with(Choice::Yes)
        .with(Choice::YesToAll)
        .with(Choice::Retry)
        .with(Choice::Cancel);
    /// Plain confirmation: Yes = proceed, No = stop.
    pub const CONFIRM: Choices = Choices::NONE.with(Choice::Yes).with(Choice::No);

    pub const fn with(self, c: Choice) -> Choices {
        Choices(self.0 | c.bit())
    }

    pub const fn contains(self, c: Choice) -> bool {
        self.0 & c.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Choice> {
        Choice::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl fmt::Debug for Choices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

pub trait InteractionPort: Send {
    /// Ask a free-form question; the answer should be one of `choices`.
    fn ask(&self, message: &str, choices: Choices) -> Choice;

    /// `target` already exists; should `source` replace it?
    fn ask_replace(&self, source: &EntryInfo, target: &EntryInfo) -> Choice;
}

impl<T: InteractionPort + Sync + ?Sized> InteractionPort for Arc<T> {
    fn ask(&self, message: &str, choices: Choices) -> Choice {
        (**self).ask(message, choices)
    }

    fn ask_replace(&self, source: &EntryInfo, target: &EntryInfo) -> Choice {
        (**self).ask_replace(source, target)
    }
}

/// What is being asked.
#[derive(Debug, Clone)]
pub enum Question {
    Ask { message: String, choices: Choices },
    Replace { source: EntryInfo, target: EntryInfo },
}

impl Question {
    pub fn choices(&self) -> Choices {
        match self {
            Question::Ask { choices, .. } => *choices,
            Question::Replace { .. } => Choices::REPLACE,
        }
    }
}

/// One pending question; the worker stays parked until `respond` is called or
/// the prompt is dropped (treated as `Cancel`).
#[derive(Debug)]
pub struct Prompt {
    question: Question,
    reply: Sender<Choice>,
}

impl Prompt {
    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn respond(self, choice: Choice) {
        trace!(%choice, "prompt answered");
        let _ = self.reply.send(choice);
    }
}

/// Worker side of a channel port.
#[derive(Debug, Clone)]
pub struct ChannelPort {
    tx: Sender<Prompt>,
}

/// Controller side of a channel port.
#[derive(Debug)]
pub struct PromptReceiver {
    rx: Receiver<Prompt>,
}

/// Create a connected port/receiver pair.
pub fn channel() -> (ChannelPort, PromptReceiver) {
    let (tx, rx) = mpsc::channel();
    (ChannelPort { tx }, PromptReceiver { rx })
}

impl ChannelPort {
    fn round_trip(&self, question: Question) -> Choice {
        let (reply, answer) = mpsc::channel();
        if self.tx.send(Prompt { question, reply }).is_err() {
            debug!("prompt receiver is gone; cancelling");
            return Choice::Cancel;
        }
        answer.recv().unwrap_or(Choice::Cancel)
    }
}

impl InteractionPort for ChannelPort {
    fn ask(&self, message: &str, choices: Choices) -> Choice {
        self.round_trip(Question::Ask {
            message: message.to_string(),
            choices,
        })
    }

    fn ask_replace(&self, source: &EntryInfo, target: &EntryInfo) -> Choice {
        self.round_trip(Question::Replace {
            source: source.clone(),
            target: target.clone(),
        })
    }
}

impl PromptReceiver {
    /// Block for the next prompt; `None` once the worker dropped its port.
    pub fn recv(&self) -> Option<Prompt> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout`; lets a controller interleave prompts with other work.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Prompt, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Option<Prompt> {
        match self.rx.try_recv() {
            Ok(p) => Some(p),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// Answers every question from fixed policies.
///
/// Collisions follow `on_conflict`; questions offering `YesToAll` (recoverable
/// errors) follow `on_error`; plain confirmations get `Yes` when `proceed` is set.
/// `Ask` has nobody to ask here and degrades to skipping.
#[derive(Debug, Clone, Copy)]
pub struct AutoPort {
    pub on_conflict: ConflictPolicy,
    pub on_error: ErrorPolicy,
    pub proceed: bool,
}

impl Default for AutoPort {
    fn default() -> Self {
        Self {
            on_conflict: ConflictPolicy::Skip,
            on_error: ErrorPolicy::Skip,
            proceed: true,
        }
    }
}

impl InteractionPort for AutoPort {
    fn ask(&self, message: &str, choices: Choices) -> Choice {
        let choice = if choices.contains(Choice::YesToAll) {
            match self.on_error {
                ErrorPolicy::Ask | ErrorPolicy::Skip => Choice::YesToAll,
                ErrorPolicy::Cancel => Choice::Cancel,
            }
        } else if self.proceed && choices.contains(Choice::Yes) {
            Choice::Yes
        } else if choices.contains(Choice::No) {
            Choice::No
        } else {
            Choice::Cancel
        };
        debug!(%choice, message, "answered automatically");
        choice
    }

    fn ask_replace(&self, source: &EntryInfo, target: &EntryInfo) -> Choice {
        let choice = match self.on_conflict {
            ConflictPolicy::Overwrite => Choice::YesToAll,
            ConflictPolicy::Rename => Choice::RenameAll,
            ConflictPolicy::Ask | ConflictPolicy::Skip => Choice::NoToAll,
            ConflictPolicy::Cancel => Choice::Cancel,
        };
        debug!(%choice, src = %source.path.display(), dest = %target.path.display(), "collision answered automatically");
        choice
    }
}

/// Closure-backed port: the closure sees every question.
pub struct FnPort<F>(pub F);

impl<F> InteractionPort for FnPort<F>
where
    F: Fn(&Question) -> Choice + Send,
{
    fn ask(&self, message: &str, choices: Choices) -> Choice {
        (self.0)(&Question::Ask {
            message: message.to_string(),
            choices,
        })
    }

    fn ask_replace(&self, source: &EntryInfo, target: &EntryInfo) -> Choice {
        (self.0)(&Question::Replace {
            source: source.clone(),
            target: target.clone(),
        })
    }
}
