// src/memory/mod.rs

use colored::Colorize;
use std::fmt;

pub mod verbalizer;

pub use verbalizer::Verbalizer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Planned,
    Confirm,
    Declined,
    StepStarted,
    StepSucceeded,
    StepFailed,
    Clarification,
    Finished,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Planned => "planned",
            EventKind::Confirm => "confirm",
            EventKind::Declined => "declined",
            EventKind::StepStarted => "step_started",
            EventKind::StepSucceeded => "step_succeeded",
            EventKind::StepFailed => "step_failed",
            EventKind::Clarification => "clarification",
            EventKind::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Where human-readable progress goes. Fire-and-forget: nothing reads it back
/// to make decisions.
pub trait FeedbackSink {
    fn emit(&mut self, kind: EventKind, payload: &str);
}

/// Keeps every event in order.
#[derive(Default, Debug)]
pub struct InMemoryLog {
    pub entries: Vec<(EventKind, String)>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn read_all(&self) -> Vec<(EventKind, String)> {
        self.entries.clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl FeedbackSink for InMemoryLog {
    fn emit(&mut self, kind: EventKind, payload: &str) {
        self.entries.push((kind, payload.to_string()));
    }
}

/// Coloured terminal output.
#[derive(Default, Debug)]
pub struct ConsoleSink;

impl FeedbackSink for ConsoleSink {
    fn emit(&mut self, kind: EventKind, payload: &str) {
        match kind {
            EventKind::Planned => println!("{} {}", "📝".cyan(), payload.cyan()),
            EventKind::Confirm => println!("{} {}", "?".yellow().bold(), payload.yellow()),
            EventKind::Declined => println!("{}", payload.dimmed()),
            EventKind::StepStarted => println!("{} {}", "⚙️ ".cyan(), payload),
            EventKind::StepSucceeded => println!("{} {}", "✓".green().bold(), payload.green()),
            EventKind::StepFailed => println!("{} {}", "✗".red().bold(), payload.red()),
            EventKind::Clarification => println!("{} {}", "…".magenta(), payload.magenta()),
            EventKind::Finished => println!("{}", payload.bold()),
        }
    }
}
