// src/tools/notes.rs

use crate::protocol::{Action, ExecutionOutcome, Parameters};
use crate::tools::host::{HostRunner, osascript};
use crate::tools::{ActionHandler, require_text};
use std::rc::Rc;

const NOTE_SCRIPT: [&str; 3] = [
    "on run argv",
    "tell application \"Notes\" to make new note with properties {name:item 1 of argv, body:item 2 of argv}",
    "end run",
];

/// `create_note`: a new note in Notes.app. Title and body travel as argv so
/// they never need escaping inside the script.
pub struct NoteHandler {
    runner: Rc<dyn HostRunner>,
}

impl NoteHandler {
    pub fn new(runner: Rc<dyn HostRunner>) -> Self {
        Self { runner }
    }
}

impl ActionHandler for NoteHandler {
    fn action(&self) -> Action {
        Action::CreateNote
    }

    fn description(&self) -> &str {
        "Creates a note with a title and body."
    }

    fn perform(&self, parameters: &Parameters) -> ExecutionOutcome {
        let title = match require_text(parameters, "title") {
            Ok(title) => title,
            Err(outcome) => return outcome,
        };
        let body = parameters
            .get("body")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let (program, args) = osascript(&NOTE_SCRIPT, &[title, body]);
        let out = self.runner.run(&program, &args);

        if out.success {
            ExecutionOutcome::success(&format!("Note created: {title}"), out.output())
        } else {
            ExecutionOutcome::failure(&format!("Failed to create note: {}", out.reason()))
        }
    }
}
