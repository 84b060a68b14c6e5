// src/tools/media.rs

use crate::protocol::{Action, ExecutionOutcome, Parameters};
use crate::tools::host::{HostRunner, osascript};
use crate::tools::{ActionHandler, require_text};
use std::rc::Rc;

/// `play_media`: transport control for Music.app.
pub struct MediaHandler {
    runner: Rc<dyn HostRunner>,
}

impl MediaHandler {
    pub fn new(runner: Rc<dyn HostRunner>) -> Self {
        Self { runner }
    }
}

impl ActionHandler for MediaHandler {
    fn action(&self) -> Action {
        Action::PlayMedia
    }

    fn description(&self) -> &str {
        "Plays, pauses or skips tracks in the Music app."
    }

    fn perform(&self, parameters: &Parameters) -> ExecutionOutcome {
        let action = match require_text(parameters, "action") {
            Ok(action) => action,
            Err(outcome) => return outcome,
        };

        let command = match action {
            "play" => "play",
            "pause" => "pause",
            "next" => "next track",
            "previous" => "previous track",
            other => return ExecutionOutcome::failure(&format!("Unknown music action: {other}")),
        };

        let script = format!("tell application \"Music\" to {command}");
        let (program, args) = osascript(&[&script], &[]);
        let out = self.runner.run(&program, &args);

        if out.success {
            ExecutionOutcome::success(&format!("Music {action} executed"), out.output())
        } else {
            ExecutionOutcome::failure(&format!("Failed to {action} music: {}", out.reason()))
        }
    }
}
