// src/tools/mod.rs

use crate::protocol::{Action, ExecutionOutcome, Parameters, Step};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{info, warn};

pub mod host;
pub mod launch;
pub mod llm;
pub mod media;
pub mod notes;
pub mod search;
pub mod volume;

pub use host::{DryRunRunner, HostOutput, HostRunner, ProcessRunner};
pub use launch::LaunchHandler;
pub use media::MediaHandler;
pub use notes::NoteHandler;
pub use search::SearchHandler;
pub use volume::VolumeHandler;

/// One host side effect, bound to exactly one action kind.
pub trait ActionHandler {
    fn action(&self) -> Action;
    fn description(&self) -> &str;
    fn perform(&self, parameters: &Parameters) -> ExecutionOutcome;
}

/// Lookup table from action kind to its handler.
pub struct Toolbox {
    handlers: HashMap<Action, Box<dyn ActionHandler>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Every built-in handler, sharing one host runner.
    pub fn standard(runner: Rc<dyn HostRunner>, search_url: &str) -> Self {
        Self::new()
            .register(VolumeHandler::new(runner.clone()))
            .register(MediaHandler::new(runner.clone()))
            .register(SearchHandler::new(runner.clone(), search_url))
            .register(NoteHandler::new(runner.clone()))
            .register(LaunchHandler::new(runner))
    }

    pub fn register<T: ActionHandler + 'static>(mut self, handler: T) -> Self {
        self.handlers.insert(handler.action(), Box::new(handler));
        self
    }

    pub fn get(&self, action: Action) -> Option<&dyn ActionHandler> {
        self.handlers.get(&action).map(|boxed| boxed.as_ref())
    }

    pub fn dispatch(&self, step: &Step) -> ExecutionOutcome {
        match self.get(step.action) {
            Some(handler) => {
                info!("Executing action: {} ({})", step.action, handler.description());
                handler.perform(&step.parameters)
            }
            None => {
                warn!("No handler registered for {}", step.action);
                ExecutionOutcome::failure(&format!("No handler registered for {}", step.action))
            }
        }
    }
}

impl Default for Toolbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch a text parameter or produce the failure outcome for its absence.
pub(crate) fn require_text<'a>(
    parameters: &'a Parameters,
    name: &str,
) -> Result<&'a str, ExecutionOutcome> {
    parameters
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ExecutionOutcome::failure(&format!("Missing {name} parameter")))
}
