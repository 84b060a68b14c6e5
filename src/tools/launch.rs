// src/tools/launch.rs

use crate::protocol::{Action, ExecutionOutcome, Parameters};
use crate::tools::host::{HostRunner, open_app_command};
use crate::tools::{ActionHandler, require_text};
use std::rc::Rc;

/// `launch_app`: starts an application, optionally pointing it at a URL.
pub struct LaunchHandler {
    runner: Rc<dyn HostRunner>,
}

impl LaunchHandler {
    pub fn new(runner: Rc<dyn HostRunner>) -> Self {
        Self { runner }
    }
}

impl ActionHandler for LaunchHandler {
    fn action(&self) -> Action {
        Action::LaunchApp
    }

    fn description(&self) -> &str {
        "Opens an application by name."
    }

    fn perform(&self, parameters: &Parameters) -> ExecutionOutcome {
        let app = match require_text(parameters, "app") {
            Ok(app) => app,
            Err(outcome) => return outcome,
        };
        let url = parameters
            .get("url")
            .and_then(|v| v.as_str())
            .filter(|u| !u.is_empty());

        let (program, args) = open_app_command(app, url);
        let out = self.runner.run(&program, &args);

        if out.success {
            ExecutionOutcome::success(&format!("Opened {app}"), out.output())
        } else {
            ExecutionOutcome::failure(&format!("Failed to open {app}: {}", out.reason()))
        }
    }
}
