// src/tools/volume.rs

use crate::protocol::{Action, ExecutionOutcome, Parameters};
use crate::tools::host::{HostRunner, osascript};
use crate::tools::{ActionHandler, require_text};
use std::rc::Rc;

/// `adjust_setting`: output volume through AppleScript.
pub struct VolumeHandler {
    runner: Rc<dyn HostRunner>,
}

impl VolumeHandler {
    pub fn new(runner: Rc<dyn HostRunner>) -> Self {
        Self { runner }
    }
}

impl ActionHandler for VolumeHandler {
    fn action(&self) -> Action {
        Action::AdjustSetting
    }

    fn description(&self) -> &str {
        "Changes the system output volume."
    }

    fn perform(&self, parameters: &Parameters) -> ExecutionOutcome {
        let setting = match require_text(parameters, "setting") {
            Ok(setting) => setting,
            Err(outcome) => return outcome,
        };
        if setting != "volume" {
            return ExecutionOutcome::failure(&format!("Unsupported setting: {setting}"));
        }

        let Some(value) = parameters.get("value").and_then(|v| v.as_f64()) else {
            return ExecutionOutcome::failure("Missing value parameter");
        };
        let level = value.round().clamp(0.0, 100.0) as u8;

        let script = format!("set volume output volume {level}");
        let (program, args) = osascript(&[&script], &[]);
        let out = self.runner.run(&program, &args);

        if out.success {
            let message = format!("Volume set to {level}%");
            let output = out.output().unwrap_or_else(|| message.clone());
            ExecutionOutcome::success(&message, Some(output))
        } else {
            ExecutionOutcome::failure(&format!("Failed to set volume: {}", out.reason()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::host::DryRunRunner;

    fn params(setting: &str, value: i64) -> Parameters {
        let mut p = Parameters::new();
        p.insert("setting".into(), setting.into());
        p.insert("value".into(), value.into());
        p
    }

    #[test]
    fn test_volume_is_clamped() {
        let runner = Rc::new(DryRunRunner::new());
        let handler = VolumeHandler::new(runner.clone());
        let outcome = handler.perform(&params("volume", 140));
        assert!(outcome.succeeded);
        assert_eq!(outcome.message, "Volume set to 100%");
        assert_eq!(
            runner.commands(),
            vec!["osascript -e 'set volume output volume 100'".to_string()]
        );
    }

    #[test]
    fn test_unsupported_setting() {
        let handler = VolumeHandler::new(Rc::new(DryRunRunner::new()));
        let outcome = handler.perform(&params("brightness", 50));
        assert!(!outcome.succeeded);
        assert_eq!(outcome.message, "Unsupported setting: brightness");
    }
}
