// src/tools/host.rs

use std::cell::RefCell;
use std::process::Command;
use tracing::{debug, error, info};

/// What a host command reported.
#[derive(Debug, Clone, PartialEq)]
pub struct HostOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl HostOutput {
    pub fn ok(stdout: &str) -> Self {
        Self {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: &str) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Non-empty stdout, if any.
    pub fn output(&self) -> Option<String> {
        let trimmed = self.stdout.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Best available description of a failure.
    pub fn reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            "command exited with an error".to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs one host command to completion.
pub trait HostRunner {
    fn run(&self, program: &str, args: &[String]) -> HostOutput;
}

/// Spawns real processes.
#[derive(Default, Debug)]
pub struct ProcessRunner;

impl HostRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> HostOutput {
        debug!("Running: {} {}", program, args.join(" "));

        match Command::new(program).args(args).output() {
            Ok(out) => {
                let output = HostOutput {
                    success: out.status.success(),
                    stdout: String::from_utf8_lossy(&out.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
                };
                if output.success {
                    debug!("{} succeeded", program);
                } else {
                    error!("{} failed: {}", program, output.stderr);
                }
                output
            }
            Err(e) => {
                error!("Command execution failed: {}", e);
                HostOutput::failed(&format!("Failed to run {program}: {e}"))
            }
        }
    }
}

/// Records commands instead of running them.
#[derive(Default, Debug)]
pub struct DryRunRunner {
    commands: RefCell<Vec<String>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl HostRunner for DryRunRunner {
    fn run(&self, program: &str, args: &[String]) -> HostOutput {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ");
        info!("[DRY RUN] {}", line);
        self.commands.borrow_mut().push(line.clone());
        HostOutput::ok(&format!("[DRY RUN] {line}"))
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(char::is_whitespace) || arg.is_empty() {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}

/// The command that opens a URL in the default browser.
pub fn open_url_command(url: &str) -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open".into(), vec![url.to_string()])
    } else {
        ("xdg-open".into(), vec![url.to_string()])
    }
}

/// The command that launches an application, optionally handing it a URL.
pub fn open_app_command(app: &str, url: Option<&str>) -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        let mut args = vec!["-a".to_string(), app.to_string()];
        if let Some(url) = url {
            args.push(url.to_string());
        }
        ("open".into(), args)
    } else {
        (app.to_lowercase(), url.map(|u| vec![u.to_string()]).unwrap_or_default())
    }
}

/// `osascript` invocation for a multi-line script with argv.
pub fn osascript(lines: &[&str], argv: &[&str]) -> (String, Vec<String>) {
    let mut args = Vec::with_capacity(lines.len() * 2 + argv.len());
    for line in lines {
        args.push("-e".to_string());
        args.push(line.to_string());
    }
    args.extend(argv.iter().map(|a| a.to_string()));
    ("osascript".into(), args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_records_commands() {
        let runner = DryRunRunner::new();
        let out = runner.run("open", &["-a".into(), "Visual Studio Code".into()]);
        assert!(out.success);
        assert_eq!(runner.commands(), vec!["open -a 'Visual Studio Code'".to_string()]);
        assert_eq!(out.output().as_deref(), Some("[DRY RUN] open -a 'Visual Studio Code'"));
    }

    #[test]
    fn test_missing_program_is_failure() {
        let out = ProcessRunner.run("definitely-not-a-real-program-xyz", &[]);
        assert!(!out.success);
        assert!(out.reason().contains("definitely-not-a-real-program-xyz"));
    }

    #[test]
    fn test_osascript_args() {
        let (program, args) = osascript(&["on run argv", "end run"], &["title"]);
        assert_eq!(program, "osascript");
        assert_eq!(args, vec!["-e", "on run argv", "-e", "end run", "title"]);
    }

    #[test]
    fn test_reason_falls_back() {
        assert_eq!(HostOutput::failed("").reason(), "command exited with an error");
    }
}
