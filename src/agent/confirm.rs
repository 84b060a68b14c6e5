// src/agent/confirm.rs

use colored::Colorize;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Asks the operator a yes/no question.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Reads the answer from the terminal. Anything but an explicit yes is a no.
/// The prompt itself is shown by the feedback sink, so only the `[y/N]` hint
/// is printed here.
#[derive(Default, Debug)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, _prompt: &str) -> bool {
        read_answer(&mut io::stdin().lock(), &mut io::stdout())
    }
}

fn read_answer(input: &mut impl BufRead, output: &mut impl Write) -> bool {
    if let Err(e) = write!(output, "{} ", "[y/N]".dimmed()).and_then(|_| output.flush()) {
        warn!("Failed to show confirmation hint: {}", e);
    }

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(e) => {
            warn!("Failed to read confirmation: {}", e);
            false
        }
    }
}

/// Gives the same answer to every prompt.
#[derive(Clone, Copy, Debug)]
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "是" | "好" | "确定" | "确认"
    )
}
