// src/context/mod.rs

use crate::protocol::ExecutionOutcome;
use std::collections::BTreeMap;

/// Outcomes of one plan run, keyed by step index.
#[derive(Debug, Default)]
pub struct RunContext {
    outcomes: BTreeMap<usize, ExecutionOutcome>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            outcomes: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, index: usize, outcome: ExecutionOutcome) {
        self.outcomes.insert(index, outcome);
    }

    /// Output of the step just before `index`, if that step produced any.
    pub fn previous_output(&self, index: usize) -> Option<&str> {
        let prev = index.checked_sub(1)?;
        self.outcomes.get(&prev)?.output.as_deref()
    }

    pub fn into_outcomes(self) -> Vec<ExecutionOutcome> {
        self.outcomes.into_values().collect()
    }
}
