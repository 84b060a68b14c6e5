// src/agent/mod.rs

use crate::config::ConfirmationPolicy;
use crate::context::RunContext;
use crate::memory::{EventKind, FeedbackSink, Verbalizer};
use crate::protocol::{Action, ExecutionOutcome, Plan, Resolution, Step};
use crate::tools::Toolbox;
use std::fmt;
use tracing::{debug, info, warn};

pub mod confirm;

pub use confirm::{AutoConfirm, Confirmer, StdinConfirmer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Confirming,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Pending => "pending",
            RunState::Confirming => "confirming",
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Why a run ended before its last step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Declined,
    StepFailed,
    Clarification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub final_state: RunState,
    pub outcomes: Vec<ExecutionOutcome>,
    pub aborted_at: Option<usize>,
    pub stop_reason: Option<StopReason>,
    pub summary: String,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == RunState::Succeeded
    }

    /// "plan stopped at step i" (1-based) for runs that did not finish.
    pub fn stopped_message(&self) -> Option<String> {
        self.aborted_at
            .map(|index| format!("plan stopped at step {}", index + 1))
    }
}

/// Runs one resolved plan. Fail-stop: the first failed step ends the run and
/// nothing already done is undone.
pub struct Controller {
    plan: Plan,
    policy: ConfirmationPolicy,
    verbalizer: Verbalizer,
    state: RunState,
}

impl Controller {
    pub fn new(resolution: Resolution, policy: ConfirmationPolicy) -> Self {
        Self {
            plan: resolution.into_plan(),
            policy,
            verbalizer: Verbalizer::default(),
            state: RunState::Pending,
        }
    }

    pub fn with_verbalizer(mut self, verbalizer: Verbalizer) -> Self {
        self.verbalizer = verbalizer;
        self
    }

    pub fn run(
        mut self,
        toolbox: &Toolbox,
        confirmer: &mut dyn Confirmer,
        feedback: &mut dyn FeedbackSink,
    ) -> RunReport {
        info!(steps = self.plan.len(), "Running plan: {}", self.plan.summary);
        feedback.emit(EventKind::Planned, &self.plan.summary);

        let mut ctx = RunContext::new();

        if self.plan.steps.iter().any(Step::is_risky) {
            self.transition(RunState::Confirming);
            let prompt = self.verbalizer.plan_prompt(&self.plan);
            if !self.ask(&prompt, confirmer, feedback) {
                return self.finish(ctx, Some(0), Some(StopReason::Declined), feedback);
            }
        }

        self.transition(RunState::Running);

        let steps = std::mem::take(&mut self.plan.steps);
        for (index, step) in steps.iter().enumerate() {
            if step.action == Action::RequestClarification {
                let question = step
                    .text_param("question")
                    .map(str::to_string)
                    .unwrap_or_else(|| self.verbalizer.describe(step));
                feedback.emit(EventKind::Clarification, &question);
                ctx.record(index, ExecutionOutcome::success(&question, Some(question.clone())));
                return self.finish(ctx, Some(index), Some(StopReason::Clarification), feedback);
            }

            if self.needs_step_gate(index, step) {
                self.transition(RunState::Confirming);
                let prompt = self.verbalizer.step_prompt(index, step);
                if !self.ask(&prompt, confirmer, feedback) {
                    return self.finish(ctx, Some(index), Some(StopReason::Declined), feedback);
                }
                self.transition(RunState::Running);
            }

            let mut started = self.verbalizer.describe(step);
            if let Some(previous) = ctx.previous_output(index) {
                started.push_str(&format!(" (after: {previous})"));
            }
            feedback.emit(EventKind::StepStarted, &started);

            let outcome = toolbox.dispatch(step);
            let message = self.verbalizer.result(step, &outcome);
            let failed = !outcome.succeeded;
            if failed {
                warn!(step = index, "Step failed: {}", outcome.message);
                feedback.emit(EventKind::StepFailed, &message);
            } else {
                feedback.emit(EventKind::StepSucceeded, &message);
            }
            ctx.record(index, outcome);

            if failed {
                return self.finish(ctx, Some(index), Some(StopReason::StepFailed), feedback);
            }
        }

        self.finish(ctx, None, None, feedback)
    }

    fn needs_step_gate(&self, index: usize, step: &Step) -> bool {
        self.policy == ConfirmationPolicy::PlanAndStep
            && index > 0
            && step.is_risky()
            && step.action.has_side_effects()
    }

    fn ask(
        &self,
        prompt: &str,
        confirmer: &mut dyn Confirmer,
        feedback: &mut dyn FeedbackSink,
    ) -> bool {
        feedback.emit(EventKind::Confirm, prompt);
        let accepted = confirmer.confirm(prompt);
        if !accepted {
            info!("Confirmation declined");
            feedback.emit(EventKind::Declined, &self.verbalizer.cancelled());
        }
        accepted
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish(
        mut self,
        ctx: RunContext,
        aborted_at: Option<usize>,
        stop_reason: Option<StopReason>,
        feedback: &mut dyn FeedbackSink,
    ) -> RunReport {
        let final_state = match stop_reason {
            None => RunState::Succeeded,
            Some(StopReason::StepFailed) => RunState::Failed,
            Some(StopReason::Declined | StopReason::Clarification) => RunState::Aborted,
        };
        self.transition(final_state);

        let closing = match aborted_at {
            Some(index) => self.verbalizer.stopped_at(index),
            None => self.plan.summary.clone(),
        };
        feedback.emit(EventKind::Finished, &closing);

        RunReport {
            final_state,
            outcomes: ctx.into_outcomes(),
            aborted_at,
            stop_reason,
            summary: self.plan.summary,
        }
    }
}

/// Run an already validated resolution with a fresh controller.
pub fn run(
    resolution: Resolution,
    policy: ConfirmationPolicy,
    toolbox: &Toolbox,
    confirmer: &mut dyn Confirmer,
    feedback: &mut dyn FeedbackSink,
) -> RunReport {
    Controller::new(resolution, policy).run(toolbox, confirmer, feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLog;
    use crate::protocol::{Parameters, RiskAssessment, RiskLevel};
    use crate::tools::ActionHandler;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Answers web searches from a script and records every query.
    struct ScriptedSearch {
        answers: RefCell<VecDeque<bool>>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl ActionHandler for ScriptedSearch {
        fn action(&self) -> Action {
            Action::WebSearch
        }

        fn description(&self) -> &str {
            "scripted"
        }

        fn perform(&self, parameters: &Parameters) -> ExecutionOutcome {
            let query = parameters.get("query").and_then(|v| v.as_str()).unwrap_or_default();
            self.calls.borrow_mut().push(query.to_string());
            if self.answers.borrow_mut().pop_front().unwrap_or(true) {
                ExecutionOutcome::success(&format!("searched {query}"), Some(format!("results:{query}")))
            } else {
                ExecutionOutcome::failure("browser crashed")
            }
        }
    }

    struct Scripted(VecDeque<bool>, Vec<String>);

    impl Confirmer for Scripted {
        fn confirm(&mut self, prompt: &str) -> bool {
            self.1.push(prompt.to_string());
            self.0.pop_front().unwrap_or(false)
        }
    }

    fn toolbox(answers: &[bool]) -> (Toolbox, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let handler = ScriptedSearch {
            answers: RefCell::new(answers.iter().copied().collect()),
            calls: calls.clone(),
        };
        (Toolbox::new().register(handler), calls)
    }

    fn search(query: &str) -> Step {
        let mut params = Parameters::new();
        params.insert("query".into(), query.into());
        Step::new(Action::WebSearch, params, String::new())
    }

    fn risky(query: &str) -> Step {
        let mut step = search(query);
        step.risk = RiskAssessment::new(RiskLevel::High, "test");
        step
    }

    #[test]
    fn test_all_steps_succeed() {
        let (toolbox, calls) = toolbox(&[]);
        let plan = Plan::new(vec![search("a"), search("b")], "two searches");
        let mut log = InMemoryLog::new();

        let report = run(plan.into(), ConfirmationPolicy::PlanAndStep, &toolbox, &mut AutoConfirm(false), &mut log);

        assert_eq!(report.final_state, RunState::Succeeded);
        assert_eq!(report.aborted_at, None);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(*calls.borrow(), vec!["a", "b"]);
        assert_eq!(log.count(EventKind::Confirm), 0);
        assert!(log.read_all()[3].1.contains("after: results:a"));
    }

    #[test]
    fn test_fail_stop() {
        let (toolbox, calls) = toolbox(&[true, false, true]);
        let plan = Plan::new(vec![search("a"), search("b"), search("c")], "three");
        let mut log = InMemoryLog::new();

        let report = run(plan.into(), ConfirmationPolicy::PlanAndStep, &toolbox, &mut AutoConfirm(true), &mut log);

        assert_eq!(report.final_state, RunState::Failed);
        assert_eq!(report.aborted_at, Some(1));
        assert_eq!(report.stop_reason, Some(StopReason::StepFailed));
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.stopped_message().as_deref(), Some("plan stopped at step 2"));
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_plan_gate_decline_has_no_side_effects() {
        let (toolbox, calls) = toolbox(&[]);
        let plan = Plan::new(vec![search("a"), risky("b")], "risky");
        let mut log = InMemoryLog::new();

        let report = run(plan.into(), ConfirmationPolicy::PlanAndStep, &toolbox, &mut AutoConfirm(false), &mut log);

        assert_eq!(report.final_state, RunState::Aborted);
        assert_eq!(report.aborted_at, Some(0));
        assert_eq!(report.stop_reason, Some(StopReason::Declined));
        assert!(report.outcomes.is_empty());
        assert!(calls.borrow().is_empty());
        assert_eq!(log.count(EventKind::Declined), 1);
    }

    #[test]
    fn test_step_gate_prompts_again() {
        let (toolbox, calls) = toolbox(&[]);
        let plan = Plan::new(vec![search("a"), risky("b")], "risky");
        let mut confirmer = Scripted(VecDeque::from(vec![true, false]), Vec::new());

        let report = run(plan.into(), ConfirmationPolicy::PlanAndStep, &toolbox, &mut confirmer, &mut InMemoryLog::new());

        assert_eq!(confirmer.1.len(), 2);
        assert!(confirmer.1[1].starts_with("Step 2:"));
        assert_eq!(report.final_state, RunState::Aborted);
        assert_eq!(report.aborted_at, Some(1));
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(*calls.borrow(), vec!["a"]);
    }

    #[test]
    fn test_plan_only_policy_asks_once() {
        let (toolbox, calls) = toolbox(&[]);
        let plan = Plan::new(vec![search("a"), risky("b")], "risky");
        let mut confirmer = Scripted(VecDeque::from(vec![true]), Vec::new());

        let report = run(plan.into(), ConfirmationPolicy::PlanOnly, &toolbox, &mut confirmer, &mut InMemoryLog::new());

        assert_eq!(confirmer.1.len(), 1);
        assert!(report.succeeded());
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_first_step_not_asked_twice() {
        let (toolbox, _) = toolbox(&[]);
        let mut confirmer = Scripted(VecDeque::from(vec![true]), Vec::new());

        let report = run(risky("a").into(), ConfirmationPolicy::PlanAndStep, &toolbox, &mut confirmer, &mut InMemoryLog::new());

        assert_eq!(confirmer.1.len(), 1);
        assert!(report.succeeded());
    }

    #[test]
    fn test_clarification_stops_without_dispatch() {
        let (toolbox, calls) = toolbox(&[]);
        let clarify = Step::clarification("Which file?".into(), RiskLevel::Medium, "No matching intent");
        let plan = Plan::new(vec![search("a"), clarify, search("c")], "mixed");
        let mut log = InMemoryLog::new();

        let report = run(plan.into(), ConfirmationPolicy::PlanAndStep, &toolbox, &mut AutoConfirm(true), &mut log);

        assert_eq!(report.final_state, RunState::Aborted);
        assert_eq!(report.stop_reason, Some(StopReason::Clarification));
        assert_eq!(report.aborted_at, Some(1));
        assert_eq!(report.outcomes[1].output.as_deref(), Some("Which file?"));
        assert_eq!(*calls.borrow(), vec!["a"]);
        assert_eq!(log.count(EventKind::Clarification), 1);
    }

    #[test]
    fn test_missing_handler_fails_step() {
        let step = Step::new(Action::LaunchApp, Parameters::new(), String::new());
        let report = run(step.into(), ConfirmationPolicy::PlanAndStep, &Toolbox::new(), &mut AutoConfirm(true), &mut InMemoryLog::new());
        assert_eq!(report.final_state, RunState::Failed);
        assert_eq!(report.outcomes[0].message, "No handler registered for launch_app");
    }
}
