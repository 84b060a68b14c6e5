// src/protocol/resolver.rs

use crate::config::Config;
use crate::error::ConfigError;
use crate::protocol::planner::{LlmPlanner, Planner};
use crate::protocol::rules::RulePlanner;
use crate::protocol::{Resolution, RiskAssessment, RiskLevel, Step};
use crate::tools::llm::LlmClient;
use crate::validation::{SchemaError, validate_resolution};
use tracing::{error, info, warn};

/// Decides which planner answers an utterance and validates whatever comes
/// back. Model failures never escape: they fall through to the rules.
pub struct Resolver {
    rules: RulePlanner,
    model: Option<Box<dyn Planner>>,
    confirm_dangerous: bool,
}

impl Resolver {
    pub fn new(rules: RulePlanner) -> Self {
        Self {
            rules,
            model: None,
            confirm_dangerous: true,
        }
    }

    pub fn with_model(mut self, model: Box<dyn Planner>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_confirm_dangerous(mut self, confirm: bool) -> Self {
        self.confirm_dangerous = confirm;
        self
    }

    /// Build the rule planner and, when credentials allow, the model planner.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let rules = RulePlanner::new(&config.rules, config.language)?;
        let resolver = Self::new(rules).with_confirm_dangerous(config.confirm_dangerous);

        match LlmClient::from_config(config) {
            Ok(client) => {
                info!(model = %client.model, "model resolver enabled");
                let planner = LlmPlanner::from_config(Box::new(client), config);
                Ok(resolver.with_model(Box::new(planner)))
            }
            Err(reason) => {
                info!("model resolver disabled: {}", reason);
                Ok(resolver)
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn resolve(&self, text: &str, use_model: bool) -> Result<Resolution, SchemaError> {
        info!("Planning for text: {}", text);

        if use_model {
            match &self.model {
                Some(model) => match model.plan(text) {
                    Ok(resolution) => {
                        let resolution = self.escalate(text, resolution);
                        match validate_resolution(&resolution) {
                            Ok(()) => {
                                info!(steps = resolution.steps().len(), "model resolved utterance");
                                return Ok(resolution);
                            }
                            Err(e) => warn!("model output rejected: {}, falling back to rules", e),
                        }
                    }
                    Err(failure) => warn!("model planning failed: {}, falling back to rules", failure),
                },
                None => warn!("model resolver not configured, using rules"),
            }
        }

        self.resolve_with_rules(text)
    }

    fn resolve_with_rules(&self, text: &str) -> Result<Resolution, SchemaError> {
        let resolution = self.rules.resolve(text);
        if let Err(e) = validate_resolution(&resolution) {
            error!("rule planner produced an invalid instruction: {}", e);
            return Err(e);
        }
        info!(steps = resolution.steps().len(), "rules resolved utterance");
        Ok(resolution)
    }

    /// Raise risk on model output when the utterance itself is destructive.
    fn escalate(&self, text: &str, resolution: Resolution) -> Resolution {
        if !self.confirm_dangerous || !self.rules.is_destructive(text) {
            return resolution;
        }

        match resolution {
            Resolution::Step(mut step) => {
                escalate_step(&mut step);
                Resolution::Step(step)
            }
            Resolution::Plan(mut plan) => {
                for step in plan.steps.iter_mut() {
                    if self.mentions_destructive(step) {
                        escalate_step(step);
                    }
                }
                if !plan.steps.iter().any(Step::is_risky) {
                    if let Some(first) = plan.steps.first_mut() {
                        escalate_step(first);
                    }
                }
                Resolution::Plan(plan)
            }
        }
    }

    fn mentions_destructive(&self, step: &Step) -> bool {
        self.rules.is_destructive(&step.spoken_response)
            || step
                .parameters
                .values()
                .filter_map(|v| v.as_str())
                .any(|v| self.rules.is_destructive(v))
    }
}

fn escalate_step(step: &mut Step) {
    if step.risk.level == RiskLevel::Low {
        step.risk = RiskAssessment::new(RiskLevel::High, "Dangerous keyword detected");
        step.needs_confirmation = true;
    }
}
