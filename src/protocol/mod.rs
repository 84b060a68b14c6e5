// src/protocol/mod.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod planner;
pub mod resolver;
pub mod rules;

/// The closed set of actions the dispatcher knows how to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[serde(alias = "system_setting")]
    AdjustSetting,
    #[serde(alias = "play_music")]
    PlayMedia,
    WebSearch,
    #[serde(alias = "write_note")]
    CreateNote,
    #[serde(alias = "control_app")]
    LaunchApp,
    #[serde(alias = "clarify")]
    RequestClarification,
}

/// Primitive type a parameter value must have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Number,
    Flag,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Text => "text",
            ParamKind::Number => "number",
            ParamKind::Flag => "boolean",
        };
        f.write_str(name)
    }
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::AdjustSetting,
        Action::PlayMedia,
        Action::WebSearch,
        Action::CreateNote,
        Action::LaunchApp,
        Action::RequestClarification,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Action::AdjustSetting => "adjust_setting",
            Action::PlayMedia => "play_media",
            Action::WebSearch => "web_search",
            Action::CreateNote => "create_note",
            Action::LaunchApp => "launch_app",
            Action::RequestClarification => "request_clarification",
        }
    }

    /// Parameters that must be present, with their primitive type.
    pub fn required_params(&self) -> &'static [(&'static str, ParamKind)] {
        match self {
            Action::AdjustSetting => &[("setting", ParamKind::Text), ("value", ParamKind::Number)],
            Action::PlayMedia => &[("action", ParamKind::Text)],
            Action::WebSearch => &[("query", ParamKind::Text)],
            Action::CreateNote => &[("title", ParamKind::Text), ("body", ParamKind::Text)],
            Action::LaunchApp => &[("app", ParamKind::Text)],
            Action::RequestClarification => &[],
        }
    }

    /// Parameters that may be present; when they are, their type is checked.
    pub fn optional_params(&self) -> &'static [(&'static str, ParamKind)] {
        match self {
            Action::PlayMedia => &[("query", ParamKind::Text)],
            Action::LaunchApp => &[("url", ParamKind::Text)],
            Action::RequestClarification => &[("question", ParamKind::Text)],
            _ => &[],
        }
    }

    /// Clarification never touches the host.
    pub fn has_side_effects(&self) -> bool {
        !matches!(self, Action::RequestClarification)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adjust_setting" | "system_setting" => Ok(Action::AdjustSetting),
            "play_media" | "play_music" => Ok(Action::PlayMedia),
            "web_search" => Ok(Action::WebSearch),
            "create_note" | "write_note" => Ok(Action::CreateNote),
            "launch_app" | "control_app" => Ok(Action::LaunchApp),
            "request_clarification" | "clarify" => Ok(Action::RequestClarification),
            other => Err(other.to_string()),
        }
    }
}

/// A single parameter value. Untagged so it reads naturally from model JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Flag(_) => ParamKind::Flag,
            ParamValue::Int(_) | ParamValue::Float(_) => ParamKind::Number,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(n) => Some(*n as f64),
            ParamValue::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(b) => write!(f, "{b}"),
            ParamValue::Int(n) => write!(f, "{n}"),
            ParamValue::Float(n) => write!(f, "{n}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

pub type Parameters = BTreeMap<String, ParamValue>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    #[serde(default)]
    pub reason: String,
}

impl RiskAssessment {
    pub fn new(level: RiskLevel, reason: &str) -> Self {
        Self {
            level,
            reason: reason.to_string(),
        }
    }
}

/// One resolved action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub action: Action,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub needs_confirmation: bool,
    #[serde(default)]
    pub spoken_response: String,
    #[serde(default)]
    pub risk: RiskAssessment,
}

impl Step {
    pub fn new(action: Action, parameters: Parameters, spoken_response: String) -> Self {
        Self {
            action,
            parameters,
            needs_confirmation: false,
            spoken_response,
            risk: RiskAssessment::default(),
        }
    }

    /// A clarification question. Always requires confirmation.
    pub fn clarification(spoken_response: String, level: RiskLevel, reason: &str) -> Self {
        Self {
            action: Action::RequestClarification,
            parameters: Parameters::new(),
            needs_confirmation: true,
            spoken_response,
            risk: RiskAssessment::new(level, reason),
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    pub fn text_param(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(ParamValue::as_str)
    }

    /// Risky steps go through the confirmation gate.
    pub fn is_risky(&self) -> bool {
        self.needs_confirmation || self.risk.level == RiskLevel::High
    }
}

/// An ordered, non-empty sequence of steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    #[serde(rename = "plan")]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub summary: String,
}

impl Plan {
    pub fn new(steps: Vec<Step>, summary: &str) -> Self {
        Self {
            steps,
            summary: summary.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// What a resolver hands back: one step or a sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Step(Step),
    Plan(Plan),
}

impl Resolution {
    pub fn steps(&self) -> &[Step] {
        match self {
            Resolution::Step(step) => std::slice::from_ref(step),
            Resolution::Plan(plan) => &plan.steps,
        }
    }

    pub fn is_plan(&self) -> bool {
        matches!(self, Resolution::Plan(_))
    }

    pub fn as_step(&self) -> Option<&Step> {
        match self {
            Resolution::Step(step) => Some(step),
            Resolution::Plan(_) => None,
        }
    }

    pub fn as_plan(&self) -> Option<&Plan> {
        match self {
            Resolution::Plan(plan) => Some(plan),
            Resolution::Step(_) => None,
        }
    }

    /// Wrap a bare step into a one-element plan.
    pub fn into_plan(self) -> Plan {
        match self {
            Resolution::Plan(plan) => plan,
            Resolution::Step(step) => {
                let summary = step.spoken_response.clone();
                Plan {
                    steps: vec![step],
                    summary,
                }
            }
        }
    }
}

impl From<Step> for Resolution {
    fn from(step: Step) -> Self {
        Resolution::Step(step)
    }
}

impl From<Plan> for Resolution {
    fn from(plan: Plan) -> Self {
        Resolution::Plan(plan)
    }
}

/// The result of attempting one step.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOutcome {
    pub succeeded: bool,
    pub message: String,
    pub output: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(message: &str, output: Option<String>) -> Self {
        Self {
            succeeded: true,
            message: message.to_string(),
            output,
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            succeeded: false,
            message: message.to_string(),
            output: None,
        }
    }
}
