// src/validation/plan.rs

use crate::protocol::{Action, ParamKind, Plan, Resolution, Step};
use serde_json::{Map, Value, json};
use thiserror::Error;

const STEP_FIELDS: [&str; 5] = [
    "action",
    "parameters",
    "needs_confirmation",
    "spoken_response",
    "risk",
];
const PLAN_FIELDS: [&str; 2] = ["plan", "summary"];
const RISK_LEVELS: [&str; 3] = ["low", "medium", "high"];

/// A structural violation of the instruction schema.
///
/// `at` names where the problem sits, e.g. `step` or `plan[2]`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{at}: expected a JSON object")]
    NotAnObject { at: String },

    #[error("{at}: unexpected field '{field}'")]
    UnexpectedField { at: String, field: String },

    #[error("{at}: missing required field '{field}'")]
    MissingField { at: String, field: &'static str },

    #[error("{at}: field '{field}' must be {expected}")]
    WrongFieldType {
        at: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{at}: unknown action '{action}'")]
    UnknownAction { at: String, action: String },

    #[error("{at}: action '{action}' requires parameter '{name}'")]
    MissingParameter {
        at: String,
        action: Action,
        name: &'static str,
    },

    #[error("{at}: parameter '{name}' must be {expected}")]
    WrongParameterType {
        at: String,
        name: String,
        expected: ParamKind,
    },

    #[error("{at}: parameter '{name}' is not a string, number or boolean")]
    NonPrimitiveParameter { at: String, name: String },

    #[error("{at}: unknown risk level '{level}'")]
    UnknownRiskLevel { at: String, level: String },

    #[error("plan must contain at least one step")]
    EmptyPlan,

    #[error("{at}: clarification must require confirmation")]
    ClarificationUnconfirmed { at: String },

    #[error("{0}")]
    Malformed(String),
}

impl SchemaError {
    /// An example of the expected shape, for log output.
    pub fn hint(&self) -> Option<Value> {
        match self {
            SchemaError::UnknownAction { .. } => Some(json!({
                "action": Action::ALL.iter().map(|a| a.wire_name()).collect::<Vec<_>>()
            })),
            SchemaError::MissingParameter { name, .. } => Some(json!({ name.to_string(): "<required>" })),
            SchemaError::MissingField { field, .. } => Some(json!({ field.to_string(): "<required>" })),
            SchemaError::UnknownRiskLevel { .. } => Some(json!({ "level": RISK_LEVELS })),
            SchemaError::ClarificationUnconfirmed { .. } => Some(json!({
                "action": "request_clarification",
                "needs_confirmation": true
            })),
            _ => None,
        }
    }
}

/// Validate raw structured output. Collects every problem found.
///
/// An object carrying a `plan` key is checked as a plan, anything else as a
/// single step.
pub fn validate_value(value: &Value) -> Vec<SchemaError> {
    let mut errors = Vec::new();

    let Some(object) = value.as_object() else {
        errors.push(SchemaError::NotAnObject { at: "root".into() });
        return errors;
    };

    if object.contains_key("plan") {
        validate_plan_object(object, &mut errors);
    } else {
        validate_step_object(object, "step", &mut errors);
    }

    errors
}

fn validate_plan_object(object: &Map<String, Value>, errors: &mut Vec<SchemaError>) {
    for key in object.keys() {
        if !PLAN_FIELDS.contains(&key.as_str()) {
            errors.push(SchemaError::UnexpectedField {
                at: "plan".into(),
                field: key.clone(),
            });
        }
    }

    if let Some(summary) = object.get("summary") {
        if !summary.is_string() {
            errors.push(SchemaError::WrongFieldType {
                at: "plan".into(),
                field: "summary",
                expected: "a string",
            });
        }
    }

    let Some(steps) = object.get("plan").and_then(|v| v.as_array()) else {
        errors.push(SchemaError::WrongFieldType {
            at: "plan".into(),
            field: "plan",
            expected: "an array of steps",
        });
        return;
    };

    if steps.is_empty() {
        errors.push(SchemaError::EmptyPlan);
    }

    for (index, step) in steps.iter().enumerate() {
        let at = format!("plan[{index}]");
        match step.as_object() {
            Some(step) => validate_step_object(step, &at, errors),
            None => errors.push(SchemaError::NotAnObject { at }),
        }
    }
}

fn validate_step_object(object: &Map<String, Value>, at: &str, errors: &mut Vec<SchemaError>) {
    for key in object.keys() {
        if !STEP_FIELDS.contains(&key.as_str()) {
            errors.push(SchemaError::UnexpectedField {
                at: at.to_string(),
                field: key.clone(),
            });
        }
    }

    let action = match object.get("action") {
        None => {
            errors.push(SchemaError::MissingField {
                at: at.to_string(),
                field: "action",
            });
            None
        }
        Some(Value::String(name)) => match name.parse::<Action>() {
            Ok(action) => Some(action),
            Err(unknown) => {
                errors.push(SchemaError::UnknownAction {
                    at: at.to_string(),
                    action: unknown,
                });
                None
            }
        },
        Some(_) => {
            errors.push(SchemaError::WrongFieldType {
                at: at.to_string(),
                field: "action",
                expected: "a string",
            });
            None
        }
    };

    let needs_confirmation = match object.get("needs_confirmation") {
        None => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            errors.push(SchemaError::WrongFieldType {
                at: at.to_string(),
                field: "needs_confirmation",
                expected: "a boolean",
            });
            false
        }
    };

    if let Some(spoken) = object.get("spoken_response") {
        if !spoken.is_string() {
            errors.push(SchemaError::WrongFieldType {
                at: at.to_string(),
                field: "spoken_response",
                expected: "a string",
            });
        }
    }

    if let Some(risk) = object.get("risk") {
        validate_risk(risk, at, errors);
    }

    let empty = Map::new();
    let parameters = match object.get("parameters") {
        None => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            errors.push(SchemaError::WrongFieldType {
                at: at.to_string(),
                field: "parameters",
                expected: "an object",
            });
            return;
        }
    };

    for (name, value) in parameters {
        if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
            errors.push(SchemaError::NonPrimitiveParameter {
                at: at.to_string(),
                name: name.clone(),
            });
        }
    }

    let Some(action) = action else {
        return;
    };

    for (name, kind) in action.required_params() {
        match parameters.get(*name) {
            None => errors.push(SchemaError::MissingParameter {
                at: at.to_string(),
                action,
                name: *name,
            }),
            Some(value) => check_value_kind(value, name, *kind, at, errors),
        }
    }

    for (name, kind) in action.optional_params() {
        if let Some(value) = parameters.get(*name) {
            check_value_kind(value, name, *kind, at, errors);
        }
    }

    if action == Action::RequestClarification && !needs_confirmation {
        errors.push(SchemaError::ClarificationUnconfirmed { at: at.to_string() });
    }
}

fn validate_risk(risk: &Value, at: &str, errors: &mut Vec<SchemaError>) {
    let Some(risk) = risk.as_object() else {
        errors.push(SchemaError::WrongFieldType {
            at: at.to_string(),
            field: "risk",
            expected: "an object",
        });
        return;
    };

    for key in risk.keys() {
        if key != "level" && key != "reason" {
            errors.push(SchemaError::UnexpectedField {
                at: format!("{at}.risk"),
                field: key.clone(),
            });
        }
    }

    match risk.get("level") {
        None => errors.push(SchemaError::MissingField {
            at: format!("{at}.risk"),
            field: "level",
        }),
        Some(Value::String(level)) if RISK_LEVELS.contains(&level.as_str()) => {}
        Some(Value::String(level)) => errors.push(SchemaError::UnknownRiskLevel {
            at: at.to_string(),
            level: level.clone(),
        }),
        Some(_) => errors.push(SchemaError::WrongFieldType {
            at: format!("{at}.risk"),
            field: "level",
            expected: "a string",
        }),
    }

    if let Some(reason) = risk.get("reason") {
        if !reason.is_string() {
            errors.push(SchemaError::WrongFieldType {
                at: format!("{at}.risk"),
                field: "reason",
                expected: "a string",
            });
        }
    }
}

fn check_value_kind(
    value: &Value,
    name: &str,
    expected: ParamKind,
    at: &str,
    errors: &mut Vec<SchemaError>,
) {
    let matches = match expected {
        ParamKind::Text => value.is_string(),
        ParamKind::Number => value.is_number(),
        ParamKind::Flag => value.is_boolean(),
    };
    if !matches {
        errors.push(SchemaError::WrongParameterType {
            at: at.to_string(),
            name: name.to_string(),
            expected,
        });
    }
}

/// Validate raw output and convert it into a typed `Resolution`.
pub fn parse_resolution(value: Value) -> Result<Resolution, Vec<SchemaError>> {
    let errors = validate_value(&value);
    if !errors.is_empty() {
        return Err(errors);
    }

    let is_plan = value.get("plan").is_some();
    let resolution = if is_plan {
        serde_json::from_value::<Plan>(value).map(Resolution::Plan)
    } else {
        serde_json::from_value::<Step>(value).map(Resolution::Step)
    };

    resolution.map_err(|e| vec![SchemaError::Malformed(e.to_string())])
}

/// Typed counterpart of `validate_value` for a single step.
pub fn validate_step(step: &Step) -> Result<(), SchemaError> {
    check_typed_step(step, "step")
}

pub fn validate_resolution(resolution: &Resolution) -> Result<(), SchemaError> {
    match resolution {
        Resolution::Step(step) => validate_step(step),
        Resolution::Plan(plan) => {
            if plan.steps.is_empty() {
                return Err(SchemaError::EmptyPlan);
            }
            for (index, step) in plan.steps.iter().enumerate() {
                check_typed_step(step, &format!("plan[{index}]"))?;
            }
            Ok(())
        }
    }
}

fn check_typed_step(step: &Step, at: &str) -> Result<(), SchemaError> {
    for (name, kind) in step.action.required_params() {
        let Some(value) = step.param(name) else {
            return Err(SchemaError::MissingParameter {
                at: at.to_string(),
                action: step.action,
                name: *name,
            });
        };
        if value.kind() != *kind {
            return Err(SchemaError::WrongParameterType {
                at: at.to_string(),
                name: name.to_string(),
                expected: *kind,
            });
        }
    }

    for (name, kind) in step.action.optional_params() {
        if let Some(value) = step.param(name) {
            if value.kind() != *kind {
                return Err(SchemaError::WrongParameterType {
                    at: at.to_string(),
                    name: name.to_string(),
                    expected: *kind,
                });
            }
        }
    }

    if step.action == Action::RequestClarification && !step.needs_confirmation {
        return Err(SchemaError::ClarificationUnconfirmed { at: at.to_string() });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Parameters, RiskLevel};

    #[test]
    fn test_valid_step_passes() {
        let value = json!({
            "action": "adjust_setting",
            "parameters": {"setting": "volume", "value": 30},
            "needs_confirmation": false,
            "spoken_response": "Setting volume to 30%",
            "risk": {"level": "low", "reason": ""}
        });
        assert!(validate_value(&value).is_empty());
        let resolution = parse_resolution(value).unwrap();
        assert_eq!(resolution.as_step().unwrap().action, Action::AdjustSetting);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let errors = validate_value(&json!({"action": "format_disk"}));
        assert!(matches!(
            errors.as_slice(),
            [SchemaError::UnknownAction { action, .. }] if action == "format_disk"
        ));
    }

    #[test]
    fn test_missing_parameter_rejected() {
        let errors = validate_value(&json!({
            "action": "create_note",
            "parameters": {"title": "groceries"}
        }));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            SchemaError::MissingParameter { name: "body", .. }
        ));
    }

    #[test]
    fn test_wrong_parameter_type_rejected() {
        let errors = validate_value(&json!({
            "action": "adjust_setting",
            "parameters": {"setting": "volume", "value": "thirty"}
        }));
        assert!(matches!(
            &errors[0],
            SchemaError::WrongParameterType { expected: ParamKind::Number, .. }
        ));
    }

    #[test]
    fn test_extraneous_top_level_field_rejected() {
        let errors = validate_value(&json!({
            "action": "web_search",
            "parameters": {"query": "rust"},
            "confidence": 0.9
        }));
        assert!(matches!(
            &errors[0],
            SchemaError::UnexpectedField { field, .. } if field == "confidence"
        ));
    }

    #[test]
    fn test_plan_errors_carry_step_index() {
        let errors = validate_value(&json!({
            "plan": [
                {"action": "launch_app", "parameters": {"app": "Safari"}},
                {"action": "web_search"}
            ],
            "summary": "open and search"
        }));
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SchemaError::MissingParameter { at, .. } if at == "plan[1]"));
    }

    #[test]
    fn test_empty_plan_rejected() {
        let errors = validate_value(&json!({"plan": []}));
        assert_eq!(errors, vec![SchemaError::EmptyPlan]);
    }

    #[test]
    fn test_clarification_without_confirmation_rejected() {
        let errors = validate_value(&json!({"action": "clarify"}));
        assert!(matches!(&errors[0], SchemaError::ClarificationUnconfirmed { .. }));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            validate_value(&json!(["web_search"])).as_slice(),
            [SchemaError::NotAnObject { .. }]
        ));
    }

    #[test]
    fn test_unknown_risk_level_rejected() {
        let errors = validate_value(&json!({
            "action": "web_search",
            "parameters": {"query": "rust"},
            "risk": {"level": "extreme", "reason": ""}
        }));
        assert!(matches!(&errors[0], SchemaError::UnknownRiskLevel { .. }));
    }

    #[test]
    fn test_typed_validation_checks_required_params() {
        let step = Step::new(Action::LaunchApp, Parameters::new(), String::new());
        assert!(matches!(
            validate_step(&step),
            Err(SchemaError::MissingParameter { name: "app", .. })
        ));

        let clarify = Step::clarification("?".into(), RiskLevel::Medium, "");
        assert!(validate_step(&clarify).is_ok());
    }

    #[test]
    fn test_hint_for_unknown_action_lists_actions() {
        let hint = SchemaError::UnknownAction {
            at: "step".into(),
            action: "x".into(),
        }
        .hint()
        .unwrap();
        assert!(hint["action"].as_array().unwrap().len() == Action::ALL.len());
    }
}
