// src/protocol/planner.rs

use crate::config::Config;
use crate::error::ResolutionFailure;
use crate::protocol::{Action, Resolution};
use crate::tools::llm::{Example, LanguageService};
use crate::validation::parse_resolution;
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, info, warn};

/// A resolver that may fail. The coordinator treats every failure the same
/// way: discard and fall back.
pub trait Planner {
    fn plan(&self, text: &str) -> Result<Resolution, ResolutionFailure>;
}

/// Model-backed planner: prompt + few-shot examples in, validated
/// `Resolution` out.
pub struct LlmPlanner {
    service: Box<dyn LanguageService>,
    system_prompt: String,
    examples: Vec<Example>,
    max_attempts: u32,
}

impl LlmPlanner {
    pub fn new(service: Box<dyn LanguageService>) -> Self {
        Self {
            service,
            system_prompt: default_system_prompt(),
            examples: default_examples(),
            max_attempts: 1,
        }
    }

    /// Uses `system.txt` and `fewshot.jsonl` from the prompts directory when
    /// they exist.
    pub fn from_config(service: Box<dyn LanguageService>, config: &Config) -> Self {
        let mut planner = Self::new(service).with_max_attempts(config.max_attempts);

        let system_path = config.prompts_dir.join("system.txt");
        match std::fs::read_to_string(&system_path) {
            Ok(prompt) if !prompt.trim().is_empty() => {
                info!(path = %system_path.display(), "using custom system prompt");
                planner = planner.with_system_prompt(prompt.trim());
            }
            _ => {}
        }

        let fewshot_path = config.prompts_dir.join("fewshot.jsonl");
        if fewshot_path.exists() {
            match load_examples(&fewshot_path) {
                Ok(examples) if !examples.is_empty() => {
                    info!(count = examples.len(), "using few-shot examples from {}", fewshot_path.display());
                    planner = planner.with_examples(examples);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to load few-shot examples: {}", e),
            }
        }

        planner
    }

    pub fn with_examples(mut self, examples: Vec<Example>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn attempt(&self, utterance: &str) -> Result<Resolution, ResolutionFailure> {
        let raw = self
            .service
            .complete(&self.system_prompt, &self.examples, utterance)?;
        debug!(raw = %raw, "model output");

        let json = extract_json(&raw)
            .ok_or_else(|| ResolutionFailure::Malformed("no JSON object in response".into()))?;

        let value: Value = serde_json::from_str(json)
            .map_err(|e| ResolutionFailure::Malformed(format!("{e}")))?;

        parse_resolution(value).map_err(|errors| {
            for error in &errors {
                match error.hint() {
                    Some(hint) => debug!("schema error: {} (expected {})", error, hint),
                    None => debug!("schema error: {}", error),
                }
            }
            ResolutionFailure::Schema(errors)
        })
    }
}

impl Planner for LlmPlanner {
    fn plan(&self, text: &str) -> Result<Resolution, ResolutionFailure> {
        let mut last_failure = ResolutionFailure::Unavailable("no attempts made".into());

        for attempt in 0..self.max_attempts {
            let utterance = if attempt == 0 {
                text.to_string()
            } else {
                format!(
                    "The previous output was invalid. Output ONLY valid JSON matching the schema. User request: {text}"
                )
            };

            debug!("model attempt {}/{}", attempt + 1, self.max_attempts);
            match self.attempt(&utterance) {
                Ok(resolution) => return Ok(resolution),
                Err(failure) => {
                    warn!("model attempt {} failed: {}", attempt + 1, failure);
                    last_failure = failure;
                }
            }
        }

        Err(last_failure)
    }
}

/// Pull the outermost JSON object out of a model reply. Drops a leading
/// `<think>` section and markdown fences; does not touch the object itself.
pub fn extract_json(raw: &str) -> Option<&str> {
    let body = match raw.rfind("</think>") {
        Some(end) => &raw[end + "</think>".len()..],
        None => raw,
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

/// Read `{"user": ..., "assistant": ...}` lines. Blank lines are skipped.
pub fn load_examples(path: &Path) -> Result<Vec<Example>, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    raw.lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Example>(line).map_err(|e| format!("line {}: {}", i + 1, e))
        })
        .collect()
}

pub fn default_system_prompt() -> String {
    let actions = Action::ALL
        .iter()
        .map(|action| {
            let required = action
                .required_params()
                .iter()
                .map(|(name, kind)| format!("{name}: {kind}"))
                .collect::<Vec<_>>();
            let optional = action
                .optional_params()
                .iter()
                .map(|(name, kind)| format!("{name}?: {kind}"))
                .collect::<Vec<_>>();
            let params = [required, optional].concat().join(", ");
            format!("- {}({})", action.wire_name(), params)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a command planner for a desktop voice assistant.

Your ONLY job is to output valid JSON. For a single action:
{{"action": "<action>", "parameters": {{}}, "needs_confirmation": false, "spoken_response": "", "risk": {{"level": "low", "reason": ""}}}}

For a request with several actions in sequence:
{{"plan": [<action objects in order>], "summary": "<one line>"}}

Actions and their parameters:
{actions}

Rules:
1. Output ONLY minified JSON, no markdown, no prose, no explanations.
2. If the request is unsafe or ambiguous, use request_clarification with needs_confirmation=true.
3. Dangerous operations (delete, format, shutdown) get risk.level="high".
4. spoken_response is brief (under 20 words) and in the user's language.
5. Never add fields that are not listed above."#
    )
}

pub fn default_examples() -> Vec<Example> {
    vec![
        Example {
            user: "set volume to 30%".into(),
            assistant: json!({
                "action": "adjust_setting",
                "parameters": {"setting": "volume", "value": 30},
                "needs_confirmation": false,
                "spoken_response": "Setting volume to 30%",
                "risk": {"level": "low", "reason": ""}
            }),
        },
        Example {
            user: "search for Python tutorials".into(),
            assistant: json!({
                "action": "web_search",
                "parameters": {"query": "Python tutorials"},
                "needs_confirmation": false,
                "spoken_response": "Searching for Python tutorials",
                "risk": {"level": "low", "reason": ""}
            }),
        },
        Example {
            user: "open Safari then search for Python tutorials".into(),
            assistant: json!({
                "plan": [
                    {
                        "action": "launch_app",
                        "parameters": {"app": "Safari"},
                        "needs_confirmation": false,
                        "spoken_response": "Opening Safari",
                        "risk": {"level": "low", "reason": ""}
                    },
                    {
                        "action": "web_search",
                        "parameters": {"query": "Python tutorials"},
                        "needs_confirmation": false,
                        "spoken_response": "Searching for Python tutorials",
                        "risk": {"level": "low", "reason": ""}
                    }
                ],
                "summary": "Open Safari, then search for Python tutorials"
            }),
        },
        Example {
            user: "delete all files".into(),
            assistant: json!({
                "action": "request_clarification",
                "parameters": {},
                "needs_confirmation": true,
                "spoken_response": "Deleting files is risky. Which files do you mean?",
                "risk": {"level": "high", "reason": "destructive operation"}
            }),
        },
        Example {
            user: "记录明天下午三点开会".into(),
            assistant: json!({
                "action": "create_note",
                "parameters": {"title": "明天下午三点开会", "body": "明天下午三点开会"},
                "needs_confirmation": false,
                "spoken_response": "好的，创建笔记",
                "risk": {"level": "low", "reason": ""}
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct ScriptedService {
        replies: RefCell<Vec<Result<String, ResolutionFailure>>>,
        calls: Cell<usize>,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<String, ResolutionFailure>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                calls: Cell::new(0),
            }
        }
    }

    impl LanguageService for &'static ScriptedService {
        fn complete(&self, _: &str, _: &[Example], _: &str) -> Result<String, ResolutionFailure> {
            self.calls.set(self.calls.get() + 1);
            self.replies.borrow_mut().remove(0)
        }
    }

    fn leak(service: ScriptedService) -> &'static ScriptedService {
        Box::leak(Box::new(service))
    }

    #[test]
    fn test_extract_json_strips_fences_and_think() {
        let raw = "<think>maybe {\"x\": 1}</think>\n```json\n{\"action\": \"web_search\"}\n```";
        assert_eq!(extract_json(raw), Some("{\"action\": \"web_search\"}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_valid_step_output() {
        let service = leak(ScriptedService::new(vec![Ok(
            r#"{"action":"web_search","parameters":{"query":"rust"}}"#.into(),
        )]));
        let planner = LlmPlanner::new(Box::new(service));
        let resolution = planner.plan("search rust").unwrap();
        assert_eq!(resolution.as_step().unwrap().text_param("query"), Some("rust"));
    }

    #[test]
    fn test_valid_plan_output() {
        let service = leak(ScriptedService::new(vec![Ok(r#"{"plan":[
            {"action":"launch_app","parameters":{"app":"Safari"}},
            {"action":"web_search","parameters":{"query":"rust"}}
        ],"summary":"two"}"#
            .into())]));
        let planner = LlmPlanner::new(Box::new(service));
        let resolution = planner.plan("open safari then search rust").unwrap();
        assert_eq!(resolution.as_plan().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_output_is_failure() {
        let service = leak(ScriptedService::new(vec![Ok(r#"{"action": "web_search",}"#.into())]));
        let planner = LlmPlanner::new(Box::new(service));
        assert!(matches!(planner.plan("x"), Err(ResolutionFailure::Malformed(_))));
    }

    #[test]
    fn test_unknown_action_is_schema_failure() {
        let service = leak(ScriptedService::new(vec![Ok(r#"{"action":"format_disk"}"#.into())]));
        let planner = LlmPlanner::new(Box::new(service));
        assert!(matches!(planner.plan("x"), Err(ResolutionFailure::Schema(_))));
    }

    #[test]
    fn test_single_attempt_by_default() {
        let service = leak(ScriptedService::new(vec![
            Err(ResolutionFailure::Service("down".into())),
            Ok(r#"{"action":"web_search","parameters":{"query":"rust"}}"#.into()),
        ]));
        let planner = LlmPlanner::new(Box::new(service));
        assert!(matches!(planner.plan("x"), Err(ResolutionFailure::Service(_))));
        assert_eq!(service.calls.get(), 1);
    }

    #[test]
    fn test_retry_when_configured() {
        let service = leak(ScriptedService::new(vec![
            Ok("sorry, I can't".into()),
            Ok(r#"{"action":"web_search","parameters":{"query":"rust"}}"#.into()),
        ]));
        let planner = LlmPlanner::new(Box::new(service)).with_max_attempts(2);
        assert!(planner.plan("x").is_ok());
        assert_eq!(service.calls.get(), 2);
    }

    #[test]
    fn test_default_examples_are_schema_valid() {
        for example in default_examples() {
            assert!(
                parse_resolution(example.assistant.clone()).is_ok(),
                "example '{}' is invalid",
                example.user
            );
        }
    }

    fn planner_from_dir(dir: &Path) -> LlmPlanner {
        let config = Config {
            prompts_dir: dir.to_path_buf(),
            ..Config::default()
        };
        let service = leak(ScriptedService::new(Vec::new()));
        LlmPlanner::from_config(Box::new(service), &config)
    }

    #[test]
    fn test_prompts_dir_overrides_prompt_and_examples() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("system.txt"), "  Reply with JSON only.\n").unwrap();
        std::fs::write(
            dir.path().join("fewshot.jsonl"),
            concat!(
                r#"{"user": "mute", "assistant": {"action": "adjust_setting", "parameters": {"setting": "volume", "value": 0}}}"#,
                "\n\n",
                r#"{"user": "open Mail", "assistant": {"action": "launch_app", "parameters": {"app": "Mail"}}}"#,
                "\n"
            ),
        )
        .unwrap();

        let planner = planner_from_dir(dir.path());
        assert_eq!(planner.system_prompt, "Reply with JSON only.");
        assert_eq!(planner.examples.len(), 2);
        assert_eq!(planner.examples[1].user, "open Mail");
    }

    #[test]
    fn test_malformed_fewshot_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fewshot.jsonl"),
            "{\"user\": \"mute\", \"assistant\": {}}\n\n{not json\n",
        )
        .unwrap();

        let err = load_examples(&dir.path().join("fewshot.jsonl")).unwrap_err();
        assert!(err.starts_with("line 3:"), "{err}");

        let planner = planner_from_dir(dir.path());
        assert_eq!(planner.examples, default_examples());
        assert_eq!(planner.system_prompt, default_system_prompt());
    }

    #[test]
    fn test_missing_prompts_dir_uses_defaults() {
        let planner = planner_from_dir(Path::new("/nonexistent/prompts"));
        assert_eq!(planner.examples.len(), default_examples().len());
    }

    #[test]
    fn test_system_prompt_lists_every_action() {
        let prompt = default_system_prompt();
        for action in Action::ALL {
            assert!(prompt.contains(action.wire_name()));
        }
        assert!(prompt.contains("adjust_setting(setting: text, value: number)"));
    }
}
