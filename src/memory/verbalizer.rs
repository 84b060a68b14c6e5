// src/memory/verbalizer.rs

use crate::config::Language;
use crate::protocol::{Action, ExecutionOutcome, Plan, Step};

/// Turns steps and outcomes into short operator-facing sentences.
#[derive(Clone, Copy, Debug, Default)]
pub struct Verbalizer {
    language: Language,
}

impl Verbalizer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// What the step is about to do.
    pub fn describe(&self, step: &Step) -> String {
        let text = |name: &str, fallback: &str| -> String {
            step.param(name)
                .map(|v| v.to_string())
                .unwrap_or_else(|| fallback.to_string())
        };

        match (self.language, step.action) {
            (Language::En, Action::AdjustSetting) => {
                format!("Setting {} to {}%", text("setting", "setting"), text("value", "?"))
            }
            (Language::Zh, Action::AdjustSetting) => {
                let setting = match step.text_param("setting") {
                    Some("volume") => "音量".to_string(),
                    Some("brightness") => "亮度".to_string(),
                    other => other.unwrap_or("设置").to_string(),
                };
                format!("好的，把{}调到{}%", setting, text("value", "?"))
            }
            (Language::En, Action::PlayMedia) => match step.text_param("query") {
                Some(query) => format!("Playing {query}"),
                None => match step.text_param("action").unwrap_or("play") {
                    "pause" => "Pausing music".to_string(),
                    "next" => "Skipping to the next track".to_string(),
                    "previous" => "Going back to the previous track".to_string(),
                    _ => "Playing music".to_string(),
                },
            },
            (Language::Zh, Action::PlayMedia) => match step.text_param("action").unwrap_or("play") {
                "pause" => "好的，暂停播放".to_string(),
                "next" => "好的，下一首".to_string(),
                "previous" => "好的，上一首".to_string(),
                _ => format!("好的，播放{}", text("query", "音乐")),
            },
            (Language::En, Action::WebSearch) => format!("Searching for {}", text("query", "that")),
            (Language::Zh, Action::WebSearch) => format!("好的，搜索{}", text("query", "内容")),
            (Language::En, Action::CreateNote) => format!("Creating note: {}", text("title", "note")),
            (Language::Zh, Action::CreateNote) => format!("好的，创建笔记：{}", text("title", "笔记")),
            (Language::En, Action::LaunchApp) => format!("Opening {}", text("app", "the app")),
            (Language::Zh, Action::LaunchApp) => format!("好的，打开{}", text("app", "应用")),
            (_, Action::RequestClarification) => {
                if step.spoken_response.is_empty() {
                    self.not_understood()
                } else {
                    step.spoken_response.clone()
                }
            }
        }
    }

    pub fn not_understood(&self) -> String {
        match self.language {
            Language::En => "Sorry, I didn't understand. Could you say that another way?".into(),
            Language::Zh => "抱歉，我不太理解您的意思，能具体说说吗？".into(),
        }
    }

    pub fn dangerous(&self, text: &str) -> String {
        match self.language {
            Language::En => format!("Are you sure you want to \"{text}\"? This may be risky."),
            Language::Zh => format!("您确定要执行「{text}」吗？这可能有风险。"),
        }
    }

    /// Prompt for the plan-level gate.
    pub fn plan_prompt(&self, plan: &Plan) -> String {
        if plan.len() == 1 {
            let step = &plan.steps[0];
            return match self.language {
                Language::En => format!("{}. Continue?", self.describe(step)),
                Language::Zh => format!("{}。继续执行？", self.describe(step)),
            };
        }

        let listed = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, self.describe(step)))
            .collect::<Vec<_>>()
            .join("; ");

        match self.language {
            Language::En => format!("About to run {} steps: {listed}. Continue?", plan.len()),
            Language::Zh => format!("即将执行{}个步骤：{listed}。继续执行？", plan.len()),
        }
    }

    /// Prompt for the step-level gate.
    pub fn step_prompt(&self, index: usize, step: &Step) -> String {
        match self.language {
            Language::En => format!("Step {}: {}. This step is risky. Continue?", index + 1, self.describe(step)),
            Language::Zh => format!("第{}步：{}。此步骤有风险，继续执行？", index + 1, self.describe(step)),
        }
    }

    pub fn result(&self, step: &Step, outcome: &ExecutionOutcome) -> String {
        if !outcome.succeeded {
            return match self.language {
                Language::En => format!("Sorry, that failed: {}", outcome.message),
                Language::Zh => format!("抱歉，操作失败了：{}", outcome.message),
            };
        }

        match (self.language, step.action) {
            (Language::En, Action::AdjustSetting) => "Setting updated".into(),
            (Language::En, Action::PlayMedia) => "Done".into(),
            (Language::En, Action::WebSearch) => "Search results are open".into(),
            (Language::En, Action::CreateNote) => "Note created".into(),
            (Language::En, Action::LaunchApp) => format!("Opened {}", step.text_param("app").unwrap_or("the app")),
            (Language::Zh, Action::AdjustSetting) => "设置已完成".into(),
            (Language::Zh, Action::PlayMedia) => "已为您播放".into(),
            (Language::Zh, Action::WebSearch) => "已打开搜索结果".into(),
            (Language::Zh, Action::CreateNote) => "笔记已创建".into(),
            (Language::Zh, Action::LaunchApp) => "操作已完成".into(),
            (_, Action::RequestClarification) => self.describe(step),
        }
    }

    pub fn stopped_at(&self, index: usize) -> String {
        match self.language {
            Language::En => format!("plan stopped at step {}", index + 1),
            Language::Zh => format!("计划在第{}步停止", index + 1),
        }
    }

    pub fn cancelled(&self) -> String {
        match self.language {
            Language::En => "Cancelled".into(),
            Language::Zh => "已取消".into(),
        }
    }
}
