// src/config/mod.rs

use crate::error::ConfigError;
use crate::protocol::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "dispatch.toml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Language::En),
            "zh" | "zh-cn" | "chinese" => Ok(Language::Zh),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    Ollama,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            other => Err(other.to_string()),
        }
    }
}

/// When the controller asks the operator for confirmation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPolicy {
    /// One prompt before the plan starts.
    PlanOnly,
    /// The plan prompt, plus a prompt right before each later risky step.
    #[default]
    PlanAndStep,
}

/// Immutable process configuration. Built once in `main`, passed by reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    pub language: Language,
    pub confirm_dangerous: bool,
    pub confirmation: ConfirmationPolicy,
    pub prompts_dir: PathBuf,
    pub search_url: String,
    pub log_level: String,
    pub rules: RuleSet,
    /// The TOML file this was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// The `.env` file that was loaded, if any.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            api_key: None,
            api_url: None,
            model: "claude-3-5-sonnet-20241022".into(),
            temperature: 0.2,
            max_tokens: 1024,
            max_attempts: 1,
            language: Language::En,
            confirm_dangerous: true,
            confirmation: ConfirmationPolicy::PlanAndStep,
            prompts_dir: PathBuf::from("prompts"),
            search_url: "https://www.google.com/search".into(),
            log_level: "info".into(),
            rules: RuleSet::default(),
            source: None,
            env_file: None,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (explicit path, or `dispatch.toml` if it
    /// exists), then `.env` and process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.env_file = dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&raw)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("LLM_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.provider = parse_value("LLM_PROVIDER", &provider)?;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.model = model;
        }
        if let Some(temperature) = lookup("LLM_TEMPERATURE") {
            self.temperature = parse_value("LLM_TEMPERATURE", &temperature)?;
        }
        if let Some(max_tokens) = lookup("LLM_MAX_TOKENS") {
            self.max_tokens = parse_value("LLM_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(attempts) = lookup("LLM_MAX_ATTEMPTS") {
            self.max_attempts = parse_value("LLM_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(lang) = lookup("DISPATCH_LANG") {
            self.language = parse_value("DISPATCH_LANG", &lang)?;
        }
        if let Some(confirm) = lookup("CONFIRM_DANGEROUS") {
            self.confirm_dangerous = parse_value("CONFIRM_DANGEROUS", &confirm.to_lowercase())?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        Ok(())
    }

    /// A model resolver can only be built with credentials, except for a
    /// local Ollama endpoint.
    pub fn model_available(&self) -> bool {
        match self.provider {
            Provider::Anthropic => self.api_key.is_some(),
            Provider::Ollama => true,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
