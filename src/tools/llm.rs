// src/tools/llm.rs

use crate::config::{Config, Provider};
use crate::error::ResolutionFailure;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

pub const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
pub const OLLAMA_URL: &str = "http://localhost:11434/api/generate";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One worked example shown to the model: an utterance and the structured
/// output expected for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub user: String,
    pub assistant: Value,
}

/// The language-understanding service boundary.
pub trait LanguageService {
    fn complete(
        &self,
        system: &str,
        examples: &[Example],
        utterance: &str,
    ) -> Result<String, ResolutionFailure>;
}

/// Blocking HTTP client for Anthropic or a local Ollama server.
pub struct LlmClient {
    client: reqwest::blocking::Client,
    provider: Provider,
    api_key: Option<String>,
    api_url: String,
    pub model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(provider: Provider, model: &str) -> Self {
        let api_url = match provider {
            Provider::Anthropic => ANTHROPIC_URL,
            Provider::Ollama => OLLAMA_URL,
        };
        Self {
            client: reqwest::blocking::Client::new(),
            provider,
            api_key: None,
            api_url: api_url.to_string(),
            model: model.to_string(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ResolutionFailure> {
        if !config.model_available() {
            return Err(ResolutionFailure::Unavailable(
                "ANTHROPIC_API_KEY is not set".into(),
            ));
        }

        let mut client = Self::new(config.provider, &config.model);
        client.api_key = config.api_key.clone();
        if let Some(url) = &config.api_url {
            client.api_url = url.clone();
        }
        client.temperature = config.temperature;
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    fn complete_anthropic(
        &self,
        system: &str,
        examples: &[Example],
        utterance: &str,
    ) -> Result<String, ResolutionFailure> {
        let mut messages = Vec::with_capacity(examples.len() * 2 + 1);
        for example in examples {
            messages.push(Message {
                role: "user".into(),
                content: example.user.clone(),
            });
            messages.push(Message {
                role: "assistant".into(),
                content: example.assistant.to_string(),
            });
        }
        messages.push(Message {
            role: "user".into(),
            content: utterance.to_string(),
        });

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: system.to_string(),
            messages,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .map_err(|e| ResolutionFailure::Service(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ResolutionFailure::Service(format!("API error {status}: {body}")));
        }

        let completion: AnthropicResponse = response
            .json()
            .map_err(|e| ResolutionFailure::Service(format!("Failed to parse JSON: {e}")))?;

        let text = completion
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<String>();

        if text.trim().is_empty() {
            return Err(ResolutionFailure::Service("Empty response".into()));
        }
        Ok(text)
    }

    fn complete_ollama(
        &self,
        system: &str,
        examples: &[Example],
        utterance: &str,
    ) -> Result<String, ResolutionFailure> {
        let prompt = format!(
            "{system}\n\n{}\nNow parse this user request:\nUser: {utterance}\n\nOutput only JSON:",
            format_examples(examples)
        );

        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature }
        });

        let response = self
            .client
            .post(&self.api_url)
            .json(&payload)
            .send()
            .map_err(|e| ResolutionFailure::Service(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ResolutionFailure::Service(format!(
                "API error {}",
                response.status()
            )));
        }

        let json = response
            .json::<Value>()
            .map_err(|e| ResolutionFailure::Service(format!("Failed to parse JSON: {e}")))?;

        json.get("response")
            .and_then(|v| v.as_str())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ResolutionFailure::Service("LLM response missing 'response' field".into()))
    }
}

impl LanguageService for LlmClient {
    fn complete(
        &self,
        system: &str,
        examples: &[Example],
        utterance: &str,
    ) -> Result<String, ResolutionFailure> {
        debug!(model = %self.model, provider = ?self.provider, "calling language service");
        match self.provider {
            Provider::Anthropic => self.complete_anthropic(system, examples, utterance),
            Provider::Ollama => self.complete_ollama(system, examples, utterance),
        }
    }
}

/// Render examples as a plain-text transcript.
pub fn format_examples(examples: &[Example]) -> String {
    if examples.is_empty() {
        return String::new();
    }

    let mut formatted = String::from("Examples:\n");
    for example in examples {
        formatted.push_str(&format!(
            "\nUser: {}\nAssistant: {}\n",
            example.user, example.assistant
        ));
    }
    formatted
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}
