//! OpenAI-compatible chat-completions backend for text-to-SQL.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SqlGenerator;
use crate::config::LlmConfig;
use crate::error::GenerationError;

/// Environment variable holding the API key. Never logged.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const REQUEST_TIMEOUT_SECS: u64 = 60;

// ── Wire structs ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

// ── Generator ────────────────────────────────────────────────────────

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: reqwest::blocking::Client,
    model: String,
    base_url: String,
    api_key: String,
}

impl OpenAiGenerator {
    /// Build a generator from config, reading the API key from
    /// `OPENAI_API_KEY`.
    pub fn from_env(cfg: &LlmConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| GenerationError::Http(format!("{API_KEY_ENV} is not set")))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("semgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        Ok(Self {
            client,
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl SqlGenerator for OpenAiGenerator {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.1,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GenerationError::Http(format!(
                "LLM API returned status {status}"
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| GenerationError::Http("LLM API returned no choices".to_string()))
    }
}
