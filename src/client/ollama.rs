// src/client/ollama.rs

use crate::client::{ModelClient, ModelError};
use crate::config::LlmConfig;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Sends prompts to a local Ollama server over `/api/chat`.
pub struct OllamaClient {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Connection(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    fn payload(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "stream": false,
            "options": { "temperature": self.temperature }
        })
    }
}

impl ModelClient for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, model = %self.model, "sending planning prompt");

        let response = self
            .client
            .post(&url)
            .json(&self.payload(system_prompt, user_prompt))
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Connection(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ModelError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<Value>()
            .map_err(|err| ModelError::InvalidResponse(format!("Failed to parse JSON: {err}")))?;
        extract_content(&body)
    }
}

/// `/api/chat` answers in `message.content`, `/api/generate` in `response`.
fn extract_content(body: &Value) -> Result<String, ModelError> {
    body.pointer("/message/content")
        .or_else(|| body.get("response"))
        .and_then(|v| v.as_str())
        .map(|text| text.trim().to_string())
        .ok_or_else(|| ModelError::InvalidResponse("missing 'message.content' field".into()))
}
