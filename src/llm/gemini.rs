//! Gemini backend — direct HTTP access to the generateContent API.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::llm::retry::with_retry;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Attempts per request; transient failures back off exponentially.
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);
/// Per-call timeout so a slow provider cannot stall a turn indefinitely.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Gemini provider over reqwest.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }

    fn api_url(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }

    /// Flatten the request into a single prompt, matching the conversational
    /// "System / Context / User" framing the prompts are written for.
    fn build_prompt(request: &CompletionRequest) -> String {
        let mut prompt = format!("System: {}\n\n", request.system);
        if let Some(ref context) = request.context {
            prompt.push_str(&format!("Context: {context}\n\n"));
        }
        prompt.push_str(&format!("User: {}\n\nAssistant:", request.user));
        prompt
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = Self::build_prompt(request);

        let mut generation_config = json!({});
        if request.json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let send = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send();

        let response = tokio::time::timeout(CALL_TIMEOUT, send)
            .await
            .map_err(|_| LlmError::Timeout {
                provider: "gemini".to_string(),
                timeout: CALL_TIMEOUT,
            })?
            .map_err(|e| LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("HTTP {status}: {detail}"),
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "gemini".to_string(),
                reason: format!("body was not JSON: {e}"),
            })?;

        let content = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "gemini".to_string(),
                reason: "no text candidate in response".to_string(),
            })?
            .to_string();

        Ok(CompletionResponse { content })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        with_retry(|| self.send_once(&request), MAX_ATTEMPTS, BASE_BACKOFF).await
    }
}
