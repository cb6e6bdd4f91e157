/// OpenAI-compatible chat-completion provider
///
/// Works against any endpoint exposing `POST {api_url}/chat/completions` with
/// bearer authentication (OpenAI, Azure-style gateways, local llama.cpp or
/// Ollama servers).
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::assistant::{ChatMessage, CompletionProvider},
};

const TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.llm_api_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_url)
    }
}

/// Pulls the first choice's text out of a completion response
fn extract_completion(response: CompletionResponse) -> AppResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| AppError::ExternalApi("LLM response contained no completion".to_string()))
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(&self, messages: Vec<ChatMessage>) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ExternalApi("LLM API key is not configured".to_string()))?;

        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: TEMPERATURE,
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "LLM API returned an error");
            return Err(AppError::ExternalApi(format!(
                "LLM API returned status {}: {}",
                status, body
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        let text = extract_completion(completion)?;

        tracing::debug!(model = %self.model, chars = text.len(), "LLM completion received");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "openai_compatible"
    }
}
