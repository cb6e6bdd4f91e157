//! Writing assistance backed by an external chat-completion model
//!
//! The model is reached through [`CompletionProvider`] so the HTTP client can
//! be swapped for a stub in tests.
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::taxonomy,
};

pub mod openai;

pub use openai::OpenAiCompatibleProvider;

const MAX_TEXT_CHARS: usize = 8000;
const MAX_TAG_SUGGESTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistTask {
    SuggestTitle,
    Summarize,
    Improve,
    SuggestTags,
}

impl AssistTask {
    fn instruction(&self) -> &'static str {
        match self {
            AssistTask::SuggestTitle => {
                "Suggest one concise, engaging title for the following blog post. \
                 Reply with the title only."
            }
            AssistTask::Summarize => {
                "Summarize the following blog post in two or three sentences."
            }
            AssistTask::Improve => {
                "Improve the clarity and grammar of the following text while keeping \
                 its meaning and tone. Reply with the revised text only."
            }
            AssistTask::SuggestTags => {
                "Suggest up to five short topic tags for the following blog post. \
                 Reply with a comma-separated list only."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistRequest {
    pub task: AssistTask,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistResponse {
    pub task: AssistTask,
    pub output: String,
    /// Parsed tag names, only filled for `suggest_tags`
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat-completion backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends the conversation and returns the text of the first choice
    async fn complete(&self, messages: Vec<ChatMessage>) -> AppResult<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// System instruction for the task followed by the user text
pub fn build_prompt(task: AssistTask, text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a writing assistant for a community blog. Answer in the language of the text.",
        ),
        ChatMessage::user(format!("{}\n\n{}", task.instruction(), text.trim())),
    ]
}

fn validate_text(text: &str) -> AppResult<()> {
    let len = text.trim().chars().count();
    if len == 0 || len > MAX_TEXT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Text must be between 1 and {} characters",
            MAX_TEXT_CHARS
        )));
    }
    Ok(())
}

fn parse_tags(output: &str) -> Vec<String> {
    let raw: Vec<String> = output
        .split([',', '\n'])
        .map(|t| t.trim().trim_start_matches('#').trim_matches('"').to_string())
        .collect();

    let mut tags = taxonomy::normalize_tags(&raw);
    tags.truncate(MAX_TAG_SUGGESTIONS);
    tags
}

/// Runs one assistance task against `provider`
pub async fn assist(
    provider: &dyn CompletionProvider,
    request: AssistRequest,
) -> AppResult<AssistResponse> {
    validate_text(&request.text)?;

    let messages = build_prompt(request.task, &request.text);
    let output = provider.complete(messages).await?.trim().to_string();

    let suggestions = match request.task {
        AssistTask::SuggestTags => parse_tags(&output),
        _ => Vec::new(),
    };

    tracing::info!(
        provider = provider.name(),
        task = ?request.task,
        output_chars = output.chars().count(),
        "Assistance completed"
    );

    Ok(AssistResponse {
        task: request.task,
        output,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_provider(reply: &'static str) -> MockCompletionProvider {
        let mut provider = MockCompletionProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_complete()
            .returning(move |_| Ok(reply.to_string()));
        provider
    }

    #[test]
    fn test_task_serde_names() {
        let task: AssistTask = serde_json::from_str("\"suggest_title\"").unwrap();
        assert_eq!(task, AssistTask::SuggestTitle);
        assert_eq!(
            serde_json::to_string(&AssistTask::SuggestTags).unwrap(),
            "\"suggest_tags\""
        );
        assert!(serde_json::from_str::<AssistTask>("\"translate\"").is_err());
    }

    #[test]
    fn test_prompt_contains_instruction_and_text() {
        let messages = build_prompt(AssistTask::Summarize, "  Rust ownership explained  ");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.starts_with("Summarize"));
        assert!(messages[1].content.ends_with("Rust ownership explained"));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_text() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().times(0);

        for text in ["   ".to_string(), "x".repeat(MAX_TEXT_CHARS + 1)] {
            let result = assist(
                &provider,
                AssistRequest {
                    task: AssistTask::Improve,
                    text,
                },
            )
            .await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_suggest_title_returns_trimmed_output() {
        let provider = mock_provider("  Borrowing Without Tears \n");
        let response = assist(
            &provider,
            AssistRequest {
                task: AssistTask::SuggestTitle,
                text: "A post about the borrow checker".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.output, "Borrowing Without Tears");
        assert!(response.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_tags_parses_list() {
        let provider = mock_provider("#Rust, async, \"Tokio\", rust,\nweb dev");
        let response = assist(
            &provider,
            AssistRequest {
                task: AssistTask::SuggestTags,
                text: "Building web services with Tokio".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            response.suggestions,
            vec!["rust", "async", "tokio", "web dev"]
        );
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_complete()
            .returning(|_| Err(AppError::ExternalApi("rate limited".to_string())));

        let result = assist(
            &provider,
            AssistRequest {
                task: AssistTask::Summarize,
                text: "Some text".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }
}
