//! LLM service for daemon intelligence
//!
//! Talks to an OpenAI-compatible chat-completions API to:
//! - Generate a daemon's question about the text
//! - Identify the exact span the question refers to
//! - Answer a follow-up about a span
//! - Rewrite the whole document around an accepted suggestion

use crate::config::AppConfig;
use crate::error::{DaemonError, Result};
use crate::services::completion::RewriteRequest;
use crate::types::Daemon;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sampling settings for one kind of call
#[derive(Debug, Clone, Copy)]
struct Sampling {
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

const QUESTION_SAMPLING: Sampling = Sampling {
    max_tokens: Some(100),
    temperature: Some(0.7),
};

const ANSWER_SAMPLING: Sampling = Sampling {
    max_tokens: Some(200),
    temperature: Some(0.7),
};

const SPAN_SAMPLING: Sampling = Sampling {
    max_tokens: None,
    temperature: None,
};

const REWRITE_SAMPLING: Sampling = Sampling {
    max_tokens: None,
    temperature: Some(0.3),
};

const SPAN_SYSTEM_PROMPT: &str = "You are a text analysis assistant. Given a question about a text, \
identify the specific text span (exact words/phrases) that should be highlighted to show the issue being discussed.

IMPORTANT:
- Return ONLY the exact text span that should be highlighted, nothing else. Do not include quotes or explanations.
- Only highlight text that ACTUALLY EXISTS in the original text.
- If the issue mentioned in the question does not exist in the text, return \"NO_HIGHLIGHT\".";

const REWRITE_SYSTEM_PROMPT: &str = "You are an editor applying one reviewer suggestion to a document. \
Return the COMPLETE revised document and nothing else: no commentary, no quotes, no markdown fences. \
Change only what the suggestion calls for and keep everything else exactly as written.";

/// LLM service for daemon intelligence
pub struct LlmService {
    api_key: String,
    base_url: String,
    suggestion_model: String,
    span_model: String,
    client: reqwest::Client,
}

/// Chat-completions request format
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Message {
    role: &'static str,
    content: String,
}

impl Message {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Chat-completions response format
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmService {
    /// Create a new LLM service from application config
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            api_key: config.openai_api_key.clone(),
            base_url: config.llm_base_url.clone(),
            suggestion_model: config.suggestion_model.clone(),
            span_model: config.span_model.clone(),
            client,
        })
    }

    /// One actionable question from `daemon` about `text`
    pub async fn generate_question(&self, text: &str, daemon: &Daemon) -> Result<String> {
        let messages = question_messages(text, daemon);
        self.call_api(&self.suggestion_model, messages, QUESTION_SAMPLING)
            .await
    }

    /// The model's verbatim reply naming the span to highlight
    pub async fn identify_span(&self, text: &str, question: &str) -> Result<String> {
        let messages = vec![
            Message::system(SPAN_SYSTEM_PROMPT),
            Message::user(format!(
                "TEXT:\n\"{}\"\n\nQUESTION: {}\n\nWhat specific text span should be highlighted \
                 to show the issue being discussed? Return only the exact words/phrases.",
                text, question
            )),
        ];
        self.call_api(&self.span_model, messages, SPAN_SAMPLING).await
    }

    /// Elaborate on `question` about `context`
    pub async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        daemon: &Daemon,
    ) -> Result<String> {
        let messages = vec![
            Message::system(format!(
                "You are responding as the {}. {}",
                daemon.name,
                daemon.guardrails.as_deref().unwrap_or_default()
            )),
            Message::user(format!(
                "Context: \"{}\"\n\nQuestion: {}\n\nProvide a helpful, specific answer or suggestion \
                 that addresses this question. Be constructive and actionable.",
                context, question
            )),
        ];
        self.call_api(&self.suggestion_model, messages, ANSWER_SAMPLING)
            .await
    }

    /// Complete replacement document addressing the suggestion
    pub async fn rewrite_document(&self, request: &RewriteRequest) -> Result<String> {
        let messages = rewrite_messages(request);
        let rewritten = self
            .call_api(&self.suggestion_model, messages, REWRITE_SAMPLING)
            .await?;
        Ok(strip_fences(&rewritten))
    }

    /// Call chat-completions and return the first choice's text
    async fn call_api(
        &self,
        model: &str,
        messages: Vec<Message>,
        sampling: Sampling,
    ) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(DaemonError::LlmApi("OPENAI_API_KEY not set".to_string()));
        }
        debug!("Calling chat completions ({})", model);

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DaemonError::LlmApi(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| DaemonError::LlmApi(format!("Failed to parse response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| DaemonError::LlmApi("Empty response from API".to_string()))
    }
}

fn question_messages(text: &str, daemon: &Daemon) -> Vec<Message> {
    let mut messages = vec![Message::system(format!(
        "{} {}",
        daemon.prompt,
        daemon.guardrails.as_deref().unwrap_or_default()
    ))];

    for example in &daemon.examples {
        messages.push(Message::user(example.user.clone()));
        messages.push(Message::assistant(example.assistant.clone()));
    }

    messages.push(Message::user(format!(
        "TEXT:\n\"{}\"\n\nAs a {}, identify one specific issue or opportunity for improvement that \
         ACTUALLY EXISTS in this text.\n\nIMPORTANT: Only identify issues that are actually present \
         in the text. Do not make up or hallucinate problems that don't exist. If you cannot find \
         any relevant issues in this text, respond with \"No specific issues found in this text.\"\n\n\
         Your question should be actionable and help the writer improve their work.",
        text, daemon.name
    )));
    messages
}

fn rewrite_messages(request: &RewriteRequest) -> Vec<Message> {
    let focus = match (&request.span_text, request.start_index, request.end_index) {
        (Some(span), Some(start), Some(end)) => format!(
            "FOCUS: \"{}\" (characters {}-{})\n\n",
            span, start, end
        ),
        (Some(span), _, _) => format!("FOCUS: \"{}\"\n\n", span),
        _ => String::new(),
    };

    vec![
        Message::system(REWRITE_SYSTEM_PROMPT),
        Message::user(format!(
            "DOCUMENT:\n{}\n\n{}SUGGESTION from {}: {}\n\nReturn the complete revised document.",
            request.original_text, focus, request.daemon_name, request.question
        )),
    ]
}

/// Drop a surrounding markdown code fence if the model added one
fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(inner) = trimmed.strip_prefix("```") {
        let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        return inner
            .strip_suffix("```")
            .unwrap_or(inner)
            .trim_end_matches('\n')
            .to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Example;

    fn daemon() -> Daemon {
        Daemon {
            id: "grammar".to_string(),
            name: "Grammar Enthusiast".to_string(),
            prompt: "Fix grammar.".to_string(),
            examples: vec![Example {
                user: "it's results".to_string(),
                assistant: "Should it be 'its'?".to_string(),
            }],
            guardrails: Some("Be kind.".to_string()),
            color: "#9b59b6".to_string(),
        }
    }

    #[test]
    fn test_question_messages_include_examples_in_order() {
        let messages = question_messages("Some text.", &daemon());
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], Message::system("Fix grammar. Be kind."));
        assert_eq!(messages[1], Message::user("it's results"));
        assert_eq!(messages[2], Message::assistant("Should it be 'its'?"));
        assert!(messages[3].content.contains("As a Grammar Enthusiast"));
        assert!(messages[3].content.contains("\"Some text.\""));
    }

    #[test]
    fn test_rewrite_messages_include_focus() {
        let request = RewriteRequest {
            original_text: "Its a test.".to_string(),
            question: "Should 'Its' be 'It's'?".to_string(),
            span_text: Some("Its".to_string()),
            start_index: Some(0),
            end_index: Some(3),
            daemon_name: "Grammar Enthusiast".to_string(),
        };
        let messages = rewrite_messages(&request);
        assert!(messages[1].content.contains("FOCUS: \"Its\" (characters 0-3)"));
        assert!(messages[1].content.contains("SUGGESTION from Grammar Enthusiast"));
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("plain text\n"), "plain text");
        assert_eq!(strip_fences("```\nfenced\ntext\n```"), "fenced\ntext");
        assert_eq!(strip_fences("```markdown\n# Title\n```"), "# Title");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let service = LlmService::new(&AppConfig::default()).unwrap();
        let err = service.generate_question("text", &daemon()).await.unwrap_err();
        assert!(matches!(err, DaemonError::LlmApi(_)));
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY
    async fn test_generate_question_live() {
        let config = AppConfig::from_env().unwrap();
        let service = LlmService::new(&config).unwrap();
        let question = service
            .generate_question("The data shows that it's results are promising.", &daemon())
            .await
            .unwrap();
        assert!(!question.is_empty());
    }
}
