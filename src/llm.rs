//! Chat model client, the seam to the language-model inference service
//!
//! Defines the client trait and the request shape used by the guidance
//! generator. Two implementations:
//! - `OllamaClient`: POSTs to a local Ollama `/api/chat` endpoint (production)
//! - `MockClient`: returns a preconfigured reply and records requests (testing)
//!
//! Calls are made once: no retry, no timeout, no validation of the reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::config::ModelSettings;

/// One chat exchange: a system instruction plus a user question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

/// Errors from chat model calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model endpoint unreachable: {0}")]
    Unavailable(String),
    #[error("model endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("response parse error: {0}")]
    ParseError(String),
}

/// Result type for chat model calls
pub type LlmResult<T> = Result<T, LlmError>;

/// Client trait for chat-style language models.
///
/// Abstracts over transport so the guidance generator doesn't depend on
/// how the model is reached.
#[async_trait]
pub trait GuidanceModel: Send + Sync {
    /// Send one exchange and return the model's reply text verbatim.
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String>;
}

/// Client for an Ollama server's chat endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaReply,
}

#[derive(Deserialize)]
struct OllamaReply {
    content: String,
}

impl OllamaClient {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GuidanceModel for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(%url, model = %self.model, "calling chat model");

        let resp = self
            .client
            .post(&url)
            .json(&OllamaChatRequest {
                model: &self.model,
                messages: vec![
                    OllamaMessage { role: "system", content: &request.system },
                    OllamaMessage { role: "user", content: &request.user },
                ],
                stream: false,
            })
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let reply: OllamaChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;
        Ok(reply.message.content)
    }
}

/// Mock client for testing. Returns a preconfigured reply.
pub struct MockClient {
    reply: Result<String, String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockClient {
    /// Create a mock client that answers every request with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client whose endpoint is unreachable.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reply: Err(reason.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GuidanceModel for MockClient {
    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.reply.clone().map_err(LlmError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            system: "be brief".into(),
            user: "what?".into(),
        }
    }

    #[tokio::test]
    async fn mock_client_returns_reply_and_records_request() {
        let client = MockClient::replying("guidance text");

        let reply = client.chat(&request()).await.unwrap();

        assert_eq!(reply, "guidance text");
        assert_eq!(client.requests(), vec![request()]);
    }

    #[tokio::test]
    async fn mock_unavailable_client_returns_error() {
        let client = MockClient::unavailable("connection refused");

        let err = client.chat(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(ref m) if m == "connection refused"));
        assert_eq!(client.requests().len(), 1);
    }

    #[test]
    fn ollama_request_uses_chat_shape_without_streaming() {
        let body = serde_json::to_value(OllamaChatRequest {
            model: "llama3.1:8b",
            messages: vec![
                OllamaMessage { role: "system", content: "sys" },
                OllamaMessage { role: "user", content: "question" },
            ],
            stream: false,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama3.1:8b",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "question"}
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn ollama_response_reads_message_content() {
        let reply: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"llama3.1:8b","message":{"role":"assistant","content":"Risk: Bias"},"done":true}"#,
        )
        .unwrap();
        assert_eq!(reply.message.content, "Risk: Bias");
    }

    #[test]
    fn ollama_client_strips_trailing_slash() {
        let client = OllamaClient::new(&ModelSettings {
            base_url: "http://localhost:11434/".into(),
            model: "llama3.1:8b".into(),
        });
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3.1:8b");
    }
}
