//! Chat-completions client used for message classification and reply
//! phrasing.

use serde::{Deserialize, Serialize};

use crate::credentials::ApiKey;

use super::{
    check_http_response, CompletionRequest, CompletionResponse, LlmProvider, ProviderError,
    StopReason, UsageStats,
};

/// Public chat-completions endpoint.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MAX_TOKENS: u32 = 500;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Body POSTed to the completions endpoint.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model name from `[llm] model`.
    pub model: String,
    /// System prompt followed by the transcript.
    pub messages: Vec<OpenAiMessage>,
    /// Lower for classification, higher for replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Reply length cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One wire message.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Text.
    pub content: String,
}

/// Completions endpoint reply.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Candidates; only the first is read.
    pub choices: Vec<OpenAiChoice>,
    /// Model name echoed back.
    pub model: String,
    /// Token counts, when reported.
    pub usage: Option<OpenAiUsage>,
}

/// One candidate reply.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Generated message.
    pub message: OpenAiResponseMessage,
    /// `stop`, `length`, `content_filter`, ...
    pub finish_reason: Option<String>,
}

/// Generated message body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Text; `null` is read as empty.
    pub content: Option<String>,
}

/// Token accounting block.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiUsage {
    /// Tokens in system prompt and transcript.
    pub prompt_tokens: Option<u32>,
    /// Tokens in the reply.
    pub completion_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Language model reached through a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    model_name: String,
    endpoint: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider against the public OpenAI endpoint.
    pub fn new(model_name: String, api_key: ApiKey) -> Self {
        Self::with_endpoint(model_name, OPENAI_API_BASE.to_owned(), api_key)
    }

    /// Create a provider against a compatible endpoint (proxy, gateway).
    pub fn with_endpoint(model_name: String, endpoint: String, api_key: ApiKey) -> Self {
        Self {
            model_name,
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response mapping
// ---------------------------------------------------------------------------

/// Map a completion request to the wire body. The system prompt becomes the
/// first message.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> OpenAiRequest {
    let mut messages: Vec<OpenAiMessage> = Vec::with_capacity(request.messages.len());

    if let Some(system) = &request.system {
        messages.push(OpenAiMessage {
            role: "system".to_owned(),
            content: system.clone(),
        });
    }

    messages.extend(request.messages.iter().map(|msg| OpenAiMessage {
        role: msg.role.as_str().to_owned(),
        content: msg.content.clone(),
    }));

    OpenAiRequest {
        model: model.to_owned(),
        messages,
        temperature: request.temperature,
        max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    }
}

/// Read the first candidate of a completions reply.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the response cannot be deserialized or
/// carries no choices.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") | None => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        Some(other) => StopReason::Other(other.to_owned()),
    };

    let usage = UsageStats {
        input_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.prompt_tokens)
            .unwrap_or(0),
        output_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.completion_tokens)
            .unwrap_or(0),
    };

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        stop_reason,
        usage,
        model: resp.model,
    })
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = build_request(&self.model_name, &request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        let parsed = parse_response(&payload)?;
        tracing::debug!(
            model = %parsed.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "completion received"
        );
        Ok(parsed)
    }

    fn model_id(&self) -> &str {
        &self.model_name
    }
}
