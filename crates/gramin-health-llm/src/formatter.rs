//! Report formatter: one chat-completions call per triage request.
//!
//! The formatter never retries. Every failure comes back as a
//! [`FormatterError`] so the caller can pick a fallback tier.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::extraction::{parse_formatted_report, FormattedReport};
use crate::prompts::{make_reformat_prompt, report_schema, REPORT_SCHEMA_NAME, SYSTEM_PROMPT};

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 500;

/// Formatter failures.
///
/// `Http` and `Status` both mean the service could not be used; `Timeout` is
/// the bounded wait expiring; `Unparseable` means the call worked but the
/// content was not a usable report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatterError {
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Formatter returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unparseable formatter response: {0}")]
    Unparseable(String),
}

impl FormatterError {
    /// True for failures where the service itself could not be reached or used.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, FormatterError::Unparseable(_))
    }
}

pub type FormatterResult<T> = Result<T, FormatterError>;

/// Restructures trusted treatment text into a [`FormattedReport`].
pub trait ReportFormatter: Send + Sync {
    fn format_report(
        &self,
        predicted_label: &str,
        treatment_text: &str,
    ) -> FormatterResult<FormattedReport>;
}

/// Connection settings for the hosted formatter.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Attach the report JSON schema as a `response_format` hint.
    pub schema_hint: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            schema_hint: false,
        }
    }
}

impl fmt::Debug for FormatterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("schema_hint", &self.schema_hint)
            .finish()
    }
}

/// Request body for the chat-completions endpoint.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the request payload for one reformatting call.
pub fn build_chat_request<'a>(
    model: &'a str,
    predicted_label: &str,
    treatment_text: &str,
    schema_hint: bool,
) -> ChatRequest<'a> {
    let response_format = schema_hint.then(|| {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": REPORT_SCHEMA_NAME,
                "schema": report_schema(),
            }
        })
    });

    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: make_reformat_prompt(predicted_label, treatment_text),
            },
        ],
        response_format,
    }
}

/// Pull `choices[0].message.content` out of a response body.
pub fn content_from_envelope(body: &str) -> FormatterResult<String> {
    let envelope: ChatResponse = serde_json::from_str(body)
        .map_err(|e| FormatterError::Unparseable(format!("bad envelope: {}", e)))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| FormatterError::Unparseable("response has no message content".into()))
}

/// Hosted chat-completions formatter (OpenRouter-compatible).
pub struct OpenRouterFormatter {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    schema_hint: bool,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl OpenRouterFormatter {
    /// Create a formatter with its own bounded HTTP client.
    pub fn new(config: &FormatterConfig) -> FormatterResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FormatterError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            schema_hint: config.schema_hint,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> FormatterError {
        if e.is_timeout() {
            FormatterError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            FormatterError::Http(e.to_string())
        }
    }
}

impl ReportFormatter for OpenRouterFormatter {
    fn format_report(
        &self,
        predicted_label: &str,
        treatment_text: &str,
    ) -> FormatterResult<FormattedReport> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FormatterError::Http("no API key configured".into()))?;

        let body = build_chat_request(&self.model, predicted_label, treatment_text, self.schema_hint);
        tracing::debug!(model = %self.model, label = %predicted_label, "Requesting triage report formatting");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(FormatterError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().map_err(|e| self.map_transport_error(e))?;
        let content = content_from_envelope(&text)?;

        parse_formatted_report(&content).map_err(|e| FormatterError::Unparseable(e.to_string()))
    }
}

enum Script {
    Respond(String),
    Fail(FormatterError),
}

/// Formatter that replays a fixed model response or failure.
///
/// Responses go through the same extraction as live output, so tests and
/// offline runs exercise the real parsing path.
pub struct ScriptedFormatter {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedFormatter {
    /// Replay `content` as the model's message content.
    pub fn responding(content: impl Into<String>) -> Self {
        Self {
            script: Script::Respond(content.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with `error`.
    pub fn failing(error: FormatterError) -> Self {
        Self {
            script: Script::Fail(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReportFormatter for ScriptedFormatter {
    fn format_report(
        &self,
        _predicted_label: &str,
        _treatment_text: &str,
    ) -> FormatterResult<FormattedReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Respond(content) => parse_formatted_report(content)
                .map_err(|e| FormatterError::Unparseable(e.to_string())),
            Script::Fail(error) => Err(error.clone()),
        }
    }
}
