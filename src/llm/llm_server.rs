//! Custom-server adapter — OpenAI-compatible passthrough to a user URL.
//!
//! DESIGN
//! ======
//! Self-hosted servers advertise OpenAI compatibility with wildly varying
//! fidelity, so the request side sends the standard chat-completions body
//! (message list + forced tool) and the response side is deliberately
//! forgiving. The answer is located by a fixed trial order:
//!
//!   1. OpenAI tool call          — `choices[0].message.tool_calls[0]`
//!   2. OpenAI message content    — `choices[0].message.content`
//!   3. OpenAI plain text choice  — `choices[0].text`
//!   4. Anthropic tool-use block  — `content[] type=tool_use`
//!   5. Anthropic text block      — `content[] type=text`
//!   6. Generic string fields     — `response`, `text`, `output`
//!   7. The entire body
//!
//! Textual answers then go through JSON extraction: fenced code block first,
//! then the first balanced `{…}`/`[…]` span, then the raw text itself. The
//! order is part of the contract; tests pin it.

use std::time::{Duration, Instant};

use serde_json::Value;

use super::openai::chat_completions_payload;
use super::types::{LlmError, LlmGenerate, LlmRequest, LlmResponse, Provider, Usage};

const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ADAPTER
// =============================================================================

#[derive(Debug)]
pub struct LlmServerAdapter {
    http: reqwest::Client,
    endpoint_url: String,
    model: Option<String>,
}

impl LlmServerAdapter {
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is empty or the HTTP client fails
    /// to build.
    pub fn new(endpoint_url: String, model: Option<String>) -> Result<Self, LlmError> {
        if endpoint_url.trim().is_empty() {
            return Err(LlmError::MissingEndpointUrl);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint_url, model })
    }

    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn resolve_model<'a>(&'a self, request: &'a LlmRequest) -> Option<&'a str> {
        request.model.as_deref().or(self.model.as_deref())
    }
}

#[async_trait::async_trait]
impl LlmGenerate for LlmServerAdapter {
    fn build_payload(&self, request: &LlmRequest) -> Value {
        chat_completions_payload(self.resolve_model(request), request)
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_payload(request);
        let model = self
            .resolve_model(request)
            .unwrap_or("custom")
            .to_string();

        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !(200..300).contains(&status) {
            return Err(LlmError::ApiResponse { status, body: text });
        }

        let parsed = parse_response(&text)?;
        Ok(LlmResponse {
            content: parsed.content,
            raw_response: text,
            usage: parsed.usage,
            model: parsed.model.unwrap_or(model),
            provider: Provider::LlmServer,
            latency_ms,
        })
    }
}

// =============================================================================
// ANSWER SELECTION
// =============================================================================

/// An answer candidate pulled out of the response body: already-structured
/// JSON (tool arguments) or text still needing extraction.
enum Answer {
    Json(Value),
    Text(String),
}

fn select_answer(root: &Value) -> Option<Answer> {
    let first_choice = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first());

    // 1. OpenAI tool call.
    if let Some(call) = first_choice
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("tool_calls"))
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
    {
        match call.get("function").and_then(|f| f.get("arguments")) {
            Some(Value::String(arguments)) => return Some(Answer::Text(arguments.clone())),
            Some(arguments @ Value::Object(_)) => return Some(Answer::Json(arguments.clone())),
            _ => {}
        }
    }

    // 2. OpenAI message content.
    if let Some(content) = first_choice
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
    {
        return Some(Answer::Text(content.to_string()));
    }

    // 3. OpenAI plain text choice.
    if let Some(text) = first_choice
        .and_then(|choice| choice.get("text"))
        .and_then(Value::as_str)
    {
        return Some(Answer::Text(text.to_string()));
    }

    let blocks = root.get("content").and_then(Value::as_array);

    // 4. Anthropic tool-use block.
    if let Some(input) = blocks.and_then(|blocks| {
        blocks
            .iter()
            .find(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
            .and_then(|block| block.get("input"))
    }) {
        return Some(Answer::Json(input.clone()));
    }

    // 5. Anthropic text block.
    if let Some(text) = blocks.and_then(|blocks| {
        blocks
            .iter()
            .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
    }) {
        return Some(Answer::Text(text.to_string()));
    }

    // 6. Generic string fields.
    for field in ["response", "text", "output"] {
        if let Some(text) = root.get(field).and_then(Value::as_str) {
            return Some(Answer::Text(text.to_string()));
        }
    }

    None
}

// =============================================================================
// JSON EXTRACTION
// =============================================================================

/// Pull JSON out of free-form model text: fenced code block, then the first
/// balanced brace/bracket span, then the raw text itself.
pub(crate) fn extract_json(text: &str) -> Result<Value, LlmError> {
    if let Some(block) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str(block) {
            return Ok(value);
        }
    }
    if let Some(span) = balanced_span(text) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }
    serde_json::from_str(text.trim())
        .map_err(|e| LlmError::MalformedResponse(format!("no parseable JSON in response text: {e}")))
}

/// Content of the first ``` fence, with any language tag line skipped.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// First top-level `{…}` or `[…]` span, string-aware.
fn balanced_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug)]
pub(crate) struct ParsedAnswer {
    pub content: Value,
    pub usage: Usage,
    pub model: Option<String>,
}

pub(crate) fn parse_response(text: &str) -> Result<ParsedAnswer, LlmError> {
    let root: Option<Value> = serde_json::from_str(text).ok();

    let usage = root
        .as_ref()
        .map_or_else(Usage::default, |r| Usage::from_provider_value(r.get("usage")));
    let model = root
        .as_ref()
        .and_then(|r| r.get("model"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let content = match root.as_ref().and_then(select_answer) {
        Some(Answer::Json(value)) => value,
        Some(Answer::Text(answer)) => extract_json(&answer)?,
        // 7. Whole body as the answer.
        None => extract_json(text)?,
    };

    Ok(ParsedAnswer { content, usage, model })
}

#[cfg(test)]
#[path = "llm_server_test.rs"]
mod tests;
