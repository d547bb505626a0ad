//! Anthropic Messages API adapter — forced tool use.
//!
//! Declares one `structured_response` tool with the output schema as its
//! input shape and forces that specific tool choice. The response must carry
//! a matching `tool_use` content block.

use std::time::{Duration, Instant};

use serde_json::{Value, json};

use super::types::{
    LlmError, LlmGenerate, LlmRequest, LlmResponse, Provider, STRUCTURED_TOOL_DESCRIPTION,
    STRUCTURED_TOOL_NAME, Usage,
};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub(crate) const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ADAPTER
// =============================================================================

#[derive(Debug)]
pub struct AnthropicAdapter {
    http: reqwest::Client,
    api_key: String,
    model: Option<String>,
}

impl AnthropicAdapter {
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client fails to build.
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey { provider: Provider::Anthropic });
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, model })
    }

    fn resolve_model<'a>(&'a self, request: &'a LlmRequest) -> &'a str {
        request
            .model
            .as_deref()
            .or(self.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }
}

/// Messages API body with the forced structured tool. Free function so
/// payload-only endpoints can build it without an API key.
pub(crate) fn messages_payload(model: &str, request: &LlmRequest) -> Value {
    let mut payload = json!({
        "model": model,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": [{ "role": "user", "content": request.prompt }],
        "tools": [{
            "name": STRUCTURED_TOOL_NAME,
            "description": STRUCTURED_TOOL_DESCRIPTION,
            "input_schema": serde_json::to_value(&request.output_schema).unwrap_or_else(|_| json!({})),
        }],
        "tool_choice": { "type": "tool", "name": STRUCTURED_TOOL_NAME },
        "temperature": request.temperature(),
    });
    if let Some(system) = &request.system_prompt {
        payload["system"] = json!(system);
    }
    payload
}

#[async_trait::async_trait]
impl LlmGenerate for AnthropicAdapter {
    fn build_payload(&self, request: &LlmRequest) -> Value {
        messages_payload(self.resolve_model(request), request)
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_payload(request);
        let model = self.resolve_model(request).to_string();

        let started = Instant::now();
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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

        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }

        let parsed = parse_response(&text)?;
        Ok(LlmResponse {
            content: parsed.content,
            raw_response: text,
            usage: parsed.usage,
            model: parsed.model.unwrap_or(model),
            provider: Provider::Anthropic,
            latency_ms,
        })
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug)]
pub(crate) struct ParsedToolUse {
    pub content: Value,
    pub usage: Usage,
    pub model: Option<String>,
}

/// Find the forced `structured_response` tool-use block. Rejects responses
/// without one rather than guessing at text content.
pub(crate) fn parse_response(text: &str) -> Result<ParsedToolUse, LlmError> {
    let root: Value = serde_json::from_str(text).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    let usage = Usage::from_provider_value(root.get("usage"));
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let tool_use = root
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks.iter().find(|block| {
                block.get("type").and_then(Value::as_str) == Some("tool_use")
                    && block.get("name").and_then(Value::as_str) == Some(STRUCTURED_TOOL_NAME)
            })
        });

    let Some(block) = tool_use else {
        return Err(LlmError::MalformedResponse(
            "no structured_response tool_use block in response".to_string(),
        ));
    };

    let content = block.get("input").cloned().unwrap_or(Value::Null);
    Ok(ParsedToolUse { content, usage, model })
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
