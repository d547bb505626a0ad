//! OpenAI adapter — forced function calling against `/v1/chat/completions`.
//!
//! Structured output is obtained by declaring a single `structured_response`
//! tool whose parameters are the caller's output schema, and forcing that
//! tool choice. Pure parsing lives in `parse_response` for testability.

use std::time::{Duration, Instant};

use serde_json::{Value, json};

use super::types::{
    LlmError, LlmGenerate, LlmRequest, LlmResponse, Provider, STRUCTURED_TOOL_DESCRIPTION,
    STRUCTURED_TOOL_NAME, Usage,
};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ADAPTER
// =============================================================================

#[derive(Debug)]
pub struct OpenAiAdapter {
    http: reqwest::Client,
    api_key: String,
    model: Option<String>,
}

impl OpenAiAdapter {
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client fails to build.
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey { provider: Provider::Openai });
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

/// OpenAI-compatible chat-completions body with the forced structured tool.
/// Shared with the custom-server adapter, which speaks the same dialect.
pub(crate) fn chat_completions_payload(model: Option<&str>, request: &LlmRequest) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system_prompt {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut payload = json!({
        "messages": messages,
        "tools": [{
            "type": "function",
            "function": {
                "name": STRUCTURED_TOOL_NAME,
                "description": STRUCTURED_TOOL_DESCRIPTION,
                "parameters": serde_json::to_value(&request.output_schema).unwrap_or_else(|_| json!({})),
            }
        }],
        "tool_choice": {
            "type": "function",
            "function": { "name": STRUCTURED_TOOL_NAME }
        },
        "temperature": request.temperature(),
    });
    if let Some(model) = model {
        payload["model"] = json!(model);
    }
    if let Some(max_tokens) = request.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

#[async_trait::async_trait]
impl LlmGenerate for OpenAiAdapter {
    fn build_payload(&self, request: &LlmRequest) -> Value {
        chat_completions_payload(Some(self.resolve_model(request)), request)
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_payload(request);
        let model = self.resolve_model(request).to_string();

        let started = Instant::now();
        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
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
            provider: Provider::Openai,
            latency_ms,
        })
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug)]
pub(crate) struct ParsedCall {
    pub content: Value,
    pub usage: Usage,
    pub model: Option<String>,
}

/// Extract the forced tool invocation from a chat-completions response.
/// Rejects responses with no tool call, a differently-named tool, or
/// arguments that are not valid JSON.
pub(crate) fn parse_response(text: &str) -> Result<ParsedCall, LlmError> {
    let root: Value = serde_json::from_str(text).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    let usage = Usage::from_provider_value(root.get("usage"));
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let Some(call) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("tool_calls"))
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
    else {
        return Err(LlmError::MalformedResponse("no tool call in response".to_string()));
    };

    let name = call
        .get("function")
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if name != STRUCTURED_TOOL_NAME {
        return Err(LlmError::MalformedResponse(format!("unexpected tool call: {name}")));
    }

    let arguments = call
        .get("function")
        .and_then(|f| f.get("arguments"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let content: Value = serde_json::from_str(arguments)
        .map_err(|e| LlmError::MalformedResponse(format!("tool arguments are not valid JSON: {e}")))?;

    Ok(ParsedCall { content, usage, model })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
