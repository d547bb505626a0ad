//! Gemini adapter — controlled generation via `generateContent`.
//!
//! Structured output uses the provider's native mechanism: the response MIME
//! type is pinned to JSON and the output schema rides in
//! `generationConfig.responseSchema`. Gemini does not understand JSON Schema
//! meta-keywords, so `$schema`/`$id`/`definitions`/`$defs` are stripped from
//! the serialized schema before it goes on the wire.

use std::time::{Duration, Instant};

use serde_json::{Value, json};

use super::types::{LlmError, LlmGenerate, LlmRequest, LlmResponse, Provider, Usage};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

const UNSUPPORTED_SCHEMA_KEYS: [&str; 4] = ["$schema", "$id", "definitions", "$defs"];

// =============================================================================
// ADAPTER
// =============================================================================

#[derive(Debug)]
pub struct GeminiAdapter {
    http: reqwest::Client,
    api_key: String,
    model: Option<String>,
}

impl GeminiAdapter {
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client fails to build.
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey { provider: Provider::Gemini });
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

/// `generateContent` body with controlled generation pinned on. The model
/// rides in the URL, not the body, so payload-only endpoints can reuse this
/// without resolving one.
pub(crate) fn generate_content_payload(request: &LlmRequest) -> Value {
    let mut schema = serde_json::to_value(&request.output_schema).unwrap_or_else(|_| json!({}));
    strip_unsupported_keys(&mut schema);

    let mut generation_config = json!({
        "temperature": request.temperature(),
        "responseMimeType": "application/json",
        "responseSchema": schema,
    });
    if let Some(max_tokens) = request.max_tokens {
        generation_config["maxOutputTokens"] = json!(max_tokens);
    }

    let mut payload = json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": generation_config,
    });
    if let Some(system) = &request.system_prompt {
        payload["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    payload
}

#[async_trait::async_trait]
impl LlmGenerate for GeminiAdapter {
    fn build_payload(&self, request: &LlmRequest) -> Value {
        generate_content_payload(request)
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_payload(request);
        let model = self.resolve_model(request).to_string();
        let url = format!("{API_BASE_URL}/{model}:generateContent");

        let started = Instant::now();
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
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
            provider: Provider::Gemini,
            latency_ms,
        })
    }
}

// =============================================================================
// SCHEMA ADJUSTMENT
// =============================================================================

/// Recursively remove JSON Schema meta-keywords Gemini rejects.
pub(crate) fn strip_unsupported_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in UNSUPPORTED_SCHEMA_KEYS {
                map.remove(key);
            }
            for nested in map.values_mut() {
                strip_unsupported_keys(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_unsupported_keys(item);
            }
        }
        _ => {}
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug)]
pub(crate) struct ParsedCandidate {
    pub content: Value,
    pub usage: Usage,
    pub model: Option<String>,
}

/// Read the first candidate's text and parse it as JSON. Controlled
/// generation means the body itself must be the structured answer; anything
/// else is a malformed response.
pub(crate) fn parse_response(text: &str) -> Result<ParsedCandidate, LlmError> {
    let root: Value = serde_json::from_str(text).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    let usage = root.get("usageMetadata").map_or_else(Usage::default, |meta| {
        let count = |name: &str| meta.get(name).and_then(Value::as_u64).unwrap_or(0);
        Usage::new(
            count("promptTokenCount"),
            count("candidatesTokenCount"),
            meta.get("totalTokenCount").and_then(Value::as_u64),
        )
    });
    let model = root
        .get("modelVersion")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let Some(candidate_text) = root
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
    else {
        return Err(LlmError::MalformedResponse("no candidate text in response".to_string()));
    };

    let content: Value = serde_json::from_str(candidate_text)
        .map_err(|e| LlmError::MalformedResponse(format!("candidate text is not valid JSON: {e}")))?;

    Ok(ParsedCandidate { content, usage, model })
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
