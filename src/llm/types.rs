//! Provider-neutral types for structured LLM calls.
//!
//! DESIGN
//! ======
//! Every adapter normalizes to one contract: an [`LlmRequest`] goes in, an
//! [`LlmResponse`] comes out with schema-conformant JSON content, raw model
//! output, and usage accounting. The [`LlmGenerate`] trait exists so the
//! orchestrator can be tested against a mock instead of a live provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::JsonSchema;

/// Name of the single forced tool declared by function-calling adapters.
pub const STRUCTURED_TOOL_NAME: &str = "structured_response";

/// Description attached to the forced tool declaration.
pub const STRUCTURED_TOOL_DESCRIPTION: &str =
    "Return the response as structured data matching the required schema.";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by adapter construction and LLM calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A hosted provider was configured without an API key.
    #[error("missing API key for provider {provider}")]
    MissingApiKey { provider: Provider },

    /// The custom-server provider was configured without an endpoint URL.
    #[error("missing endpoint URL for custom server provider")]
    MissingEndpointUrl,

    /// The provider identifier is outside the closed enumeration.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The HTTP request to the provider failed before a response arrived.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider responded 2xx but not in its expected structured shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// PROVIDER IDENTIFIER
// =============================================================================

/// Closed enumeration of supported providers. The wire value is the lowercase
/// identifier stored on credential records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Openai,
    Anthropic,
    Gemini,
    LlmServer,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::LlmServer => "llm_server",
        }
    }

    /// Parse a stored identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnknownProvider`] for anything outside the closed set.
    pub fn parse(raw: &str) -> Result<Self, LlmError> {
        match raw {
            "openai" => Ok(Self::Openai),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "llm_server" => Ok(Self::LlmServer),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }

    /// Human-readable hint for the model family behind this provider. Used in
    /// prompt headers, purely informational.
    #[must_use]
    pub fn model_family(self) -> &'static str {
        match self {
            Self::Openai => "an OpenAI GPT model",
            Self::Anthropic => "an Anthropic Claude model",
            Self::Gemini => "a Google Gemini model",
            Self::LlmServer => "a self-hosted model server",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CANONICAL REQUEST / RESPONSE
// =============================================================================

/// The provider-agnostic request every adapter consumes. Constructed once per
/// call and never mutated.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub output_schema: JsonSchema,
    /// Overrides the adapter's configured model when present.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    /// Sampling temperature, defaulting to 0 for deterministic extraction.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(0.0)
    }
}

/// Token usage reported by the provider. Absent counts are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: Option<u64>) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: total_tokens.unwrap_or(prompt_tokens + completion_tokens),
        }
    }

    /// Read a provider `usage` object, accepting both the
    /// `prompt_tokens`/`completion_tokens` and `input_tokens`/`output_tokens`
    /// namings. Missing object or fields count as zero.
    #[must_use]
    pub fn from_provider_value(usage: Option<&Value>) -> Self {
        let Some(usage) = usage else {
            return Self::default();
        };
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| usage.get(name))
                .and_then(Value::as_u64)
        };
        let prompt = field(&["prompt_tokens", "input_tokens"]).unwrap_or(0);
        let completion = field(&["completion_tokens", "output_tokens"]).unwrap_or(0);
        let total = field(&["total_tokens"]);
        Self::new(prompt, completion, total)
    }
}

/// Normalized result of one structured LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// JSON content conforming to the request's output schema.
    pub content: Value,
    /// Raw serialized model output, kept for debugging and audit.
    pub raw_response: String,
    pub usage: Usage,
    /// Model the provider actually used.
    pub model: String,
    pub provider: Provider,
    /// Wall-clock time around the network call only.
    pub latency_ms: u64,
}

// =============================================================================
// GENERATE TRAIT
// =============================================================================

/// Common adapter contract. `build_payload` is pure and is also served to
/// payload-only endpoints; `generate` performs the network call.
#[async_trait::async_trait]
pub trait LlmGenerate: Send + Sync {
    /// Build the provider-native request body without calling the provider.
    fn build_payload(&self, request: &LlmRequest) -> Value;

    /// Call the provider and normalize its response.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, the provider responds
    /// with a non-success status, or the structured-output shape is missing.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
