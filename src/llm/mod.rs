//! LLM — multi-provider abstraction for structured-output calls.
//!
//! DESIGN
//! ======
//! Four adapters normalize vendor-specific structured-output mechanisms
//! (function calling, tool use, controlled generation, raw passthrough) into
//! one contract. [`LlmBackend`] enumerates them so dispatch stays a single
//! match and every supported behavior is visible in one place; the
//! [`LlmGenerate`] trait is what the orchestrator depends on, which keeps it
//! mockable in tests.

pub mod anthropic;
pub mod gemini;
pub mod llm_server;
pub mod openai;
pub mod pricing;
pub mod prompt;
pub mod schema;
pub mod types;

use serde_json::Value;

pub use types::{LlmError, LlmGenerate, LlmRequest, LlmResponse, Provider, Usage};

// =============================================================================
// PROVIDER CONFIG
// =============================================================================

/// Per-call configuration resolved from a decrypted credential record.
/// Which fields are meaningful depends on the provider: hosted providers
/// need `api_key`, the custom server needs `endpoint_url`. The factory
/// routes each variant to the constructor that demands exactly its fields.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub model: Option<String>,
}

// =============================================================================
// BACKEND DISPATCH
// =============================================================================

/// Concrete adapter selected per call.
#[derive(Debug)]
pub enum LlmBackend {
    OpenAi(openai::OpenAiAdapter),
    Anthropic(anthropic::AnthropicAdapter),
    Gemini(gemini::GeminiAdapter),
    LlmServer(llm_server::LlmServerAdapter),
}

impl LlmBackend {
    /// Construct the adapter for a provider. A missing credential (API key
    /// for hosted providers, endpoint URL for the custom server) fails here,
    /// before any call is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`], [`LlmError::MissingEndpointUrl`],
    /// or [`LlmError::HttpClientBuild`].
    pub fn for_provider(provider: Provider, config: ProviderConfig) -> Result<Self, LlmError> {
        let ProviderConfig { api_key, endpoint_url, model } = config;
        match provider {
            Provider::Openai => Ok(Self::OpenAi(openai::OpenAiAdapter::new(
                api_key.unwrap_or_default(),
                model,
            )?)),
            Provider::Anthropic => Ok(Self::Anthropic(anthropic::AnthropicAdapter::new(
                api_key.unwrap_or_default(),
                model,
            )?)),
            Provider::Gemini => Ok(Self::Gemini(gemini::GeminiAdapter::new(
                api_key.unwrap_or_default(),
                model,
            )?)),
            Provider::LlmServer => Ok(Self::LlmServer(llm_server::LlmServerAdapter::new(
                endpoint_url.unwrap_or_default(),
                model,
            )?)),
        }
    }

    /// Where a payload built by this backend should be sent. Hosted providers
    /// get their fixed API documentation URL; the custom server reports its
    /// configured URL.
    #[must_use]
    pub fn endpoint_hint(&self) -> String {
        match self {
            Self::OpenAi(_) | Self::Anthropic(_) | Self::Gemini(_) => {
                provider_endpoint_hint(self.provider()).to_string()
            }
            Self::LlmServer(adapter) => adapter.endpoint_url().to_string(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Self::OpenAi(_) => Provider::Openai,
            Self::Anthropic(_) => Provider::Anthropic,
            Self::Gemini(_) => Provider::Gemini,
            Self::LlmServer(_) => Provider::LlmServer,
        }
    }
}

/// Build a provider-native payload without constructing an adapter.
/// Payload-only endpoints use this: they hand the caller a ready-to-send
/// request and never need the credential secret an adapter demands.
#[must_use]
pub fn build_provider_payload(provider: Provider, model: Option<&str>, request: &LlmRequest) -> Value {
    match provider {
        Provider::Openai => {
            openai::chat_completions_payload(Some(model.unwrap_or(openai::DEFAULT_MODEL)), request)
        }
        Provider::Anthropic => anthropic::messages_payload(model.unwrap_or(anthropic::DEFAULT_MODEL), request),
        Provider::Gemini => gemini::generate_content_payload(request),
        Provider::LlmServer => openai::chat_completions_payload(model, request),
    }
}

/// Static endpoint hint per provider, for payload-only responses built
/// without a constructed backend.
#[must_use]
pub fn provider_endpoint_hint(provider: Provider) -> &'static str {
    match provider {
        Provider::Openai => "https://platform.openai.com/docs/api-reference/chat",
        Provider::Anthropic => "https://docs.anthropic.com/en/api/messages",
        Provider::Gemini => "https://ai.google.dev/api/generate-content",
        Provider::LlmServer => "<your configured server URL>",
    }
}

#[async_trait::async_trait]
impl LlmGenerate for LlmBackend {
    fn build_payload(&self, request: &LlmRequest) -> Value {
        match self {
            Self::OpenAi(adapter) => adapter.build_payload(request),
            Self::Anthropic(adapter) => adapter.build_payload(request),
            Self::Gemini(adapter) => adapter.build_payload(request),
            Self::LlmServer(adapter) => adapter.build_payload(request),
        }
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match self {
            Self::OpenAi(adapter) => adapter.generate(request).await,
            Self::Anthropic(adapter) => adapter.generate(request).await,
            Self::Gemini(adapter) => adapter.generate(request).await,
            Self::LlmServer(adapter) => adapter.generate(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_requires_api_key_for_hosted_providers() {
        for provider in [Provider::Openai, Provider::Anthropic, Provider::Gemini] {
            let err = LlmBackend::for_provider(provider, ProviderConfig::default()).unwrap_err();
            assert!(matches!(err, LlmError::MissingApiKey { .. }), "{provider}");
        }
    }

    #[test]
    fn factory_requires_endpoint_url_for_custom_server() {
        let config = ProviderConfig { api_key: Some("unused".into()), ..ProviderConfig::default() };
        let err = LlmBackend::for_provider(Provider::LlmServer, config).unwrap_err();
        assert!(matches!(err, LlmError::MissingEndpointUrl));
    }

    #[test]
    fn custom_server_hint_is_its_configured_url() {
        let config = ProviderConfig {
            endpoint_url: Some("http://llm.internal:8080/v1/chat".into()),
            ..ProviderConfig::default()
        };
        let backend = LlmBackend::for_provider(Provider::LlmServer, config).unwrap();
        assert_eq!(backend.endpoint_hint(), "http://llm.internal:8080/v1/chat");
    }

    #[test]
    fn hosted_hints_are_documentation_urls() {
        let config = ProviderConfig { api_key: Some("key".into()), ..ProviderConfig::default() };
        let backend = LlmBackend::for_provider(Provider::Openai, config).unwrap();
        assert!(backend.endpoint_hint().starts_with("https://platform.openai.com/"));
    }
}
