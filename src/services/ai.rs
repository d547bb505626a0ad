//! Execution orchestrator — endpoint request → prompt → provider → result.
//!
//! DESIGN
//! ======
//! One request moves through a fixed pipeline: resolve project → resolve
//! endpoint → check verb → extract input → resolve credential → branch on
//! endpoint kind. Payload-only kinds stop at `build_provider_payload` and
//! never decrypt the credential; LLM kinds decrypt, construct the adapter,
//! call it, and account usage. Every actual LLM attempt emits exactly one
//! usage event, success or failure; nothing else does.
//!
//! Failures short-circuit: a request that never reaches a resolved
//! endpoint + credential leaves no trace in analytics.

use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm::prompt::{PromptInput, build_prompt, build_split_prompts};
use crate::llm::schema::JsonSchema;
use crate::llm::types::{LlmError, LlmGenerate, LlmRequest};
use crate::llm::{LlmBackend, Provider, build_provider_payload, provider_endpoint_hint};
use crate::services::analytics::{self, UsageEvent};
use crate::services::credential::{self, CredentialError, CredentialRow};
use crate::services::project::{self, EndpointKind, EndpointRow, ProjectError};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("method {got} not allowed, endpoint expects {expected}")]
    VerbMismatch { expected: String, got: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("endpoint has no credential configured")]
    NoCredential,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Adapter construction failure: missing key/URL, unknown provider.
    #[error("provider configuration error: {0}")]
    ProviderConfig(LlmError),

    /// The provider call itself failed. Wrapped detail keeps the caller-facing
    /// message generic.
    #[error("LLM processing failed: {0}")]
    LlmFailed(String),
}

/// What one execution produced.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Payload-only endpoint: a ready-to-send provider request.
    Payload {
        api_payload: Value,
        provider: Provider,
        endpoint_hint: String,
    },
    /// LLM-calling endpoint: normalized output plus usage accounting.
    Generated { output: Value, usage: UsageSummary },
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct UsageSummary {
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub latency_ms: u64,
    pub estimated_cost_cents: f64,
}

/// HTTP-shaped input handed over by the route layer.
#[derive(Debug)]
pub struct IncomingRequest {
    /// Uppercased request method.
    pub verb: String,
    /// Decoded query parameters.
    pub query: serde_json::Map<String, Value>,
    /// Decoded JSON body, when one was sent.
    pub body: Option<Value>,
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Run one endpoint execution end to end.
///
/// # Errors
///
/// Returns an [`AiError`] naming the first stage that failed; see the module
/// docs for which stages leave analytics events.
pub async fn execute(
    state: &AppState,
    user_id: Uuid,
    project_name: &str,
    endpoint_name: &str,
    request: IncomingRequest,
) -> Result<ExecutionOutcome, AiError> {
    let pool = &state.pool;
    let project = project::find_project(pool, user_id, project_name).await?;
    let endpoint = project::find_endpoint(pool, project.id, endpoint_name).await?;

    if endpoint.http_verb != request.verb {
        return Err(AiError::VerbMismatch { expected: endpoint.http_verb.clone(), got: request.verb });
    }

    let input_data = extract_input(endpoint.kind, &request)?;

    let credential_id = endpoint.api_key_id.ok_or(AiError::NoCredential)?;
    let credential = credential::find_credential(pool, project.id, credential_id).await?;

    let llm_request = canonical_request(&endpoint, credential.provider, input_data)?;

    if !endpoint.kind.calls_llm() {
        let payload = build_provider_payload(credential.provider, credential.model.as_deref(), &llm_request);
        info!(
            endpoint = %endpoint.name,
            provider = %credential.provider,
            "built provider payload without calling the LLM"
        );
        return Ok(ExecutionOutcome::Payload {
            api_payload: payload,
            provider: credential.provider,
            endpoint_hint: payload_endpoint_hint(&credential),
        });
    }

    let config = credential::resolve_provider_config(&state.master_key, &credential)?;
    let backend = LlmBackend::for_provider(credential.provider, config).map_err(AiError::ProviderConfig)?;

    let (result, event) = call_and_account(&backend, endpoint.id, &llm_request).await;
    if let Err(e) = analytics::record_event(pool, &event).await {
        warn!(endpoint = %endpoint.name, error = %e, "usage event insert failed");
    }

    match result {
        Ok((output, usage)) => {
            info!(
                endpoint = %endpoint.name,
                provider = %credential.provider,
                tokens_input = usage.tokens_input,
                tokens_output = usage.tokens_output,
                latency_ms = usage.latency_ms,
                "execution complete"
            );
            Ok(ExecutionOutcome::Generated { output, usage })
        }
        Err(e) => {
            warn!(endpoint = %endpoint.name, provider = %credential.provider, error = %e, "execution failed");
            Err(e)
        }
    }
}

/// Call the backend and produce both the outcome and the single usage event
/// describing it. Keeping event construction here makes "exactly one event
/// per LLM attempt" structural rather than a convention.
pub(crate) async fn call_and_account(
    backend: &dyn LlmGenerate,
    endpoint_id: Uuid,
    request: &LlmRequest,
) -> (Result<(Value, UsageSummary), AiError>, UsageEvent) {
    let started = Instant::now();
    match backend.generate(request).await {
        Ok(response) => {
            let cost = crate::llm::pricing::estimate(
                &response.model,
                response.usage.prompt_tokens,
                response.usage.completion_tokens,
            );
            let usage = UsageSummary {
                tokens_input: response.usage.prompt_tokens,
                tokens_output: response.usage.completion_tokens,
                latency_ms: response.latency_ms,
                estimated_cost_cents: cost,
            };
            let event = UsageEvent::success(
                endpoint_id,
                clamp_i64(usage.tokens_input),
                clamp_i64(usage.tokens_output),
                clamp_i64(usage.latency_ms),
                crate::llm::pricing::to_stored_cents(cost),
            )
            .with_metadata(serde_json::json!({
                "provider": response.provider,
                "model": response.model,
            }));
            (Ok((response.content, usage)), event)
        }
        Err(e) => {
            let latency_ms = clamp_i64(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
            let error = AiError::LlmFailed(e.to_string());
            let event = UsageEvent::failure(endpoint_id, error.to_string(), Some(latency_ms));
            (Err(error), event)
        }
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// =============================================================================
// INPUT EXTRACTION
// =============================================================================

/// Pick the input source by verb (query parameters for GET, body otherwise)
/// and enforce the `text` field contract for text-input kinds.
pub(crate) fn extract_input(kind: EndpointKind, request: &IncomingRequest) -> Result<Value, AiError> {
    let raw = if request.verb == "GET" {
        Value::Object(request.query.clone())
    } else {
        request
            .body
            .clone()
            .ok_or_else(|| AiError::Validation("request body required".to_string()))?
    };

    if kind.requires_text() {
        let text = raw
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AiError::Validation("missing required `text` field".to_string()))?;
        return Ok(Value::String(text.to_string()));
    }

    Ok(raw)
}

// =============================================================================
// PROMPT / REQUEST CONSTRUCTION
// =============================================================================

fn parse_output_schema(endpoint: &EndpointRow) -> Result<Option<JsonSchema>, AiError> {
    endpoint
        .output_schema
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| AiError::Validation(format!("invalid output schema: {e}")))
}

fn prompt_input(endpoint: &EndpointRow, provider: Provider, input_data: Value) -> Result<PromptInput, AiError> {
    Ok(PromptInput {
        input_data,
        output_schema: parse_output_schema(endpoint)?,
        instructions: endpoint.instructions.clone(),
        context: endpoint.context.clone(),
        provider,
    })
}

/// Assemble the canonical request from the endpoint definition and input.
pub(crate) fn canonical_request(
    endpoint: &EndpointRow,
    provider: Provider,
    input_data: Value,
) -> Result<LlmRequest, AiError> {
    let input = prompt_input(endpoint, provider, input_data)?;
    let split = build_split_prompts(&input);
    Ok(LlmRequest {
        prompt: split.user,
        system_prompt: Some(split.system),
        output_schema: input.output_schema.unwrap_or_default(),
        model: None,
        temperature: None,
        max_tokens: None,
    })
}

fn payload_endpoint_hint(credential: &CredentialRow) -> String {
    match (credential.provider, &credential.endpoint_url) {
        (Provider::LlmServer, Some(url)) => url.clone(),
        (provider, _) => provider_endpoint_hint(provider).to_string(),
    }
}

// =============================================================================
// PROMPT PREVIEW
// =============================================================================

/// Build the combined prompt an execution would use, without touching any
/// provider. The provider note comes from the bound credential when one
/// exists.
///
/// # Errors
///
/// Returns an [`AiError`] if project or endpoint resolution fails, or the
/// stored schema is unusable.
pub async fn preview(
    state: &AppState,
    user_id: Uuid,
    project_name: &str,
    endpoint_name: &str,
    sample_input: Value,
) -> Result<String, AiError> {
    let pool = &state.pool;
    let project = project::find_project(pool, user_id, project_name).await?;
    let endpoint = project::find_endpoint(pool, project.id, endpoint_name).await?;

    let provider = match endpoint.api_key_id {
        Some(id) => credential::find_credential(pool, project.id, id)
            .await
            .map(|c| c.provider)
            .unwrap_or(Provider::Openai),
        None => Provider::Openai,
    };

    let input = prompt_input(&endpoint, provider, sample_input)?;
    Ok(build_prompt(&input))
}

#[cfg(test)]
#[path = "ai_test.rs"]
mod tests;
