use super::*;
use crate::llm::types::{LlmResponse, Usage};
use serde_json::json;
use std::sync::Mutex;

// =========================================================================
// MockLlm
// =========================================================================

struct MockLlm {
    result: Mutex<Option<Result<LlmResponse, LlmError>>>,
    calls: Mutex<u32>,
}

impl MockLlm {
    fn returning(result: Result<LlmResponse, LlmError>) -> Self {
        Self { result: Mutex::new(Some(result)), calls: Mutex::new(0) }
    }

    fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl LlmGenerate for MockLlm {
    fn build_payload(&self, _request: &LlmRequest) -> Value {
        json!({ "mock": true })
    }

    async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        *self.calls.lock().unwrap() += 1;
        self.result
            .lock()
            .unwrap()
            .take()
            .expect("mock called more than once")
    }
}

fn ok_response() -> LlmResponse {
    LlmResponse {
        content: json!({ "name": "Ada" }),
        raw_response: "{}".into(),
        usage: Usage::new(1_000_000, 0, None),
        model: "gpt-4o-mini".into(),
        provider: Provider::Openai,
        latency_ms: 850,
    }
}

fn endpoint(kind: EndpointKind) -> EndpointRow {
    EndpointRow {
        id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        name: "extract-profile".into(),
        http_verb: "POST".into(),
        kind,
        input_schema: None,
        output_schema: Some(json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        })),
        instructions: Some("Extract the profile.".into()),
        context: None,
        api_key_id: Some(Uuid::new_v4()),
    }
}

fn incoming(verb: &str, body: Option<Value>) -> IncomingRequest {
    IncomingRequest { verb: verb.into(), query: serde_json::Map::new(), body }
}

// =========================================================================
// extract_input
// =========================================================================

#[test]
fn get_requests_read_query_parameters() {
    let mut query = serde_json::Map::new();
    query.insert("city".into(), json!("Lisbon"));
    let request = IncomingRequest { verb: "GET".into(), query, body: None };
    let input = extract_input(EndpointKind::Structured, &request).unwrap();
    assert_eq!(input, json!({ "city": "Lisbon" }));
}

#[test]
fn non_get_requests_require_a_body() {
    let err = extract_input(EndpointKind::Structured, &incoming("POST", None)).unwrap_err();
    assert!(matches!(err, AiError::Validation(_)));

    let input = extract_input(EndpointKind::Structured, &incoming("POST", Some(json!({ "a": 1 })))).unwrap();
    assert_eq!(input, json!({ "a": 1 }));
}

#[test]
fn text_kind_without_text_field_is_a_validation_error() {
    let err = extract_input(EndpointKind::Text, &incoming("POST", Some(json!({})))).unwrap_err();
    assert!(matches!(err, AiError::Validation(ref msg) if msg.contains("text")));

    let blank = extract_input(EndpointKind::Text, &incoming("POST", Some(json!({ "text": "  " })))).unwrap_err();
    assert!(matches!(blank, AiError::Validation(_)));
}

#[test]
fn text_kind_extracts_the_text_value() {
    let input =
        extract_input(EndpointKind::TextPayload, &incoming("POST", Some(json!({ "text": "hello world" })))).unwrap();
    assert_eq!(input, json!("hello world"));
}

// =========================================================================
// canonical_request
// =========================================================================

#[test]
fn canonical_request_carries_split_prompts_and_schema() {
    let request = canonical_request(&endpoint(EndpointKind::Structured), Provider::Anthropic, json!({ "a": 1 })).unwrap();
    let system = request.system_prompt.as_deref().unwrap();
    assert!(system.contains("Task:\nExtract the profile."));
    assert!(system.contains("Required Output Fields:"));
    assert!(request.prompt.contains("- a: 1"));
    assert_eq!(request.output_schema.type_name(), "object");
    assert!(request.model.is_none());
}

#[test]
fn canonical_request_rejects_unusable_stored_schema() {
    let mut ep = endpoint(EndpointKind::Structured);
    ep.output_schema = Some(json!({ "type": 42 }));
    let err = canonical_request(&ep, Provider::Openai, json!({})).unwrap_err();
    assert!(matches!(err, AiError::Validation(_)));
}

// =========================================================================
// call_and_account
// =========================================================================

#[tokio::test]
async fn successful_call_accounts_usage_and_cost() {
    let endpoint_id = Uuid::new_v4();
    let mock = MockLlm::returning(Ok(ok_response()));
    let request = canonical_request(&endpoint(EndpointKind::Structured), Provider::Openai, json!({})).unwrap();

    let (result, event) = call_and_account(&mock, endpoint_id, &request).await;
    let (output, usage) = result.unwrap();

    assert_eq!(output, json!({ "name": "Ada" }));
    assert_eq!(usage.tokens_input, 1_000_000);
    assert_eq!(usage.latency_ms, 850);
    // 1M input tokens of gpt-4o-mini at 0.15 per million.
    assert!((usage.estimated_cost_cents - 0.15).abs() < f64::EPSILON);

    assert!(event.success);
    assert_eq!(event.endpoint_id, endpoint_id);
    assert_eq!(event.tokens_input, Some(1_000_000));
    assert_eq!(event.estimated_cost_cents, Some(15));
    let metadata = event.metadata.as_ref().unwrap();
    assert_eq!(metadata["provider"], "openai");
    assert_eq!(metadata["model"], "gpt-4o-mini");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn failed_call_yields_generic_error_and_failure_event() {
    let endpoint_id = Uuid::new_v4();
    let mock = MockLlm::returning(Err(LlmError::MalformedResponse("no tool call in response".into())));
    let request = canonical_request(&endpoint(EndpointKind::Structured), Provider::Openai, json!({})).unwrap();

    let (result, event) = call_and_account(&mock, endpoint_id, &request).await;
    let err = result.unwrap_err();

    assert!(matches!(err, AiError::LlmFailed(_)));
    assert!(err.to_string().starts_with("LLM processing failed:"));

    assert!(!event.success);
    let message = event.error_message.as_deref().unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("no tool call"));
    assert!(event.latency_ms.is_some());
    assert!(event.tokens_input.is_none());
}

// =========================================================================
// payload-only support
// =========================================================================

#[test]
fn payload_hint_prefers_custom_server_url() {
    let credential = CredentialRow {
        id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        name: "local".into(),
        provider: Provider::LlmServer,
        api_key_ciphertext: None,
        api_key_iv: None,
        endpoint_url: Some("http://llm.internal:8080/v1/chat".into()),
        model: None,
        active: true,
    };
    assert_eq!(payload_endpoint_hint(&credential), "http://llm.internal:8080/v1/chat");

    let hosted = CredentialRow { provider: Provider::Anthropic, endpoint_url: None, ..credential };
    assert!(payload_endpoint_hint(&hosted).starts_with("https://docs.anthropic.com/"));
}

#[test]
fn provider_payloads_build_without_credentials() {
    let request = canonical_request(&endpoint(EndpointKind::StructuredPayload), Provider::Openai, json!({ "a": 1 }))
        .unwrap();

    let openai = build_provider_payload(Provider::Openai, None, &request);
    assert_eq!(openai["model"], "gpt-4o-mini");
    assert_eq!(openai["tools"][0]["function"]["name"], "structured_response");

    let anthropic = build_provider_payload(Provider::Anthropic, Some("claude-3-5-haiku-20241022"), &request);
    assert_eq!(anthropic["model"], "claude-3-5-haiku-20241022");
    assert_eq!(anthropic["tools"][0]["name"], "structured_response");

    let gemini = build_provider_payload(Provider::Gemini, None, &request);
    assert_eq!(gemini["generationConfig"]["responseMimeType"], "application/json");

    let custom = build_provider_payload(Provider::LlmServer, None, &request);
    assert!(custom.get("model").is_none());
    assert_eq!(custom["tool_choice"]["function"]["name"], "structured_response");
}
