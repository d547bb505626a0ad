use super::*;
use crate::llm::schema::JsonSchema;

fn request() -> LlmRequest {
    LlmRequest {
        prompt: "user prompt".into(),
        system_prompt: Some("system prompt".into()),
        output_schema: serde_json::from_value::<JsonSchema>(json!({
            "type": "object",
            "properties": { "verdict": { "type": "boolean" } },
            "required": ["verdict"]
        }))
        .unwrap(),
        model: None,
        temperature: Some(0.2),
        max_tokens: None,
    }
}

fn adapter() -> AnthropicAdapter {
    AnthropicAdapter::new("key".into(), None).unwrap()
}

// =========================================================================
// construction
// =========================================================================

#[test]
fn empty_api_key_is_a_construction_error() {
    let err = AnthropicAdapter::new(String::new(), None).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { provider: Provider::Anthropic }));
}

// =========================================================================
// build_payload
// =========================================================================

#[test]
fn payload_forces_the_structured_tool() {
    let payload = adapter().build_payload(&request());
    assert_eq!(payload["tools"][0]["name"], "structured_response");
    assert_eq!(
        payload["tools"][0]["input_schema"]["properties"]["verdict"]["type"],
        "boolean"
    );
    assert_eq!(payload["tool_choice"], json!({ "type": "tool", "name": "structured_response" }));
}

#[test]
fn payload_uses_system_field_and_default_max_tokens() {
    let payload = adapter().build_payload(&request());
    assert_eq!(payload["system"], "system prompt");
    assert_eq!(payload["max_tokens"], 4096);
    assert_eq!(payload["messages"][0]["role"], "user");
    assert_eq!(payload["messages"][0]["content"], "user prompt");
    assert_eq!(payload["temperature"], json!(0.2));
}

#[test]
fn payload_omits_system_when_absent() {
    let mut req = request();
    req.system_prompt = None;
    let payload = adapter().build_payload(&req);
    assert!(payload.get("system").is_none());
}

// =========================================================================
// parse_response
// =========================================================================

#[test]
fn parse_extracts_tool_use_input() {
    let body = json!({
        "model": "claude-sonnet-4-20250514",
        "content": [
            { "type": "text", "text": "Here is the result." },
            { "type": "tool_use", "id": "tu_1", "name": "structured_response", "input": { "verdict": true } }
        ],
        "usage": { "input_tokens": 25, "output_tokens": 11 }
    })
    .to_string();

    let parsed = parse_response(&body).unwrap();
    assert_eq!(parsed.content, json!({ "verdict": true }));
    assert_eq!(parsed.usage.prompt_tokens, 25);
    assert_eq!(parsed.usage.total_tokens, 36);
    assert_eq!(parsed.model.as_deref(), Some("claude-sonnet-4-20250514"));
}

#[test]
fn parse_rejects_text_only_response() {
    let body = json!({
        "content": [{ "type": "text", "text": "{\"verdict\": true}" }],
        "usage": { "input_tokens": 5, "output_tokens": 5 }
    })
    .to_string();
    let err = parse_response(&body).unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[test]
fn parse_rejects_differently_named_tool_use() {
    let body = json!({
        "content": [{ "type": "tool_use", "id": "tu_1", "name": "some_other_tool", "input": {} }]
    })
    .to_string();
    assert!(parse_response(&body).is_err());
}
