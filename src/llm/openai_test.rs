use super::*;
use crate::llm::schema::JsonSchema;

fn request_with_schema(schema: Value) -> LlmRequest {
    LlmRequest {
        prompt: "user prompt".into(),
        system_prompt: Some("system prompt".into()),
        output_schema: serde_json::from_value::<JsonSchema>(schema).unwrap(),
        model: None,
        temperature: None,
        max_tokens: Some(512),
    }
}

fn adapter() -> OpenAiAdapter {
    OpenAiAdapter::new("sk-test".into(), Some("gpt-4o".into())).unwrap()
}

// =========================================================================
// construction
// =========================================================================

#[test]
fn empty_api_key_is_a_construction_error() {
    let err = OpenAiAdapter::new("  ".into(), None).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { provider: Provider::Openai }));
}

// =========================================================================
// build_payload
// =========================================================================

#[test]
fn payload_declares_forced_structured_tool_with_schema_verbatim() {
    let schema = json!({
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "required": ["name"]
    });
    let payload = adapter().build_payload(&request_with_schema(schema.clone()));

    let tool = &payload["tools"][0]["function"];
    assert_eq!(tool["name"], "structured_response");
    assert_eq!(tool["parameters"], schema);
    assert_eq!(payload["tool_choice"]["function"]["name"], "structured_response");
}

#[test]
fn payload_carries_system_and_user_messages() {
    let payload = adapter().build_payload(&request_with_schema(json!({ "type": "object" })));
    let messages = payload["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "system prompt");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "user prompt");
}

#[test]
fn payload_defaults_temperature_to_zero_and_honors_overrides() {
    let mut request = request_with_schema(json!({ "type": "object" }));
    let payload = adapter().build_payload(&request);
    assert_eq!(payload["temperature"], json!(0.0));
    assert_eq!(payload["model"], "gpt-4o");
    assert_eq!(payload["max_tokens"], 512);

    request.model = Some("gpt-4.1".into());
    request.max_tokens = None;
    let payload = adapter().build_payload(&request);
    assert_eq!(payload["model"], "gpt-4.1");
    assert!(payload.get("max_tokens").is_none());
}

// =========================================================================
// parse_response
// =========================================================================

#[test]
fn parse_extracts_tool_arguments_and_usage() {
    let body = json!({
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "message": {
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": "structured_response", "arguments": "{\"name\":\"Ada\"}" }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": { "prompt_tokens": 40, "completion_tokens": 9, "total_tokens": 49 }
    })
    .to_string();

    let parsed = parse_response(&body).unwrap();
    assert_eq!(parsed.content, json!({ "name": "Ada" }));
    assert_eq!(parsed.usage.prompt_tokens, 40);
    assert_eq!(parsed.usage.total_tokens, 49);
    assert_eq!(parsed.model.as_deref(), Some("gpt-4o-2024-08-06"));
}

#[test]
fn parse_rejects_missing_tool_call() {
    let body = json!({
        "choices": [{ "message": { "content": "plain text answer" } }]
    })
    .to_string();
    let err = parse_response(&body).unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[test]
fn parse_rejects_wrong_tool_name() {
    let body = json!({
        "choices": [{
            "message": {
                "tool_calls": [{ "function": { "name": "other_tool", "arguments": "{}" } }]
            }
        }]
    })
    .to_string();
    let err = parse_response(&body).unwrap_err().to_string();
    assert!(err.contains("unexpected tool call"));
}

#[test]
fn parse_rejects_non_json_arguments() {
    let body = json!({
        "choices": [{
            "message": {
                "tool_calls": [{ "function": { "name": "structured_response", "arguments": "not json" } }]
            }
        }]
    })
    .to_string();
    let err = parse_response(&body).unwrap_err().to_string();
    assert!(err.contains("not valid JSON"));
}
