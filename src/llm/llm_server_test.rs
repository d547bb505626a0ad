use super::*;
use crate::llm::schema::JsonSchema;
use serde_json::json;

fn request() -> LlmRequest {
    LlmRequest {
        prompt: "user prompt".into(),
        system_prompt: Some("system prompt".into()),
        output_schema: serde_json::from_value::<JsonSchema>(json!({
            "type": "object",
            "properties": { "x": { "type": "integer" } }
        }))
        .unwrap(),
        model: None,
        temperature: None,
        max_tokens: None,
    }
}

// =========================================================================
// construction
// =========================================================================

#[test]
fn empty_endpoint_url_is_a_construction_error() {
    let err = LlmServerAdapter::new("  ".into(), None).unwrap_err();
    assert!(matches!(err, LlmError::MissingEndpointUrl));
}

// =========================================================================
// build_payload
// =========================================================================

#[test]
fn payload_is_openai_compatible_with_forced_tool() {
    let adapter = LlmServerAdapter::new("http://localhost:8080/v1/chat".into(), Some("llama-3".into())).unwrap();
    let payload = adapter.build_payload(&request());
    assert_eq!(payload["model"], "llama-3");
    assert_eq!(payload["tools"][0]["function"]["name"], "structured_response");
    assert_eq!(payload["tool_choice"]["function"]["name"], "structured_response");
    assert_eq!(payload["messages"][0]["role"], "system");
}

#[test]
fn payload_omits_model_when_unconfigured() {
    let adapter = LlmServerAdapter::new("http://localhost:8080".into(), None).unwrap();
    assert!(adapter.build_payload(&request()).get("model").is_none());
}

// =========================================================================
// trial order
// =========================================================================

#[test]
fn openai_tool_call_shape_wins() {
    let body = json!({
        "choices": [{
            "message": {
                "content": "ignored",
                "tool_calls": [{
                    "function": { "name": "structured_response", "arguments": "{\"x\":1}" }
                }]
            }
        }]
    })
    .to_string();
    let parsed = parse_response(&body).unwrap();
    assert_eq!(parsed.content, json!({ "x": 1 }));
}

#[test]
fn openai_message_content_is_second() {
    let body = json!({
        "choices": [{ "message": { "content": "{\"x\": 2}" } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 3 }
    })
    .to_string();
    let parsed = parse_response(&body).unwrap();
    assert_eq!(parsed.content, json!({ "x": 2 }));
    assert_eq!(parsed.usage.total_tokens, 13);
}

#[test]
fn openai_plain_text_choice_is_third() {
    let body = json!({ "choices": [{ "text": "{\"x\": 3}" }] }).to_string();
    assert_eq!(parse_response(&body).unwrap().content, json!({ "x": 3 }));
}

#[test]
fn anthropic_tool_use_block_is_fourth() {
    let body = json!({
        "content": [
            { "type": "text", "text": "prose" },
            { "type": "tool_use", "name": "structured_response", "input": { "x": 4 } }
        ],
        "usage": { "input_tokens": 8, "output_tokens": 2 }
    })
    .to_string();
    let parsed = parse_response(&body).unwrap();
    assert_eq!(parsed.content, json!({ "x": 4 }));
    assert_eq!(parsed.usage.prompt_tokens, 8);
}

#[test]
fn anthropic_text_block_is_fifth() {
    let body = json!({
        "content": [{ "type": "text", "text": "{\"x\": 5}" }]
    })
    .to_string();
    assert_eq!(parse_response(&body).unwrap().content, json!({ "x": 5 }));
}

#[test]
fn generic_string_fields_are_sixth() {
    for field in ["response", "text", "output"] {
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), json!("{\"x\": 6}"));
        let body = Value::Object(body).to_string();
        assert_eq!(parse_response(&body).unwrap().content, json!({ "x": 6 }), "field {field}");
    }
}

#[test]
fn whole_body_is_the_final_fallback() {
    let body = "{\"x\": 7}".to_string();
    assert_eq!(parse_response(&body).unwrap().content, json!({ "x": 7 }));
}

#[test]
fn unparseable_body_is_rejected() {
    let err = parse_response("complete nonsense, no JSON anywhere").unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

// =========================================================================
// JSON extraction
// =========================================================================

#[test]
fn extraction_prefers_fenced_code_block() {
    let text = "Sure, here you go:\n```json\n{\"a\": 1}\n```\ntrailing prose";
    assert_eq!(extract_json(text).unwrap(), json!({ "a": 1 }));
}

#[test]
fn extraction_scans_for_balanced_braces() {
    let text = "The answer is {\"a\": {\"b\": \"has } inside\"}} as requested.";
    assert_eq!(extract_json(text).unwrap(), json!({ "a": { "b": "has } inside" } }));
}

#[test]
fn extraction_handles_top_level_arrays() {
    let text = "Result: [1, 2, 3] done";
    assert_eq!(extract_json(text).unwrap(), json!([1, 2, 3]));
}

#[test]
fn extraction_accepts_raw_json_text() {
    assert_eq!(extract_json(" {\"a\": 1} ").unwrap(), json!({ "a": 1 }));
}

#[test]
fn extraction_fails_on_prose() {
    assert!(extract_json("there is nothing structured here").is_err());
}

// =========================================================================
// message content with embedded fences
// =========================================================================

#[test]
fn message_content_with_fenced_json_extracts() {
    let body = json!({
        "choices": [{
            "message": { "content": "Here it is:\n```\n{\"x\": 9}\n```" }
        }]
    })
    .to_string();
    assert_eq!(parse_response(&body).unwrap().content, json!({ "x": 9 }));
}
