use super::*;
use serde_json::json;

// =========================================================================
// provider identifier
// =========================================================================

#[test]
fn provider_parse_round_trips() {
    for raw in ["openai", "anthropic", "gemini", "llm_server"] {
        let provider = Provider::parse(raw).unwrap();
        assert_eq!(provider.as_str(), raw);
    }
}

#[test]
fn provider_parse_rejects_unknown() {
    let err = Provider::parse("mistral").unwrap_err();
    assert!(matches!(err, LlmError::UnknownProvider(ref name) if name == "mistral"));
}

#[test]
fn provider_serde_uses_snake_case() {
    assert_eq!(serde_json::to_value(Provider::LlmServer).unwrap(), json!("llm_server"));
    let provider: Provider = serde_json::from_value(json!("openai")).unwrap();
    assert_eq!(provider, Provider::Openai);
}

// =========================================================================
// usage
// =========================================================================

#[test]
fn usage_reads_openai_naming() {
    let usage = Usage::from_provider_value(Some(&json!({
        "prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19
    })));
    assert_eq!(usage, Usage { prompt_tokens: 12, completion_tokens: 7, total_tokens: 19 });
}

#[test]
fn usage_reads_anthropic_naming() {
    let usage = Usage::from_provider_value(Some(&json!({
        "input_tokens": 30, "output_tokens": 4
    })));
    assert_eq!(usage.prompt_tokens, 30);
    assert_eq!(usage.completion_tokens, 4);
    assert_eq!(usage.total_tokens, 34);
}

#[test]
fn usage_missing_fields_default_to_zero() {
    assert_eq!(Usage::from_provider_value(None), Usage::default());
    let usage = Usage::from_provider_value(Some(&json!({ "prompt_tokens": 5 })));
    assert_eq!(usage.completion_tokens, 0);
    assert_eq!(usage.total_tokens, 5);
}

// =========================================================================
// request defaults
// =========================================================================

#[test]
fn request_temperature_defaults_to_zero() {
    let request = LlmRequest {
        prompt: "p".into(),
        system_prompt: None,
        output_schema: JsonSchema::default(),
        model: None,
        temperature: None,
        max_tokens: None,
    };
    assert!((request.temperature() - 0.0).abs() < f64::EPSILON);

    let warm = LlmRequest { temperature: Some(0.7), ..request };
    assert!((warm.temperature() - 0.7).abs() < f64::EPSILON);
}
