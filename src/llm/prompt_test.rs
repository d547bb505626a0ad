use super::*;
use serde_json::json;

fn schema(value: serde_json::Value) -> JsonSchema {
    serde_json::from_value(value).unwrap()
}

fn base_input() -> PromptInput {
    PromptInput {
        input_data: json!({ "city": "Lisbon" }),
        output_schema: Some(schema(json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "confidence": { "type": "number" }
            },
            "required": ["summary"]
        }))),
        instructions: Some("Summarize the weather.".into()),
        context: Some("The caller is a travel app.".into()),
        provider: Provider::Openai,
    }
}

// =========================================================================
// combined prompt
// =========================================================================

#[test]
fn combined_prompt_sections_appear_in_order() {
    let prompt = build_prompt(&base_input());
    let positions: Vec<usize> = [
        "Note: this request will be served by an OpenAI GPT model.",
        "Transform the input data",
        "Task:",
        "Context:",
        "Required Output Fields:",
        "Respond with valid JSON only",
        "Input:",
    ]
    .iter()
    .map(|needle| prompt.find(needle).unwrap_or_else(|| panic!("missing section: {needle}")))
    .collect();

    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "sections out of order in:\n{prompt}");
}

#[test]
fn combined_prompt_omits_absent_task_and_context() {
    let input = PromptInput { instructions: None, context: Some("  ".into()), ..base_input() };
    let prompt = build_prompt(&input);
    assert!(!prompt.contains("Task:"));
    assert!(!prompt.contains("Context:"));
}

#[test]
fn combined_prompt_without_schema_keeps_json_directive() {
    let input = PromptInput { output_schema: None, ..base_input() };
    let prompt = build_prompt(&input);
    assert!(!prompt.contains("Required Output Fields:"));
    assert!(!prompt.contains("Example Output:"));
    assert!(prompt.contains("Respond with valid JSON only"));
}

#[test]
fn example_block_only_for_complex_schemas() {
    // Two scalar properties: terse prompt, no example.
    let prompt = build_prompt(&base_input());
    assert!(!prompt.contains("Example Output:"));

    let complex = PromptInput {
        output_schema: Some(schema(json!({
            "type": "object",
            "properties": {
                "items": { "type": "array", "items": { "type": "string" } }
            }
        }))),
        ..base_input()
    };
    let prompt = build_prompt(&complex);
    assert!(prompt.contains("Example Output:"));
    assert!(prompt.contains("\"items\""));
}

// =========================================================================
// input formatting
// =========================================================================

#[test]
fn object_input_renders_as_bullet_list() {
    let input = PromptInput {
        input_data: json!({ "name": "Ada", "age": 36, "tags": ["a", "b"] }),
        ..base_input()
    };
    let prompt = build_prompt(&input);
    assert!(prompt.contains("- name: \"Ada\""));
    assert!(prompt.contains("- age: 36"));
    assert!(prompt.contains("- tags: [\"a\",\"b\"]"));
}

#[test]
fn nested_object_keys_get_extra_indent() {
    let input = PromptInput {
        input_data: json!({ "user": { "name": "Ada" } }),
        ..base_input()
    };
    let prompt = build_prompt(&input);
    assert!(prompt.contains("- user:\n  - name: \"Ada\""));
}

#[test]
fn non_object_input_serializes_directly() {
    let input = PromptInput { input_data: json!("raw text payload"), ..base_input() };
    assert!(build_prompt(&input).contains("Input:\n\"raw text payload\""));

    let array = PromptInput { input_data: json!([1, 2, 3]), ..base_input() };
    assert!(build_prompt(&array).contains("Input:\n[1,2,3]"));
}

// =========================================================================
// split prompts and the consistency law
// =========================================================================

#[test]
fn split_user_prompt_is_lead_in_plus_input() {
    let split = build_split_prompts(&base_input());
    assert!(split.user.starts_with("Transform this input:\n"));
    assert!(split.user.contains("- city: \"Lisbon\""));
}

#[test]
fn split_system_prompt_carries_framing_task_and_directive() {
    let split = build_split_prompts(&base_input());
    assert!(split.system.starts_with("You are a data transformation service."));
    assert!(split.system.contains("Task:\nSummarize the weather."));
    assert!(split.system.contains("Respond with valid JSON only"));
}

fn extract_block<'a>(text: &'a str, heading: &str) -> &'a str {
    let start = text.find(heading).expect("block missing");
    let rest = &text[start..];
    rest.split("\n\n").next().unwrap()
}

#[test]
fn schema_blocks_are_identical_across_forms() {
    let input = PromptInput {
        output_schema: Some(schema(json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "points": {
                    "type": "array",
                    "items": { "type": "object", "properties": { "text": { "type": "string" } } }
                }
            },
            "required": ["title"]
        }))),
        ..base_input()
    };
    let combined = build_prompt(&input);
    let split = build_split_prompts(&input);

    assert_eq!(
        extract_block(&combined, "Required Output Fields:"),
        extract_block(&split.system, "Required Output Fields:"),
    );
    assert_eq!(
        extract_block(&combined, "Example Output:"),
        extract_block(&split.system, "Example Output:"),
    );
}
