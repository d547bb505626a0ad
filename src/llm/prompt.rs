//! Prompt assembly — schema instructions + task text + input data.
//!
//! DESIGN
//! ======
//! Two output forms share one source of truth. The combined prompt is what
//! the preview endpoint returns and what payload-only endpoints embed; the
//! split system/user pair is what direct LLM calls send. The schema
//! instruction and example blocks are produced by the same functions in both
//! paths, so a previewed prompt never diverges from the executed one.

use std::fmt::Write;

use serde_json::Value;

use super::schema::JsonSchema;
use super::types::Provider;

const COMBINED_HEADER: &str =
    "Transform the input data into structured output that satisfies the requirements below.";

const SYSTEM_FRAMING: &str = "You are a data transformation service. \
     You convert input data into structured JSON that satisfies the caller's requirements.";

const JSON_ONLY_DIRECTIVE: &str = "Respond with valid JSON only, with no prose and no code fences.";

const INPUT_LEAD_IN: &str = "Transform this input:";

// =============================================================================
// TYPES
// =============================================================================

/// Per-request prompt ingredients, assembled by the orchestrator from the
/// endpoint definition and the caller's input.
#[derive(Debug, Clone)]
pub struct PromptInput {
    pub input_data: Value,
    pub output_schema: Option<JsonSchema>,
    /// The endpoint author's task description.
    pub instructions: Option<String>,
    /// Free-text background the endpoint author attached.
    pub context: Option<String>,
    pub provider: Provider,
}

/// System/user pair for providers that take a split conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPrompts {
    pub system: String,
    pub user: String,
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Build the single combined prompt (preview and payload-only form).
#[must_use]
pub fn build_prompt(input: &PromptInput) -> String {
    let mut sections: Vec<String> = Vec::new();
    sections.push(format!(
        "Note: this request will be served by {}.",
        input.provider.model_family()
    ));
    sections.push(COMBINED_HEADER.to_string());
    if let Some(task) = nonempty(input.instructions.as_deref()) {
        sections.push(format!("Task:\n{task}"));
    }
    if let Some(context) = nonempty(input.context.as_deref()) {
        sections.push(format!("Context:\n{context}"));
    }
    if let Some(schema) = &input.output_schema {
        sections.push(schema_section(schema));
        if let Some(example) = example_section(schema) {
            sections.push(example);
        }
    }
    sections.push(JSON_ONLY_DIRECTIVE.to_string());
    sections.push(format!("Input:\n{}", format_input(&input.input_data)));
    sections.join("\n\n")
}

/// Build the split system/user prompt pair for direct LLM calls.
#[must_use]
pub fn build_split_prompts(input: &PromptInput) -> SplitPrompts {
    let mut sections: Vec<String> = Vec::new();
    sections.push(SYSTEM_FRAMING.to_string());
    if let Some(task) = nonempty(input.instructions.as_deref()) {
        sections.push(format!("Task:\n{task}"));
    }
    if let Some(schema) = &input.output_schema {
        sections.push(schema_section(schema));
        if let Some(example) = example_section(schema) {
            sections.push(example);
        }
    }
    sections.push(JSON_ONLY_DIRECTIVE.to_string());

    SplitPrompts {
        system: sections.join("\n\n"),
        user: format!("{INPUT_LEAD_IN}\n{}", format_input(&input.input_data)),
    }
}

fn nonempty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn schema_section(schema: &JsonSchema) -> String {
    format!("Required Output Fields:\n{}", schema.render().trim_end())
}

/// Example block, emitted only for schemas whose shape benefits from one.
fn example_section(schema: &JsonSchema) -> Option<String> {
    if !schema.is_complex() {
        return None;
    }
    let example = serde_json::to_string_pretty(&schema.example()).unwrap_or_else(|_| "{}".to_string());
    Some(format!("Example Output:\n{example}"))
}

// =============================================================================
// INPUT FORMATTING
// =============================================================================

/// Object input renders as a bullet list, one line per key, nested objects
/// indented one level deeper. Anything else serializes directly.
fn format_input(value: &Value) -> String {
    match value.as_object() {
        Some(map) => {
            let mut out = String::new();
            write_object_entries(map, 0, &mut out);
            out.trim_end().to_string()
        }
        None => value.to_string(),
    }
}

fn write_object_entries(map: &serde_json::Map<String, Value>, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    for (key, value) in map {
        match value.as_object() {
            Some(nested) => {
                let _ = writeln!(out, "{pad}- {key}:");
                write_object_entries(nested, indent + 1, out);
            }
            None => {
                let _ = writeln!(out, "{pad}- {key}: {value}");
            }
        }
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
