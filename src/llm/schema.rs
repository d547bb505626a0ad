//! JSON Schema model and natural-language rendering.
//!
//! DESIGN
//! ======
//! User-authored output schemas are parsed into a closed recursive struct:
//! every recognized keyword is an explicit optional field, unknown keywords
//! are dropped at deserialization. Property order is preserved (authors write
//! schemas in presentation order and the rendered field list must follow it).
//!
//! Three operations drive prompt construction:
//! - [`JsonSchema::render`] — indented bullet list of field instructions
//! - [`JsonSchema::example`] — representative instance for few-shot grounding
//! - [`JsonSchema::is_complex`] — whether a prompt needs the example at all

use std::collections::HashSet;
use std::fmt::Write;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

// =============================================================================
// SCHEMA MODEL
// =============================================================================

/// A single node of a user-authored JSON Schema. Tree-shaped; `$ref` cycles
/// are not supported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<SchemaProperties>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Ordered property map. JSON objects carry author order and the rendered
/// field list must match it, so entries live in a Vec rather than a BTreeMap.
/// Duplicate keys keep the last value seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaProperties(Vec<(String, JsonSchema)>);

impl SchemaProperties {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: JsonSchema) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = schema;
        } else {
            self.0.push((name, schema));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonSchema)> {
        self.0.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, JsonSchema)> for SchemaProperties {
    fn from_iter<I: IntoIterator<Item = (String, JsonSchema)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (name, schema) in iter {
            props.insert(name, schema);
        }
        props
    }
}

impl Serialize for SchemaProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in &self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SchemaProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = SchemaProperties;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of property name to schema")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut props = SchemaProperties::new();
                while let Some((name, schema)) = access.next_entry::<String, JsonSchema>()? {
                    props.insert(name, schema);
                }
                Ok(props)
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

// =============================================================================
// RENDERING
// =============================================================================

impl JsonSchema {
    /// Effective type name. Missing `type` is treated as `"object"`, matching
    /// how schema authors omit it on the root node.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.schema_type.as_deref().unwrap_or("object")
    }

    /// Render this schema as an indented bullet list of field instructions,
    /// one line per property. Nested objects recurse with one extra indent;
    /// arrays recurse into their item shape.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_properties(self, 0, &mut out);
        out
    }

    /// Produce a representative example instance. `default` wins, then the
    /// first `enum` value, then a structural placeholder per type.
    #[must_use]
    pub fn example(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        if let Some(first) = self.enum_values.as_ref().and_then(|vals| vals.first()) {
            return first.clone();
        }

        match self.type_name() {
            "object" => {
                let mut map = serde_json::Map::new();
                if let Some(props) = &self.properties {
                    for (name, prop) in props.iter() {
                        map.insert(name.to_string(), prop.example());
                    }
                }
                Value::Object(map)
            }
            "array" => match &self.items {
                Some(items) => json!([items.example()]),
                None => json!([]),
            },
            "string" => json!("<string>"),
            "number" => json!(0.0),
            "integer" => json!(0),
            "boolean" => json!(true),
            _ => Value::Null,
        }
    }

    /// Whether a generated example should accompany the rendered field list.
    /// Flat schemas of up to 3 scalar fields read fine without one; anything
    /// wider, or with a nested object/array, gets the example.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        let Some(props) = &self.properties else {
            return false;
        };
        if props.len() > 3 {
            return true;
        }
        props
            .iter()
            .any(|(_, prop)| matches!(prop.type_name(), "object" | "array"))
    }
}

fn render_properties(schema: &JsonSchema, indent: usize, out: &mut String) {
    let Some(props) = &schema.properties else {
        return;
    };
    let required: HashSet<&str> = schema
        .required
        .as_ref()
        .map(|names| names.iter().map(String::as_str).collect())
        .unwrap_or_default();

    for (name, prop) in props.iter() {
        render_property(name, prop, required.contains(name), indent, out);
    }
}

fn render_property(name: &str, prop: &JsonSchema, is_required: bool, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    let marker = if is_required { "required" } else { "optional" };
    let type_name = prop.type_name();

    let type_label = if type_name == "array" {
        match &prop.items {
            Some(items) => format!("array of {}", items.type_name()),
            None => "array".to_string(),
        }
    } else {
        type_name.to_string()
    };

    let _ = write!(out, "{pad}- {name} ({type_label}, {marker})");
    if let Some(desc) = &prop.description {
        let _ = write!(out, ": {desc}");
    }
    if let Some(values) = &prop.enum_values {
        let list: Vec<String> = values.iter().map(ToString::to_string).collect();
        let _ = write!(out, ". Allowed values: {}", list.join(", "));
    }
    if let Some(constraints) = constraints_clause(prop) {
        let _ = write!(out, ". Constraints: {constraints}");
    }
    out.push('\n');

    match type_name {
        "object" => render_properties(prop, indent + 1, out),
        "array" => {
            if let Some(items) = &prop.items {
                if items.type_name() == "object" {
                    render_properties(items, indent + 1, out);
                }
            }
        }
        _ => {}
    }
}

/// Comma-joined list of whichever validation keywords are present, or `None`
/// when the property carries none.
fn constraints_clause(prop: &JsonSchema) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(min) = prop.minimum {
        parts.push(format!("minimum {min}"));
    }
    if let Some(max) = prop.maximum {
        parts.push(format!("maximum {max}"));
    }
    if let Some(min_len) = prop.min_length {
        parts.push(format!("minLength {min_len}"));
    }
    if let Some(max_len) = prop.max_length {
        parts.push(format!("maxLength {max_len}"));
    }
    if let Some(pattern) = &prop.pattern {
        parts.push(format!("pattern {pattern}"));
    }
    if let Some(format) = &prop.format {
        parts.push(format!("format {format}"));
    }
    if parts.is_empty() { None } else { Some(parts.join(", ")) }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
