//! Parameter schema: the argument contract of a tool.
//!
//! Host tools declare their parameters through the [`ParameterField`]
//! builder; remote servers ship a ready-made JSON Schema object which is
//! wrapped as-is. Either way the result is a [`ParameterSchema`] that the
//! dispatcher validates arguments against *before* anything is invoked, so
//! a malformed model-generated call never reaches a handler or a
//! subprocess.
//!
//! Validation is structural, not a full JSON Schema implementation:
//! required properties, declared primitive types, and closed-object
//! (`additionalProperties: false`) checks. That covers everything the
//! built-in tools declare and the common shape MCP servers emit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One declared parameter of a host tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterField {
    pub name: String,
    pub description: String,
    /// JSON Schema type: "string", "integer", "number", "boolean", "array", "object".
    pub field_type: String,
    pub required: bool,
}

impl ParameterField {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            field_type: "string".to_string(),
            required,
        }
    }

    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = field_type.into();
        self
    }
}

/// JSON-schema-like contract describing the accepted argument shape.
///
/// Stored as the raw schema value so remote schemas survive round-trips
/// unchanged (the registry must reproduce exactly what a server declared).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    raw: Value,
}

impl ParameterSchema {
    /// Schema accepting an empty argument object.
    pub fn empty() -> Self {
        Self {
            raw: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        }
    }

    /// Build a closed object schema from declared fields.
    ///
    /// Host tool schemas are always closed (`additionalProperties: false`):
    /// the fields are authored here, so any extra key is a model mistake
    /// worth rejecting early.
    pub fn object(fields: &[ParameterField]) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in fields {
            properties.insert(
                field.name.clone(),
                json!({
                    "type": field.field_type,
                    "description": field.description,
                }),
            );
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        Self {
            raw: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        }
    }

    /// Wrap a schema received from a remote server.
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// The underlying JSON Schema value (for prompt/wire emission).
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.raw.get("properties").and_then(Value::as_object)
    }

    fn required_names(&self) -> Vec<&str> {
        self.raw
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn rejects_unknown_keys(&self) -> bool {
        self.raw.get("additionalProperties") == Some(&Value::Bool(false))
    }

    /// Validate an argument value against this schema.
    ///
    /// Returns a human-readable description of the first violation found.
    /// `null` is treated as an empty argument object, matching what lenient
    /// argument parsing produces for an absent payload.
    pub fn validate(&self, arguments: &Value) -> Result<(), String> {
        let empty = Map::new();
        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(format!(
                    "arguments must be an object, got {}",
                    json_type_name(other)
                ));
            }
        };

        for name in self.required_names() {
            if !args.contains_key(name) {
                return Err(format!("missing required parameter '{}'", name));
            }
        }

        let properties = self.properties();

        if self.rejects_unknown_keys() {
            let known = properties.unwrap_or(&empty);
            for key in args.keys() {
                if !known.contains_key(key) {
                    return Err(format!("unknown parameter '{}'", key));
                }
            }
        }

        if let Some(properties) = properties {
            for (key, value) in args {
                let Some(declared) = properties.get(key).and_then(|p| p.get("type")) else {
                    continue;
                };
                let Some(expected) = declared.as_str() else {
                    continue;
                };
                if !value_matches_type(value, expected) {
                    return Err(format!(
                        "parameter '{}' must be of type {}, got {}",
                        key,
                        expected,
                        json_type_name(value)
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::empty()
    }
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        // JSON Schema: integers satisfy "number"
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unrecognized declared type: do not reject what we cannot judge
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
