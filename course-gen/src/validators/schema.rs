//! Structural validation of model output
//!
//! A [`SchemaDescriptor`] names the fields a payload must carry, their value
//! kinds and bounds. [`validate`] walks a raw JSON payload against it and
//! either returns the typed value or the first [`SchemaViolation`] found.
//! The same descriptor renders as JSON Schema so providers can constrain
//! generation up front; validation still runs on every response.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Payload does not satisfy its contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema violation at `{field}`: {constraint}")]
pub struct SchemaViolation {
    /// Path of the offending field, e.g. `sections[2].heading`
    pub field: String,
    /// Constraint that failed
    pub constraint: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// Value kind and bounds for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// String with at least one non-whitespace character
    Text,
    /// Whole number within inclusive bounds
    Integer { min: i64, max: i64 },
    /// String drawn from a fixed set
    OneOf(&'static [&'static str]),
    /// Array with inclusive length bounds
    List {
        item: Box<FieldKind>,
        min: usize,
        max: usize,
    },
    /// Nested object
    Object(Vec<FieldRule>),
}

impl FieldKind {
    pub fn list(item: FieldKind, min: usize, max: usize) -> Self {
        FieldKind::List {
            item: Box::new(item),
            min,
            max,
        }
    }
}

/// One named field of an object contract
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: Option<&'static str>,
}

impl FieldRule {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// Typed contract for one structured model response
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    /// Short identifier, also used as the provider tool name
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldRule>,
}

impl SchemaDescriptor {
    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        object_schema(&self.fields)
    }
}

/// Check a payload against a descriptor without converting it
pub fn check(payload: &Value, schema: &SchemaDescriptor) -> Result<(), SchemaViolation> {
    check_object(payload, &schema.fields, "")
}

/// Validate a payload and convert it into its typed form
pub fn validate<T: DeserializeOwned>(
    payload: Value,
    schema: &SchemaDescriptor,
) -> Result<T, SchemaViolation> {
    check(&payload, schema)?;
    serde_json::from_value(payload).map_err(|e| SchemaViolation::new(schema.name, e.to_string()))
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

fn check_object(value: &Value, rules: &[FieldRule], path: &str) -> Result<(), SchemaViolation> {
    let Some(object) = value.as_object() else {
        let at = if path.is_empty() { "<root>" } else { path };
        return Err(SchemaViolation::new(at, "must be an object"));
    };

    for rule in rules {
        let field_path = join_path(path, rule.name);
        match object.get(rule.name) {
            None | Some(Value::Null) => {
                if rule.required {
                    return Err(SchemaViolation::new(field_path, "required field is missing"));
                }
            }
            Some(field_value) => check_value(field_value, &rule.kind, &field_path)?,
        }
    }

    Ok(())
}

fn check_value(value: &Value, kind: &FieldKind, path: &str) -> Result<(), SchemaViolation> {
    match kind {
        FieldKind::Text => match value.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(()),
            Some(_) => Err(SchemaViolation::new(path, "must not be empty")),
            None => Err(SchemaViolation::new(path, "must be a string")),
        },
        FieldKind::Integer { min, max } => {
            let Some(n) = value.as_i64() else {
                return Err(SchemaViolation::new(path, "must be an integer"));
            };
            if n < *min || n > *max {
                return Err(SchemaViolation::new(
                    path,
                    format!("must be between {} and {} (got {})", min, max, n),
                ));
            }
            Ok(())
        }
        FieldKind::OneOf(allowed) => {
            let Some(s) = value.as_str() else {
                return Err(SchemaViolation::new(path, "must be a string"));
            };
            if allowed.contains(&s) {
                Ok(())
            } else {
                Err(SchemaViolation::new(
                    path,
                    format!("must be one of [{}] (got \"{}\")", allowed.join(", "), s),
                ))
            }
        }
        FieldKind::List { item, min, max } => {
            let Some(items) = value.as_array() else {
                return Err(SchemaViolation::new(path, "must be a list"));
            };
            if items.len() < *min || items.len() > *max {
                return Err(SchemaViolation::new(
                    path,
                    format!(
                        "must contain {} to {} items (got {})",
                        min,
                        max,
                        items.len()
                    ),
                ));
            }
            for (index, element) in items.iter().enumerate() {
                check_value(element, item, &format!("{}[{}]", path, index))?;
            }
            Ok(())
        }
        FieldKind::Object(rules) => check_object(value, rules, path),
    }
}

fn object_schema(rules: &[FieldRule]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for rule in rules {
        let mut schema = kind_schema(&rule.kind);
        if let (Some(description), Some(obj)) = (rule.description, schema.as_object_mut()) {
            obj.insert("description".to_string(), json!(description));
        }
        properties.insert(rule.name.to_string(), schema);
        if rule.required {
            required.push(json!(rule.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text => json!({ "type": "string", "minLength": 1 }),
        FieldKind::Integer { min, max } => {
            json!({ "type": "integer", "minimum": min, "maximum": max })
        }
        FieldKind::OneOf(allowed) => json!({ "type": "string", "enum": allowed }),
        FieldKind::List { item, min, max } => json!({
            "type": "array",
            "items": kind_schema(item),
            "minItems": min,
            "maxItems": max,
        }),
        FieldKind::Object(rules) => object_schema(rules),
    }
}
