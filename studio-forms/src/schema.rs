//! Typed view of the JSON Schema subset that provider parameter schemas use.
//!
//! Parsing happens once; everything downstream (defaults, rendering,
//! validation) works on [`Schema`] instead of raw JSON.

use crate::annotations::Annotations;
use crate::error::FormError;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaMeta {
    pub title: Option<String>,
    /// Description with annotations removed
    pub description: Option<String>,
    pub annotations: Annotations,
    pub default: Option<Value>,
    pub const_value: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Object {
        /// Declaration order is kept
        properties: Vec<(String, Schema)>,
        required: Vec<String>,
    },
    Array {
        items: Option<Box<Schema>>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        format: Option<String>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
        multiple_of: Option<f64>,
    },
    Boolean,
    AllOf(Vec<Schema>),
    /// `anyOf`, and `oneOf` read the same way
    AnyOf(Vec<Schema>),
    /// No usable type information
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub meta: SchemaMeta,
    pub kind: SchemaKind,
}

impl std::str::FromStr for Schema {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(s)?;
        Schema::parse(&value)
    }
}

impl Schema {
    pub fn parse(value: &Value) -> Result<Self, FormError> {
        parse_at(value, "")
    }

    /// Property schemas when this is an object
    pub fn properties(&self) -> &[(String, Schema)] {
        match &self.kind {
            SchemaKind::Object { properties, .. } => properties,
            _ => &[],
        }
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }

    pub fn is_required(&self, name: &str) -> bool {
        match &self.kind {
            SchemaKind::Object { required, .. } => required.iter().any(|r| r == name),
            _ => false,
        }
    }

    /// Short type name for messages and variant labels
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::Object { .. } => "object",
            SchemaKind::Array { .. } => "array",
            SchemaKind::String { .. } => "string",
            SchemaKind::Number { integer: true, .. } => "integer",
            SchemaKind::Number { .. } => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::AllOf(_) => "allOf",
            SchemaKind::AnyOf(_) => "anyOf",
            SchemaKind::Any => "any",
        }
    }
}

fn parse_at(value: &Value, path: &str) -> Result<Schema, FormError> {
    let object = match value {
        Value::Object(object) => object,
        // `true` accepts anything
        Value::Bool(true) => {
            return Ok(Schema {
                meta: SchemaMeta::default(),
                kind: SchemaKind::Any,
            })
        }
        other => {
            return Err(FormError::schema(
                path,
                format!("expected a schema object, got {}", other),
            ))
        }
    };

    let meta = parse_meta(object, path)?;
    let kind = parse_kind(object, &meta, path)?;
    Ok(Schema { meta, kind })
}

fn parse_meta(object: &Map<String, Value>, path: &str) -> Result<SchemaMeta, FormError> {
    let (description, annotations) = match object.get("description").and_then(Value::as_str) {
        Some(raw) => {
            let (annotations, text) = Annotations::parse(raw);
            ((!text.is_empty()).then_some(text), annotations)
        }
        None => (None, Annotations::default()),
    };

    let enum_values = match object.get("enum") {
        Some(Value::Array(values)) => Some(values.clone()),
        Some(_) => return Err(FormError::schema(path, "'enum' must be an array")),
        None => None,
    };

    Ok(SchemaMeta {
        title: object.get("title").and_then(Value::as_str).map(String::from),
        description,
        annotations,
        default: object.get("default").cloned(),
        const_value: object.get("const").cloned(),
        enum_values,
    })
}

fn parse_kind(
    object: &Map<String, Value>,
    meta: &SchemaMeta,
    path: &str,
) -> Result<SchemaKind, FormError> {
    if let Some(branches) = object.get("allOf") {
        return Ok(SchemaKind::AllOf(parse_branches(branches, path, "allOf")?));
    }
    for keyword in ["anyOf", "oneOf"] {
        if let Some(branches) = object.get(keyword) {
            return Ok(SchemaKind::AnyOf(parse_branches(branches, path, keyword)?));
        }
    }

    let type_name = match object.get("type") {
        Some(Value::String(name)) => Some(name.as_str()),
        // ["string", "null"] style nullable types
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null"),
        Some(_) => return Err(FormError::schema(path, "'type' must be a string or array")),
        None => None,
    };

    let type_name = type_name.or_else(|| infer_type(object, meta));

    let kind = match type_name {
        Some("object") => {
            let mut properties = Vec::new();
            if let Some(props) = object.get("properties") {
                let props = props
                    .as_object()
                    .ok_or_else(|| FormError::schema(path, "'properties' must be an object"))?;
                for (name, schema) in props {
                    let child_path = join(path, name);
                    properties.push((name.clone(), parse_at(schema, &child_path)?));
                }
            }
            let required = object
                .get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            SchemaKind::Object {
                properties,
                required,
            }
        }
        Some("array") => {
            let items = match object.get("items") {
                Some(items) => Some(Box::new(parse_at(items, &join(path, "items"))?)),
                None => None,
            };
            SchemaKind::Array {
                items,
                min_items: usize_field(object, "minItems"),
                max_items: usize_field(object, "maxItems"),
            }
        }
        Some("string") => SchemaKind::String {
            min_length: usize_field(object, "minLength"),
            max_length: usize_field(object, "maxLength"),
            format: object.get("format").and_then(Value::as_str).map(String::from),
        },
        Some(name @ ("number" | "integer")) => SchemaKind::Number {
            integer: name == "integer",
            minimum: object.get("minimum").and_then(Value::as_f64),
            maximum: object.get("maximum").and_then(Value::as_f64),
            multiple_of: object.get("multipleOf").and_then(Value::as_f64),
        },
        Some("boolean") => SchemaKind::Boolean,
        Some("null") | None => SchemaKind::Any,
        Some(other) => {
            return Err(FormError::schema(path, format!("unsupported type '{}'", other)));
        }
    };
    Ok(kind)
}

/// Type of an untyped schema, from its shape or its enum/const values
fn infer_type(object: &Map<String, Value>, meta: &SchemaMeta) -> Option<&'static str> {
    if object.contains_key("properties") {
        return Some("object");
    }
    if object.contains_key("items") {
        return Some("array");
    }
    let sample = meta
        .const_value
        .as_ref()
        .or_else(|| meta.enum_values.as_ref().and_then(|values| values.first()))?;
    match sample {
        Value::String(_) => Some("string"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("number"),
        Value::Bool(_) => Some("boolean"),
        _ => None,
    }
}

fn parse_branches(value: &Value, path: &str, keyword: &str) -> Result<Vec<Schema>, FormError> {
    let branches = value
        .as_array()
        .ok_or_else(|| FormError::schema(path, format!("'{}' must be an array", keyword)))?;
    branches
        .iter()
        .enumerate()
        .map(|(i, branch)| parse_at(branch, &join(path, &format!("{}.{}", keyword, i))))
        .collect()
}

fn usize_field(object: &Map<String, Value>, key: &str) -> Option<usize> {
    object.get(key).and_then(Value::as_u64).map(|n| n as usize)
}

pub(crate) fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}
