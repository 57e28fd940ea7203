use crate::schema::{Schema, SchemaKind};
use crate::visitor::SchemaVisitor;
use serde_json::{Map, Number, Value};

/// Initial value of a field. An explicit `default` always wins.
pub fn default_value(schema: &Schema) -> Value {
    match &schema.meta.default {
        Some(value) => value.clone(),
        None => schema.accept(&mut DefaultsVisitor),
    }
}

/// JSON number for `n`, written as an integer when it has no fraction
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

pub struct DefaultsVisitor;

impl DefaultsVisitor {
    fn fixed(schema: &Schema) -> Option<Value> {
        schema.meta.const_value.clone().or_else(|| {
            schema
                .meta
                .enum_values
                .as_ref()
                .and_then(|values| values.first().cloned())
        })
    }
}

impl SchemaVisitor for DefaultsVisitor {
    type Output = Value;

    fn visit_object(&mut self, _: &Schema, properties: &[(String, Schema)], _: &[String]) -> Value {
        let object: Map<String, Value> = properties
            .iter()
            .map(|(name, property)| (name.clone(), default_value(property)))
            .collect();
        Value::Object(object)
    }

    fn visit_array(&mut self, _: &Schema, _: Option<&Schema>) -> Value {
        Value::Array(Vec::new())
    }

    fn visit_string(&mut self, schema: &Schema) -> Value {
        Self::fixed(schema).unwrap_or_else(|| Value::String(String::new()))
    }

    fn visit_number(&mut self, schema: &Schema, _: bool) -> Value {
        if let Some(value) = Self::fixed(schema) {
            return value;
        }
        match schema.kind {
            SchemaKind::Number {
                minimum: Some(minimum),
                ..
            } => number_value(minimum),
            _ => Value::from(0),
        }
    }

    fn visit_boolean(&mut self, schema: &Schema) -> Value {
        Self::fixed(schema).unwrap_or(Value::Bool(false))
    }

    fn visit_all_of(&mut self, _: &Schema, branches: &[Schema]) -> Value {
        let mut merged = Map::new();
        let mut first_scalar = None;
        for branch in branches {
            match default_value(branch) {
                Value::Object(object) => merged.extend(object),
                other => {
                    first_scalar.get_or_insert(other);
                }
            }
        }
        match first_scalar {
            Some(value) if merged.is_empty() => value,
            _ => Value::Object(merged),
        }
    }

    fn visit_any_of(&mut self, _: &Schema, branches: &[Schema]) -> Value {
        branches.first().map(default_value).unwrap_or(Value::Null)
    }

    fn visit_any(&mut self, schema: &Schema) -> Value {
        Self::fixed(schema).unwrap_or(Value::Null)
    }
}
