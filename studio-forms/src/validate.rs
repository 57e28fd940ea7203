use crate::error::ValidationIssue;
use crate::form::{is_visible, CompiledField, FormDefinition, FormState};
use crate::registry::RendererKind;
use crate::schema::{join, SchemaKind};
use serde_json::Value;

/// Checks the visible fields of `state`. Hidden fields are never reported.
pub fn validate(definition: &FormDefinition, state: &FormState) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_children(definition.fields(), "", state, &mut issues);
    issues
}

fn check_children(
    fields: &[CompiledField],
    base: &str,
    state: &FormState,
    issues: &mut Vec<ValidationIssue>,
) {
    for field in fields {
        if is_visible(field, base, state) {
            check_field(field, &join(base, &field.name), base, state, issues);
        }
    }
}

fn check_field(
    field: &CompiledField,
    path: &str,
    base: &str,
    state: &FormState,
    issues: &mut Vec<ValidationIssue>,
) {
    let value = match state.get(path) {
        Some(Value::Null) | None => {
            if field.required {
                issues.push(ValidationIssue::new(path, "is required"));
            }
            return;
        }
        Some(value) => value,
    };

    match &field.renderer {
        RendererKind::VariantSelector { .. } => {
            if let Some(variant) = field.variants.get(state.variant(path)) {
                check_field(variant, path, base, state, issues);
            }
            return;
        }
        RendererKind::AllOf => {
            for branch in &field.children {
                if is_visible(branch, base, state) {
                    check_field(branch, path, base, state, issues);
                }
            }
            return;
        }
        _ => {}
    }

    if let Some(message) = check_value(field, value) {
        issues.push(ValidationIssue::new(path, message));
        return;
    }

    match (&field.renderer, value) {
        (RendererKind::Group, Value::Object(_)) => {
            check_children(&field.children, path, state, issues)
        }
        (RendererKind::List, Value::Array(elements)) => {
            if let Some(item) = &field.item {
                for index in 0..elements.len() {
                    let element = join(path, &index.to_string());
                    check_field(item, &element, path, state, issues);
                }
            }
        }
        _ => {}
    }
}

/// First problem with a single value against its own schema node
fn check_value(field: &CompiledField, value: &Value) -> Option<String> {
    let schema = &field.schema;

    if let Some(expected) = &schema.meta.const_value {
        if value != expected {
            return Some(format!("must be {}", expected));
        }
    }
    if let Some(allowed) = &schema.meta.enum_values {
        if !allowed.contains(value) {
            let list: Vec<String> = allowed.iter().map(Value::to_string).collect();
            return Some(format!("must be one of {}", list.join(", ")));
        }
    }

    match &schema.kind {
        SchemaKind::String {
            min_length,
            max_length,
            ..
        } => {
            let Some(text) = value.as_str() else {
                return Some("expected a string".to_string());
            };
            if field.required && text.trim().is_empty() {
                return Some("must not be empty".to_string());
            }
            let length = text.chars().count();
            if let Some(min) = min_length.filter(|min| length < *min) {
                return Some(format!("must be at least {} characters", min));
            }
            if let Some(max) = max_length.filter(|max| length > *max) {
                return Some(format!("must be at most {} characters", max));
            }
        }
        SchemaKind::Number {
            integer,
            minimum,
            maximum,
            multiple_of,
        } => {
            let Some(n) = value.as_f64() else {
                return Some(format!("expected {}", schema.type_name()));
            };
            if *integer && n.fract() != 0.0 {
                return Some("expected integer".to_string());
            }
            if let Some(min) = minimum.filter(|min| n < *min) {
                return Some(format!("must be >= {}", min));
            }
            if let Some(max) = maximum.filter(|max| n > *max) {
                return Some(format!("must be <= {}", max));
            }
            if let Some(step) = multiple_of.filter(|step| *step > 0.0) {
                let ratio = n / step;
                if (ratio - ratio.round()).abs() > 1e-9 {
                    return Some(format!("must be a multiple of {}", step));
                }
            }
        }
        SchemaKind::Boolean if !value.is_boolean() => {
            return Some("expected boolean".to_string());
        }
        SchemaKind::Object { .. } if !value.is_object() => {
            return Some("expected object".to_string());
        }
        SchemaKind::Array {
            min_items,
            max_items,
            ..
        } => {
            let Some(elements) = value.as_array() else {
                return Some("expected array".to_string());
            };
            if let Some(min) = min_items.filter(|min| elements.len() < *min) {
                return Some(format!("must have at least {} item(s)", min));
            }
            if let Some(max) = max_items.filter(|max| elements.len() > *max) {
                return Some(format!("must have at most {} item(s)", max));
            }
        }
        _ => {}
    }
    None
}
