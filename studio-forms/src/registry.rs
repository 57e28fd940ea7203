use crate::schema::{Schema, SchemaKind};
use serde::Serialize;
use serde_json::Value;

/// Provider/model a form is rendered for. Some renderers (the voice picker)
/// list options per model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RenderContext {
    pub provider: String,
    pub model: String,
}

/// Widget used for a field, with its options resolved at compile time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererKind {
    TextInput,
    TextArea,
    NumberInput {
        integer: bool,
        unit: Option<String>,
    },
    Slider {
        min: f64,
        max: f64,
        step: f64,
        unit: Option<String>,
    },
    /// Bounds collapse to a single allowed value
    FixedValue {
        value: Value,
    },
    Switch,
    Select {
        options: Vec<Value>,
    },
    RatioPicker {
        options: Vec<Value>,
    },
    VoiceSelector {
        provider: String,
        model: String,
    },
    Group,
    List,
    VariantSelector {
        labels: Vec<String>,
    },
    AllOf,
}

impl RendererKind {
    pub fn name(&self) -> &'static str {
        match self {
            RendererKind::TextInput => "text_input",
            RendererKind::TextArea => "text_area",
            RendererKind::NumberInput { .. } => "number_input",
            RendererKind::Slider { .. } => "slider",
            RendererKind::FixedValue { .. } => "fixed_value",
            RendererKind::Switch => "switch",
            RendererKind::Select { .. } => "select",
            RendererKind::RatioPicker { .. } => "ratio_picker",
            RendererKind::VoiceSelector { .. } => "voice_selector",
            RendererKind::Group => "group",
            RendererKind::List => "list",
            RendererKind::VariantSelector { .. } => "variant_selector",
            RendererKind::AllOf => "all_of",
        }
    }

    /// Renderers that hold a single value rather than nested fields
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            RendererKind::Group | RendererKind::AllOf | RendererKind::VariantSelector { .. }
        )
    }
}

/// Picks the renderer for a field. An explicit `renderType` annotation wins,
/// then well-known field names, then the schema type.
pub fn resolve(name: &str, schema: &Schema, context: &RenderContext) -> RendererKind {
    if let Some(render_type) = &schema.meta.annotations.render_type {
        match from_render_type(render_type, schema, context) {
            Some(kind) => return kind,
            None => tracing::warn!(
                field = %name,
                render_type = %render_type,
                "Unknown renderType, using type rules"
            ),
        }
    }

    if let Some(kind) = from_field_name(name, schema, context) {
        return kind;
    }

    from_type(schema)
}

fn from_render_type(render_type: &str, schema: &Schema, context: &RenderContext) -> Option<RendererKind> {
    let kind = match render_type {
        "input" | "text" => RendererKind::TextInput,
        "textarea" => RendererKind::TextArea,
        "number" => number_input(schema),
        "slider" => ranged(schema),
        "switch" => RendererKind::Switch,
        "select" => RendererKind::Select {
            options: options(schema),
        },
        "ratio" | "aspectRatio" => RendererKind::RatioPicker {
            options: options(schema),
        },
        "voice" | "voiceSelector" => voice(context),
        _ => return None,
    };
    Some(kind)
}

fn from_field_name(name: &str, schema: &Schema, context: &RenderContext) -> Option<RendererKind> {
    match name {
        "prompt" | "negative_prompt" => Some(RendererKind::TextArea),
        "aspectRatio" | "aspect_ratio" => Some(RendererKind::RatioPicker {
            options: options(schema),
        }),
        "voice_id" => Some(voice(context)),
        _ => None,
    }
}

fn from_type(schema: &Schema) -> RendererKind {
    if schema.meta.enum_values.is_some() {
        return RendererKind::Select {
            options: options(schema),
        };
    }

    match &schema.kind {
        SchemaKind::Number { .. } => ranged(schema),
        SchemaKind::Boolean => RendererKind::Switch,
        SchemaKind::String { .. } | SchemaKind::Any => RendererKind::TextInput,
        SchemaKind::Object { .. } => RendererKind::Group,
        SchemaKind::Array { .. } => RendererKind::List,
        SchemaKind::AnyOf(branches) => RendererKind::VariantSelector {
            labels: branches.iter().enumerate().map(|(i, b)| variant_label(b, i)).collect(),
        },
        SchemaKind::AllOf(_) => RendererKind::AllOf,
    }
}

pub(crate) fn variant_label(branch: &Schema, index: usize) -> String {
    branch
        .meta
        .title
        .clone()
        .unwrap_or_else(|| format!("Option {} ({})", index + 1, branch.type_name()))
}

/// Slider over the bounds, or a fixed value when they coincide
fn ranged(schema: &Schema) -> RendererKind {
    match bounds(schema) {
        Some((min, max)) if min == max => RendererKind::FixedValue {
            value: crate::defaults::number_value(min),
        },
        Some((min, max)) => slider(schema, min, max),
        None => number_input(schema),
    }
}

fn bounds(schema: &Schema) -> Option<(f64, f64)> {
    match schema.kind {
        SchemaKind::Number {
            minimum: Some(min),
            maximum: Some(max),
            ..
        } => Some((min, max)),
        _ => None,
    }
}

fn slider(schema: &Schema, min: f64, max: f64) -> RendererKind {
    let step = match schema.kind {
        SchemaKind::Number {
            multiple_of: Some(step),
            ..
        } => step,
        SchemaKind::Number { integer: true, .. } => 1.0,
        _ => ((max - min) / 100.0).max(f64::EPSILON),
    };
    RendererKind::Slider {
        min,
        max,
        step,
        unit: schema.meta.annotations.unit.clone(),
    }
}

fn number_input(schema: &Schema) -> RendererKind {
    RendererKind::NumberInput {
        integer: matches!(schema.kind, SchemaKind::Number { integer: true, .. }),
        unit: schema.meta.annotations.unit.clone(),
    }
}

fn options(schema: &Schema) -> Vec<Value> {
    schema.meta.enum_values.clone().unwrap_or_default()
}

fn voice(context: &RenderContext) -> RendererKind {
    RendererKind::VoiceSelector {
        provider: context.provider.clone(),
        model: context.model.clone(),
    }
}
