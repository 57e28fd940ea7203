//! Compiled forms and their editable state.
//!
//! A [`FormDefinition`] is compiled once per schema: every field gets its
//! renderer, label and visibility rule up front. [`FormState`] holds the
//! values being edited and the selected branch of every `anyOf` field.
//! Rendering and validation walk the definition against a state.

use crate::annotations::ShowWhen;
use crate::defaults::default_value;
use crate::error::{FormError, ValidationIssue};
use crate::registry::{self, RenderContext, RendererKind};
use crate::schema::{join, Schema, SchemaKind};
use crate::validate;
use crate::visitor::SchemaVisitor;
use serde::Serialize;
use serde_json::{Map, Value};
use shared_types::{GenerationType, TaskSubmission};
use std::collections::BTreeMap;

/// Path segment standing for "any element" in list item templates
pub const ITEM_SEGMENT: &str = "*";

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    /// Dotted path from the form root, `*` for list elements
    pub path: String,
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub renderer: RendererKind,
    pub show_when: Option<ShowWhen>,
    /// Group properties, or the branches of an allOf
    pub children: Vec<CompiledField>,
    /// anyOf branches, each compiled at this field's path
    pub variants: Vec<CompiledField>,
    pub item: Option<Box<CompiledField>>,
    pub schema: Schema,
}

/// One visible row of a rendered form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedField {
    pub path: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub renderer: RendererKind,
    pub value: Value,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_variant: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FormDefinition {
    pub generation_type: GenerationType,
    pub context: RenderContext,
    root: CompiledField,
}

impl FormDefinition {
    pub fn compile(
        schema: Schema,
        generation_type: GenerationType,
        context: RenderContext,
    ) -> Result<Self, FormError> {
        if !matches!(schema.kind, SchemaKind::Object { .. }) {
            return Err(FormError::schema(
                "",
                format!("form root must be an object, got {}", schema.type_name()),
            ));
        }

        let root = compile_field("", "", &schema, false, &context);
        tracing::debug!(
            generation_type = generation_type.as_str(),
            provider = %context.provider,
            model = %context.model,
            fields = root.children.len(),
            "Compiled form"
        );
        Ok(Self {
            generation_type,
            context,
            root,
        })
    }

    pub fn from_json(
        schema: &Value,
        generation_type: GenerationType,
        context: RenderContext,
    ) -> Result<Self, FormError> {
        Self::compile(Schema::parse(schema)?, generation_type, context)
    }

    pub fn schema(&self) -> &Schema {
        &self.root.schema
    }

    /// Top-level fields in declaration order
    pub fn fields(&self) -> &[CompiledField] {
        &self.root.children
    }

    /// Looks up a field by dotted path. Numeric segments select list items.
    pub fn field(&self, path: &str) -> Option<&CompiledField> {
        if path.is_empty() {
            return None;
        }
        path.split('.')
            .try_fold(&self.root, |field, segment| descend(field, segment))
    }

    /// Visible fields with their current values, in display order
    pub fn render(&self, state: &FormState) -> Vec<RenderedField> {
        let mut out = Vec::new();
        render_children(&self.root.children, "", state, 0, &mut out);
        out
    }

    pub fn default_values(&self) -> Value {
        default_value(&self.root.schema)
    }
}

fn descend<'a>(field: &'a CompiledField, segment: &str) -> Option<&'a CompiledField> {
    match &field.renderer {
        RendererKind::Group => field.children.iter().find(|c| c.name == segment),
        RendererKind::List
            if segment == ITEM_SEGMENT || segment.parse::<usize>().is_ok() =>
        {
            field.item.as_deref()
        }
        RendererKind::VariantSelector { .. } => {
            field.variants.iter().find_map(|v| descend(v, segment))
        }
        RendererKind::AllOf => field.children.iter().find_map(|b| descend(b, segment)),
        _ => None,
    }
}

fn compile_field(
    name: &str,
    path: &str,
    schema: &Schema,
    required: bool,
    context: &RenderContext,
) -> CompiledField {
    let structure = schema.accept(&mut StructureCompiler { path, name, required, context });
    CompiledField {
        name: name.to_string(),
        path: path.to_string(),
        label: schema
            .meta
            .title
            .clone()
            .unwrap_or_else(|| humanize(name)),
        description: schema.meta.description.clone(),
        required,
        renderer: registry::resolve(name, schema, context),
        show_when: schema.meta.annotations.show_when.clone(),
        children: structure.children,
        variants: structure.variants,
        item: structure.item.map(Box::new),
        schema: schema.clone(),
    }
}

#[derive(Default)]
struct Structure {
    children: Vec<CompiledField>,
    variants: Vec<CompiledField>,
    item: Option<CompiledField>,
}

/// Compiles the nested fields of one node
struct StructureCompiler<'a> {
    path: &'a str,
    name: &'a str,
    required: bool,
    context: &'a RenderContext,
}

impl SchemaVisitor for StructureCompiler<'_> {
    type Output = Structure;

    fn visit_object(&mut self, _: &Schema, properties: &[(String, Schema)], required: &[String]) -> Structure {
        let children = properties
            .iter()
            .map(|(name, property)| {
                compile_field(
                    name,
                    &join(self.path, name),
                    property,
                    required.contains(name),
                    self.context,
                )
            })
            .collect();
        Structure {
            children,
            ..Default::default()
        }
    }

    fn visit_array(&mut self, _: &Schema, items: Option<&Schema>) -> Structure {
        Structure {
            item: items.map(|items| {
                compile_field(
                    self.name,
                    &join(self.path, ITEM_SEGMENT),
                    items,
                    false,
                    self.context,
                )
            }),
            ..Default::default()
        }
    }

    fn visit_string(&mut self, _: &Schema) -> Structure {
        Structure::default()
    }

    fn visit_number(&mut self, _: &Schema, _: bool) -> Structure {
        Structure::default()
    }

    fn visit_boolean(&mut self, _: &Schema) -> Structure {
        Structure::default()
    }

    fn visit_all_of(&mut self, _: &Schema, branches: &[Schema]) -> Structure {
        Structure {
            children: self.branches(branches),
            ..Default::default()
        }
    }

    fn visit_any_of(&mut self, _: &Schema, branches: &[Schema]) -> Structure {
        let mut variants = self.branches(branches);
        for (index, (variant, branch)) in variants.iter_mut().zip(branches).enumerate() {
            variant.label = registry::variant_label(branch, index);
        }
        Structure {
            variants,
            ..Default::default()
        }
    }

    fn visit_any(&mut self, _: &Schema) -> Structure {
        Structure::default()
    }
}

impl StructureCompiler<'_> {
    fn branches(&self, branches: &[Schema]) -> Vec<CompiledField> {
        branches
            .iter()
            .map(|branch| compile_field(self.name, self.path, branch, self.required, self.context))
            .collect()
    }
}

/// `negative_prompt` / `aspectRatio` → "Negative prompt" / "Aspect ratio"
fn humanize(name: &str) -> String {
    let mut words = String::new();
    for (i, c) in name.chars().enumerate() {
        if c == '_' || c == '-' {
            words.push(' ');
        } else if c.is_uppercase() && i > 0 {
            words.push(' ');
            words.extend(c.to_lowercase());
        } else if i == 0 {
            words.extend(c.to_uppercase());
        } else {
            words.push(c);
        }
    }
    words
}

pub(crate) fn is_visible(field: &CompiledField, base: &str, state: &FormState) -> bool {
    match &field.show_when {
        Some(condition) => condition.is_met(state.get(&join(base, &condition.field))),
        None => true,
    }
}

fn render_children(
    fields: &[CompiledField],
    base: &str,
    state: &FormState,
    depth: usize,
    out: &mut Vec<RenderedField>,
) {
    for field in fields {
        if is_visible(field, base, state) {
            render_field(field, &join(base, &field.name), base, state, depth, out);
        }
    }
}

fn render_field(
    field: &CompiledField,
    path: &str,
    base: &str,
    state: &FormState,
    depth: usize,
    out: &mut Vec<RenderedField>,
) {
    match &field.renderer {
        RendererKind::AllOf => {
            for branch in &field.children {
                if !is_visible(branch, base, state) {
                    continue;
                }
                match branch.renderer {
                    RendererKind::Group => render_children(&branch.children, path, state, depth, out),
                    _ => render_field(branch, path, base, state, depth, out),
                }
            }
        }
        RendererKind::VariantSelector { .. } => {
            let selected = state.variant(path);
            out.push(row(field, path, state, depth, Some(selected)));
            if let Some(variant) = field.variants.get(selected) {
                match variant.renderer {
                    RendererKind::Group => {
                        render_children(&variant.children, path, state, depth + 1, out)
                    }
                    _ => render_field(variant, path, base, state, depth + 1, out),
                }
            }
        }
        RendererKind::Group => {
            out.push(row(field, path, state, depth, None));
            render_children(&field.children, path, state, depth + 1, out);
        }
        RendererKind::List => {
            out.push(row(field, path, state, depth, None));
            let (Some(item), Some(Value::Array(elements))) = (&field.item, state.get(path)) else {
                return;
            };
            for index in 0..elements.len() {
                let element = join(path, &index.to_string());
                match item.renderer {
                    RendererKind::Group => {
                        render_children(&item.children, &element, state, depth + 1, out)
                    }
                    _ => render_field(item, &element, path, state, depth + 1, out),
                }
            }
        }
        _ => out.push(row(field, path, state, depth, None)),
    }
}

fn row(
    field: &CompiledField,
    path: &str,
    state: &FormState,
    depth: usize,
    selected_variant: Option<usize>,
) -> RenderedField {
    RenderedField {
        path: path.to_string(),
        label: field.label.clone(),
        description: field.description.clone(),
        required: field.required,
        renderer: field.renderer.clone(),
        value: state.get(path).cloned().unwrap_or(Value::Null),
        depth,
        selected_variant,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    values: Value,
    variants: BTreeMap<String, usize>,
}

impl FormState {
    /// Fresh state holding the schema defaults
    pub fn new(definition: &FormDefinition) -> Self {
        Self {
            values: definition.default_values(),
            variants: BTreeMap::new(),
        }
    }

    /// State seeded from existing values, e.g. a previous submission
    pub fn with_values(values: Value) -> Self {
        Self {
            values,
            variants: BTreeMap::new(),
        }
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.values);
        }
        path.split('.').try_fold(&self.values, |value, segment| match value {
            Value::Object(object) => object.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Writes a value, creating intermediate objects as needed
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), FormError> {
        if path.is_empty() {
            return Err(FormError::InvalidPath(path.to_string()));
        }
        let mut current = &mut self.values;
        for segment in path.split('.') {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            current = match current {
                Value::Object(object) => object.entry(segment.to_string()).or_insert(Value::Null),
                Value::Array(items) => {
                    let index: usize = segment
                        .parse()
                        .map_err(|_| FormError::InvalidPath(path.to_string()))?;
                    if index == items.len() {
                        items.push(Value::Null);
                    }
                    items
                        .get_mut(index)
                        .ok_or_else(|| FormError::InvalidPath(path.to_string()))?
                }
                _ => return Err(FormError::InvalidPath(path.to_string())),
            };
        }
        *current = value;
        Ok(())
    }

    /// Selected branch of the anyOf field at `path`, first by default
    pub fn variant(&self, path: &str) -> usize {
        self.variants.get(path).copied().unwrap_or(0)
    }

    /// Switches an anyOf field to another branch and resets its value to
    /// that branch's default
    pub fn select_variant(
        &mut self,
        definition: &FormDefinition,
        path: &str,
        index: usize,
    ) -> Result<(), FormError> {
        let field = definition
            .field(path)
            .ok_or_else(|| FormError::InvalidPath(path.to_string()))?;
        let variant = field.variants.get(index).ok_or_else(|| FormError::UnknownVariant {
            path: path.to_string(),
            index,
        })?;
        self.set(path, default_value(&variant.schema))?;
        self.variants.insert(path.to_string(), index);
        Ok(())
    }

    /// Appends a default element to the list at `path`, returning its index
    pub fn add_item(&mut self, definition: &FormDefinition, path: &str) -> Result<usize, FormError> {
        let field = definition
            .field(path)
            .ok_or_else(|| FormError::InvalidPath(path.to_string()))?;
        let element = field
            .item
            .as_ref()
            .map(|item| default_value(&item.schema))
            .unwrap_or(Value::Null);

        if self.get(path).map_or(true, Value::is_null) {
            self.set(path, Value::Array(Vec::new()))?;
        }
        match self.get(path) {
            Some(Value::Array(items)) => {
                let index = items.len();
                self.set(&join(path, &index.to_string()), element)?;
                Ok(index)
            }
            _ => Err(FormError::InvalidPath(path.to_string())),
        }
    }

    pub fn remove_item(&mut self, path: &str, index: usize) -> Result<Value, FormError> {
        let invalid = || FormError::InvalidPath(join(path, &index.to_string()));
        let mut current = &mut self.values;
        for segment in path.split('.') {
            current = match current {
                Value::Object(object) => object.get_mut(segment).ok_or_else(invalid)?,
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
        }
        match current {
            Value::Array(items) if index < items.len() => {
                // Element indices shift, so branch selections below the list are stale
                let prefix = format!("{}.", path);
                self.variants.retain(|key, _| !key.starts_with(&prefix));
                Ok(items.remove(index))
            }
            _ => Err(invalid()),
        }
    }

    pub fn validate(&self, definition: &FormDefinition) -> Vec<ValidationIssue> {
        validate::validate(definition, self)
    }

    /// Validated value tree with hidden fields removed
    pub fn submission(&self, definition: &FormDefinition) -> Result<TaskSubmission, FormError> {
        let issues = self.validate(definition);
        if !issues.is_empty() {
            tracing::debug!(issues = issues.len(), "Form submission rejected");
            return Err(FormError::Invalid(issues));
        }

        let mut params = Map::new();
        collect_children(definition.fields(), "", self, &mut params);
        Ok(TaskSubmission {
            generation_type: definition.generation_type,
            provider: definition.context.provider.clone(),
            model: definition.context.model.clone(),
            params: Value::Object(params),
        })
    }
}

fn collect_children(fields: &[CompiledField], base: &str, state: &FormState, out: &mut Map<String, Value>) {
    for field in fields {
        if !is_visible(field, base, state) {
            continue;
        }
        let path = join(base, &field.name);
        if let Some(value) = collect_field(field, &path, base, state) {
            out.insert(field.name.clone(), value);
        }
    }
}

fn collect_field(field: &CompiledField, path: &str, base: &str, state: &FormState) -> Option<Value> {
    let value = state.get(path)?;
    match &field.renderer {
        RendererKind::Group => {
            let mut object = Map::new();
            collect_children(&field.children, path, state, &mut object);
            Some(Value::Object(object))
        }
        RendererKind::AllOf => {
            let mut object = Map::new();
            for branch in &field.children {
                if !is_visible(branch, base, state) {
                    continue;
                }
                match branch.renderer {
                    RendererKind::Group => collect_children(&branch.children, path, state, &mut object),
                    _ => return Some(value.clone()),
                }
            }
            Some(Value::Object(object))
        }
        RendererKind::VariantSelector { .. } => match field.variants.get(state.variant(path)) {
            Some(variant) => collect_field(variant, path, base, state),
            None => Some(value.clone()),
        },
        RendererKind::List => match (&field.item, value) {
            (Some(item), Value::Array(elements)) => {
                let items = (0..elements.len())
                    .filter_map(|index| {
                        collect_field(item, &join(path, &index.to_string()), path, state)
                    })
                    .collect();
                Some(Value::Array(items))
            }
            _ => Some(value.clone()),
        },
        _ => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("negative_prompt"), "Negative prompt");
        assert_eq!(humanize("aspectRatio"), "Aspect ratio");
        assert_eq!(humanize("seed"), "Seed");
    }
}
