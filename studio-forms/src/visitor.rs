use crate::schema::{Schema, SchemaKind};

/// Double dispatch over [`SchemaKind`]. Each method receives the whole node so
/// implementations can read `meta` alongside the kind-specific parts.
pub trait SchemaVisitor {
    type Output;

    fn visit_object(
        &mut self,
        schema: &Schema,
        properties: &[(String, Schema)],
        required: &[String],
    ) -> Self::Output;

    fn visit_array(&mut self, schema: &Schema, items: Option<&Schema>) -> Self::Output;

    fn visit_string(&mut self, schema: &Schema) -> Self::Output;

    fn visit_number(&mut self, schema: &Schema, integer: bool) -> Self::Output;

    fn visit_boolean(&mut self, schema: &Schema) -> Self::Output;

    fn visit_all_of(&mut self, schema: &Schema, branches: &[Schema]) -> Self::Output;

    fn visit_any_of(&mut self, schema: &Schema, branches: &[Schema]) -> Self::Output;

    fn visit_any(&mut self, schema: &Schema) -> Self::Output;
}

impl Schema {
    pub fn accept<V: SchemaVisitor>(&self, visitor: &mut V) -> V::Output {
        match &self.kind {
            SchemaKind::Object {
                properties,
                required,
            } => visitor.visit_object(self, properties, required),
            SchemaKind::Array { items, .. } => visitor.visit_array(self, items.as_deref()),
            SchemaKind::String { .. } => visitor.visit_string(self),
            SchemaKind::Number { integer, .. } => visitor.visit_number(self, *integer),
            SchemaKind::Boolean => visitor.visit_boolean(self),
            SchemaKind::AllOf(branches) => visitor.visit_all_of(self, branches),
            SchemaKind::AnyOf(branches) => visitor.visit_any_of(self, branches),
            SchemaKind::Any => visitor.visit_any(self),
        }
    }
}
