pub mod annotations;
pub mod defaults;
pub mod error;
pub mod form;
pub mod registry;
pub mod schema;
pub mod validate;
pub mod visitor;

pub use annotations::{Annotations, ShowWhen};
pub use defaults::{default_value, DefaultsVisitor};
pub use error::{FormError, ValidationIssue};
pub use form::{CompiledField, FormDefinition, FormState, RenderedField};
pub use registry::{RenderContext, RendererKind};
pub use schema::{Schema, SchemaKind, SchemaMeta};
pub use visitor::SchemaVisitor;

#[cfg(test)]
mod tests;
