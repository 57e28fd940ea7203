use crate::cli::Context;
use crate::error::CliError;
use crate::output::print_structured;
use serde_json::Value;
use shared_types::GenerationType;
use std::path::{Path, PathBuf};
use studio_forms::{FormDefinition, FormState, RenderContext};
use tracing::debug;

/// Which task a schema describes
#[derive(Debug, Clone, clap::Args)]
pub struct FormTarget {
    /// Generation type: image, video, audio or music
    #[arg(long = "type", default_value = "image")]
    pub generation_type: GenerationType,

    #[arg(long, default_value = "default")]
    pub provider: String,

    #[arg(long, default_value = "default")]
    pub model: String,
}

/// Parameter form commands
#[derive(Debug, clap::Subcommand)]
pub enum FormCommands {
    /// Print the default values of a schema
    Defaults {
        schema: PathBuf,
        #[command(flatten)]
        target: FormTarget,
    },
    /// Print the fields a form shows for the given values
    Fields {
        schema: PathBuf,
        /// JSON file with values to apply over the defaults
        #[arg(long)]
        values: Option<PathBuf>,
        #[command(flatten)]
        target: FormTarget,
    },
    /// Validate values and print the task submission
    Submit {
        schema: PathBuf,
        values: PathBuf,
        #[command(flatten)]
        target: FormTarget,
    },
}

impl FormCommands {
    pub fn execute(&self, context: &Context) -> Result<(), CliError> {
        match self {
            FormCommands::Defaults { schema, target } => {
                let definition = load_definition(schema, target)?;
                let defaults = definition.default_values();
                if !print_structured(context.format, &defaults)? {
                    println!("{}", serde_json::to_string_pretty(&defaults)?);
                }
                Ok(())
            }
            FormCommands::Fields {
                schema,
                values,
                target,
            } => {
                let definition = load_definition(schema, target)?;
                let state = load_state(&definition, values.as_deref())?;
                let rows = definition.render(&state);
                if print_structured(context.format, &rows)? {
                    return Ok(());
                }
                for row in rows {
                    let marker = if row.required { "*" } else { "" };
                    println!(
                        "{}{}{} [{}] = {}",
                        "  ".repeat(row.depth),
                        row.label,
                        marker,
                        row.renderer.name(),
                        row.value
                    );
                }
                Ok(())
            }
            FormCommands::Submit {
                schema,
                values,
                target,
            } => {
                let definition = load_definition(schema, target)?;
                let state = load_state(&definition, Some(values))?;
                let submission = state.submission(&definition)?;
                if !print_structured(context.format, &submission)? {
                    println!("{}", serde_json::to_string_pretty(&submission)?);
                }
                Ok(())
            }
        }
    }
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Validation(format!("{} is not valid JSON: {}", path.display(), e)))
}

pub fn load_definition(schema: &Path, target: &FormTarget) -> Result<FormDefinition, CliError> {
    let schema = read_json(schema)?;
    let context = RenderContext {
        provider: target.provider.clone(),
        model: target.model.clone(),
    };
    Ok(FormDefinition::from_json(&schema, target.generation_type, context)?)
}

/// Defaults with the top-level values of `values` written over them
pub fn load_state(definition: &FormDefinition, values: Option<&Path>) -> Result<FormState, CliError> {
    let mut state = FormState::new(definition);
    let Some(path) = values else {
        return Ok(state);
    };

    match read_json(path)? {
        Value::Object(values) => {
            for (key, value) in values {
                debug!(field = %key, "Applying value");
                state.set(&key, value)?;
            }
            Ok(state)
        }
        _ => Err(CliError::Validation(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> FormTarget {
        FormTarget {
            generation_type: GenerationType::Image,
            provider: "flux".to_string(),
            model: "flux-pro".to_string(),
        }
    }

    fn write(dir: &Path, name: &str, value: Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_values_overlay_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(
            dir.path(),
            "schema.json",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {"type": "string"},
                    "steps": {"type": "integer", "minimum": 1, "maximum": 50}
                },
                "required": ["prompt"]
            }),
        );
        let values = write(dir.path(), "values.json", json!({"prompt": "a lighthouse"}));

        let definition = load_definition(&schema, &target()).unwrap();
        let state = load_state(&definition, Some(&values)).unwrap();
        let submission = state.submission(&definition).unwrap();
        assert_eq!(submission.model, "flux-pro");
        assert_eq!(submission.params, json!({"prompt": "a lighthouse", "steps": 1}));
    }

    #[test]
    fn test_non_object_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", json!({"type": "object"}));
        let values = write(dir.path(), "values.json", json!([1, 2]));

        let definition = load_definition(&schema, &target()).unwrap();
        let err = load_state(&definition, Some(&values)).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_bad_schema_is_a_form_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "schema.json", json!({"type": "string"}));
        let err = load_definition(&schema, &target()).unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }
}
