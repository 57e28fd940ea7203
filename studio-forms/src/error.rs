use serde::Serialize;
use thiserror::Error;

/// One failed check, addressed by dotted field path (`style.color`, `shots.0.prompt`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Invalid schema at '{path}': {message}")]
    InvalidSchema { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid field path: {0}")]
    InvalidPath(String),

    #[error("Field '{path}' has no variant {index}")]
    UnknownVariant { path: String, index: usize },

    #[error("Form has {} invalid field(s)", .0.len())]
    Invalid(Vec<ValidationIssue>),
}

impl FormError {
    pub(crate) fn schema(path: &str, message: impl Into<String>) -> Self {
        FormError::InvalidSchema {
            path: if path.is_empty() { "#".to_string() } else { path.to_string() },
            message: message.into(),
        }
    }
}
