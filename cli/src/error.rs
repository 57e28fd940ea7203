use std::fmt;
use studio_client::ClientError;
use studio_forms::FormError;

/// Main error type for the studio CLI
#[derive(Debug)]
pub enum CliError {
    /// Configuration-related errors
    Config(String),
    /// File I/O errors
    Io(std::io::Error),
    /// Input rejected before anything was sent (no model, empty message,
    /// invalid form values)
    Validation(String),
    /// Command execution errors
    Command(String),
    /// Unusable parameter schema
    Form(String),
    /// Communication with the studio backend
    Communication(String),
    /// Generic errors from anyhow
    Other(anyhow::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Validation(msg) => write!(f, "Invalid input: {msg}"),
            CliError::Command(msg) => write!(f, "Command error: {msg}"),
            CliError::Form(msg) => write!(f, "Schema error: {msg}"),
            CliError::Communication(msg) => write!(f, "Communication error: {msg}"),
            CliError::Other(err) => write!(f, "Error: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(err) => Some(err),
            CliError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl CliError {
    /// Get the exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Io(_) => 3,
            CliError::Validation(_) => 4,
            CliError::Command(_) => 5,
            CliError::Form(_) => 6,
            CliError::Communication(_) => 7,
            CliError::Other(_) => 1,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Other(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other(err.into())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Other(err.into())
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        if err.is_user_input() {
            return CliError::Validation(err.to_string());
        }
        match err {
            ClientError::Config(msg) => CliError::Config(msg),
            ClientError::SessionNotFound(id) => {
                CliError::Command(format!("Session not found: {id}"))
            }
            other if other.is_auth_error() => CliError::Communication(format!(
                "{other} (check auth_cookie or bearer_token in the client config)"
            )),
            other => CliError::Communication(other.to_string()),
        }
    }
}

impl From<FormError> for CliError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Invalid(issues) => CliError::Validation(
                issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            other => CliError::Form(other.to_string()),
        }
    }
}
