use thiserror::Error;

/// Errors surfaced by the chat client core
#[derive(Error, Debug)]
pub enum ClientError {
    /// A send or create was attempted before a model was picked
    #[error("Please select a model first")]
    NoModelSelected,

    /// User input rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transport-level failure (connection refused, timeout, ...)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Non-2xx response
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Response body could not be decoded
    #[error("Parse failed: {0}")]
    ParseFailed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The backend has no event stream for this session
    #[error("Event streaming not supported")]
    StreamUnsupported,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Check if this error is a 401 Unauthorized error (needs authentication)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::HttpStatus(status) if status == &reqwest::StatusCode::UNAUTHORIZED)
    }

    /// Check if this error is a 403 Forbidden error (permission denied)
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ClientError::HttpStatus(status) if status == &reqwest::StatusCode::FORBIDDEN)
    }

    /// Check if this is an authentication-related error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        self.is_unauthorized() || self.is_forbidden()
    }

    /// Errors raised before anything was sent over the wire
    pub fn is_user_input(&self) -> bool {
        matches!(self, ClientError::NoModelSelected | ClientError::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::ParseFailed(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::HttpStatus(status)
        } else {
            ClientError::RequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::ParseFailed(err.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_classification() {
        assert!(ClientError::HttpStatus(reqwest::StatusCode::UNAUTHORIZED).is_auth_error());
        assert!(ClientError::HttpStatus(reqwest::StatusCode::FORBIDDEN).is_forbidden());
        assert!(!ClientError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY).is_auth_error());
    }

    #[test]
    fn test_user_input_errors() {
        assert!(ClientError::NoModelSelected.is_user_input());
        assert!(ClientError::Validation("empty".into()).is_user_input());
        assert!(!ClientError::RequestFailed("refused".into()).is_user_input());
    }
}
