use crate::error::ClientError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the client observes background processing of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Poll,
    Stream,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub tool_result_path: String,
    pub auth_cookie: Option<String>,
    pub bearer_token: Option<String>,
    pub request_timeout_secs: u64,
    pub poll: PollConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Pause before a re-entrant start re-checks the in-flight guard
    pub reentry_wait_ms: u64,
    pub reentry_checks: u32,
    pub cancel_refetch_delay_ms: u64,
    pub message_limit: Option<u32>,
    pub sync_mode: SyncMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_prefix: "/api/agent".to_string(),
            tool_result_path: "/api/chat/tool-result".to_string(),
            auth_cookie: None,
            bearer_token: None,
            request_timeout_secs: 30,
            poll: PollConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            reentry_wait_ms: 100,
            reentry_checks: 5,
            cancel_refetch_delay_ms: 500,
            message_limit: None,
            sync_mode: SyncMode::Poll,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn reentry_wait(&self) -> Duration {
        Duration::from_millis(self.reentry_wait_ms)
    }

    pub fn cancel_refetch_delay(&self) -> Duration {
        Duration::from_millis(self.cancel_refetch_delay_ms)
    }
}

impl ClientConfig {
    /// Layers defaults, the TOML file (explicit path or the per-user default
    /// if present) and `STUDIO_*` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ClientConfig::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path.to_path_buf()).required(true)),
            None => builder.add_source(File::from(default_config_path()).required(false)),
        };

        let config = builder
            .add_source(
                Environment::with_prefix("STUDIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClientConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.poll.interval_ms == 0 {
            return Err(ClientError::Config("poll.interval_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// `{base_url}{api_prefix}{path}`
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            path
        )
    }

    pub fn tool_result_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.tool_result_path
        )
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("studio/client.toml")
    } else {
        PathBuf::from("studio-client.toml")
    }
}
