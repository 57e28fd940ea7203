use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub cors: Option<CorsConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Cookie holding the signed session token
    pub session_cookie: String,
    /// Cookies whose names start with one of these are exported
    pub cookie_prefixes: Vec<String>,
    /// Lifetime assumed for sessions the verifier does not date
    pub session_ttl_secs: i64,
    /// Session endpoint of the auth server. Without it any session cookie is
    /// trusted, which is only suitable for local development.
    pub verify_url: Option<String>,
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: "better-auth.session_token".to_string(),
            cookie_prefixes: vec![
                "better-auth.".to_string(),
                "__Secure-better-auth.".to_string(),
            ],
            session_ttl_secs: 7 * 24 * 60 * 60,
            verify_url: None,
            cookie_domain: None,
            secure_cookies: true,
        }
    }
}

impl AuthConfig {
    pub fn is_auth_cookie(&self, name: &str) -> bool {
        self.cookie_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Session cookie names accepted on a request, plain and `__Secure-` forms
    pub fn session_cookie_names(&self) -> [String; 2] {
        [
            self.session_cookie.clone(),
            format!("__Secure-{}", self.session_cookie),
        ]
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl ApiConfig {
    /// Loads the config file from the user config dir, writing a default one
    /// on first run. `STUDIO_API__SECTION__KEY` variables override the file.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();
        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            let mut defaults = ApiConfig::default();
            defaults.cors = Some(CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            });
            let contents = toml::to_string_pretty(&defaults).map_err(|e| {
                ConfigError::Message(format!("Failed to serialize default config: {e}"))
            })?;
            std::fs::write(config_path, contents).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
            tracing::info!(path = %config_path.display(), "Wrote default config");
        }

        Config::builder()
            .add_source(File::from(config_path.to_path_buf()))
            .add_source(Environment::with_prefix("STUDIO_API").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("ai-studio/api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}
