pub mod auth;
pub mod health;

use crate::auth::SessionVerifier;
use crate::config::ApiConfig;
use std::sync::Arc;
use std::time::SystemTime;

pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub verifier: Arc<dyn SessionVerifier>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(config: ApiConfig, verifier: Arc<dyn SessionVerifier>) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
            start_time: SystemTime::now(),
        }
    }
}
