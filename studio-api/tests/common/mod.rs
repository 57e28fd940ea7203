use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App, Error};
use std::sync::Arc;
use studio_api::auth::{PresenceVerifier, SessionVerifier};
use studio_api::config::ApiConfig;
use studio_api::handlers::AppState;

pub const SESSION_COOKIE: &str = "better-auth.session_token";

pub async fn setup_app_with(
    config: ApiConfig,
    verifier: Arc<dyn SessionVerifier>,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(config, verifier)))
            .configure(studio_api::configure),
    )
    .await
}

pub async fn setup_app() -> impl Service<actix_http::Request, Response = ServiceResponse, Error = Error> {
    let config = ApiConfig::default();
    let verifier = Arc::new(PresenceVerifier::new(config.auth.session_ttl_secs));
    setup_app_with(config, verifier).await
}
