pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use actix_web::web;

/// Registers the `/api` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(handlers::health::health_check)
            .service(handlers::auth::export_cookies),
    );
}
