use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use studio_api::auth::{PresenceVerifier, RemoteSessionVerifier, SessionVerifier};
use studio_api::config::ApiConfig;
use studio_api::handlers::AppState;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "studio-api", version, about = "Auth cookie export service for the AI studio desktop app")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (mut config, config_path) = match &args.config {
        Some(path) => (ApiConfig::load_from(path)?, path.clone()),
        None => ApiConfig::load()?,
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!(path = %config_path.display(), "Loaded configuration");

    let verifier: Arc<dyn SessionVerifier> = match &config.auth.verify_url {
        Some(url) => {
            info!(url = %url, "Verifying sessions against auth server");
            Arc::new(RemoteSessionVerifier::new(url.clone()))
        }
        None => {
            warn!("No auth.verify_url configured, trusting any session cookie");
            Arc::new(PresenceVerifier::new(config.auth.session_ttl_secs))
        }
    };

    let bind_addr = config.bind_addr();
    let allowed_origins = config
        .cors
        .as_ref()
        .map(|cors| cors.allowed_origins.clone())
        .unwrap_or_default();
    let state = web::Data::new(AppState::new(config, verifier));

    info!("Starting studio-api server at http://{}", bind_addr);
    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET"])
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(studio_api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
