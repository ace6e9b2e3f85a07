use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hosteldesk::config::Config;
use hosteldesk::uploads::{ImageStore, PUBLIC_PREFIX};
use hosteldesk::AppState;

#[derive(Parser, Debug)]
#[command(name = "hosteldesk")]
#[command(author, version, about = "A hostel maintenance complaint tracker", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hosteldesk.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hosteldesk v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data and upload directories exist
    let uploads_dir = config.uploads_dir();
    hosteldesk::utils::ensure_dir(&config.server.data_dir)?;
    hosteldesk::utils::ensure_dir(&uploads_dir)?;

    // Initialize database
    let db = hosteldesk::db::init(&config.server.data_dir).await?;

    // Ensure the configured admin user exists
    hosteldesk::api::auth::ensure_admin_user(
        &db,
        &config.auth.admin_email,
        &config.auth.admin_password,
    )
    .await?;

    // Create app state
    let uploads = ImageStore::new(&uploads_dir, config.uploads.max_bytes);
    let state = Arc::new(AppState::new(config.clone(), db, uploads));

    // API router plus public serving of stored images
    let app = hosteldesk::api::create_router(state)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&uploads_dir));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
