use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use navigation_api::{build_router, AppState};
use navigation_config::{config, AppConfig, ConfigStore, NavigationManager, PgConfigStore};

#[derive(Parser)]
#[command(name = "navigation-api", about = "Admin API for console navigation")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/navigation.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting navigation-api");

    let cli = Cli::parse();
    let config_path = cli.config.canonicalize().with_context(|| {
        format!(
            "Config file not found: {}. Create one or specify --config <path>",
            cli.config.display()
        )
    })?;
    info!(config = %config_path.display(), "Loading config");
    let file_config = config::load_config(&config_path)?;

    // Secrets come from env vars
    let app_config = AppConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(file_config.database.max_connections)
        .connect(&app_config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = file_config.database.max_connections,
        "Connected to database"
    );

    let store = PgConfigStore::new(pool);
    store.migrate().await.context("Failed to run migrations")?;
    info!("Migrations complete");

    let store: Arc<dyn ConfigStore> = Arc::new(store);
    let manager = Arc::new(NavigationManager::with_shipped_defaults(store)?);

    if file_config.navigation.seed_baseline_if_empty && manager.seed_if_empty().await? {
        info!("Seeded navigation from baseline");
    }

    let app = build_router(
        AppState::new(manager, app_config.admin_token.as_str()),
        &file_config.server.allowed_origins,
    );

    let addr = format!("{}:{}", file_config.server.host, file_config.server.port);
    info!("navigation-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
