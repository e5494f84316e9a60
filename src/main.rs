use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use drinks_api::auth::AuthGate;
use drinks_api::config::AppConfig;
use drinks_api::database::{DatabaseManager, DrinkStore, MemoryDrinkStore, PgDrinkStore};
use drinks_api::{app, AppState};

#[derive(Parser)]
#[command(name = "drinks-api")]
#[command(about = "Coffee shop drinks menu API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Keep drinks in process memory instead of PostgreSQL")]
        in_memory: bool,

        #[arg(long, help = "Port to listen on, overrides DRINKS_API_PORT/PORT")]
        port: Option<u16>,
    },

    #[command(about = "Drop and recreate the drinks table. Destroys all records")]
    ResetDb {
        #[arg(long, help = "Leave the table empty instead of adding the sample drink")]
        no_seed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_DOMAIN, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("drinks_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { in_memory: false, port: None }) {
        Commands::Serve { in_memory, port } => serve(config, in_memory, port).await,
        Commands::ResetDb { no_seed } => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            DatabaseManager::reset(&pool, !no_seed)
                .await
                .context("failed to reset drinks table")?;
            pool.close().await;
            Ok(())
        }
    }
}

async fn serve(mut config: AppConfig, in_memory: bool, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Starting drinks API in {:?} mode", config.environment);

    let store: Arc<dyn DrinkStore> = if in_memory {
        warn!("Using in-memory store; drinks are lost on shutdown");
        Arc::new(MemoryDrinkStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        Arc::new(PgDrinkStore::new(pool))
    };

    let gate = AuthGate::from_config(&config.auth).context("invalid authorization configuration")?;
    let router = app(AppState::new(store, Arc::new(gate)), &config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Drinks API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Drinks API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
