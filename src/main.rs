//! Pokedex server
//!
//! Serves the CRUD surface and derived queries over HTTP.

use std::sync::Arc;

use clap::Parser;
use pokedex::api::{self, AppState};
use pokedex::constants::{
    APP_NAME, APP_VERSION, HTTP_BIND_ADDRESS_DEFAULT, PAGE_SIZE_DEFAULT, PAGE_SIZE_MAX,
};
use pokedex::storage::{MemoryBackend, StorageBackend};

// =============================================================================
// CLI
// =============================================================================

/// Pokedex - CRUD service for pokemon, types and moves
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "CRUD service for pokemon, types and moves")]
#[command(version)]
struct Cli {
    /// HTTP bind address
    #[arg(short, long, env = "POKEDEX_BIND", default_value = HTTP_BIND_ADDRESS_DEFAULT)]
    bind: String,

    /// Records per list page
    #[arg(
        long,
        env = "POKEDEX_PAGE_SIZE",
        default_value_t = PAGE_SIZE_DEFAULT,
        value_parser = parse_page_size
    )]
    page_size: usize,

    /// Postgres connection string (in-memory store when absent)
    #[cfg(feature = "postgres")]
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    let size: usize = raw.parse().map_err(|e| format!("{e}"))?;
    if size == 0 || size > PAGE_SIZE_MAX {
        return Err(format!("must be between 1 and {PAGE_SIZE_MAX}"));
    }
    Ok(size)
}

fn memory_store() -> Arc<dyn StorageBackend> {
    tracing::info!("Using in-memory store");
    Arc::new(MemoryBackend::new())
}

#[cfg(feature = "postgres")]
async fn open_store(cli: &Cli) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match &cli.database_url {
        Some(url) => {
            let backend = pokedex::storage::PostgresBackend::new(url).await?;
            tracing::info!("Using Postgres store");
            Ok(Arc::new(backend))
        }
        None => Ok(memory_store()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn open_store(_cli: &Cli) -> anyhow::Result<Arc<dyn StorageBackend>> {
    Ok(memory_store())
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info,tower_http=debug",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("Pokedex v{}", APP_VERSION);

    let store = open_store(&cli).await?;
    let app = api::router(AppState::new(store, cli.page_size));

    let addr: std::net::SocketAddr = cli.bind.parse()?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
