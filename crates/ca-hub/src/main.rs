use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ca_core::QueryEngine;
use ca_store::SqliteStore;

mod api;
mod error;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "ca-hub",
    version,
    about = "CrashArchive report browser"
)]
struct Args {
    /// Path to config file
    #[arg(long, default_value = "ca-hub.toml")]
    config: PathBuf,

    /// Server bind address (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Path to the report database (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct ServerConfig {
    #[serde(default = "default_bind")]
    bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct StoreConfig {
    #[serde(default = "default_db_path")]
    path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("crash_reports.db")
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_args(mut self, args: &Args) -> Self {
        if let Some(bind) = &args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(db) = &args.db {
            self.store.path = db.clone();
        }
        self
    }
}

// =============================================================================
// Application State
// =============================================================================

struct AppState {
    engine: QueryEngine<SqliteStore>,
    store: Arc<SqliteStore>,
    start_time: Instant,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    fn new(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        Self {
            engine: QueryEngine::new(store.clone()),
            store,
            start_time: Instant::now(),
            started_at: chrono::Utc::now(),
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(api::status))
        .route("/api/reports", get(api::list_reports))
        .route("/api/reports/:id/similar", get(api::similar_reports))
        .route("/api/versions", get(api::known_versions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ca_hub=info,ca_core=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?.apply_args(&args);

    let store = SqliteStore::open(&config.store.path)
        .with_context(|| format!("opening report store {}", config.store.path.display()))?;
    let state = Arc::new(AppState::new(store));

    let app = router(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  CrashArchive v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Reports:  http://{}/api/reports", addr);
    tracing::info!("  Status:   http://{}/api/status", addr);
    tracing::info!("  Database: {}", config.store.path.display());
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
