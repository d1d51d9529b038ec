use std::net::SocketAddr;
use std::sync::Arc;

use caretrack_core::clock::{Clock, SystemClock};
use caretrack_core::config::CaretrackConfig;
use caretrack_store::SqliteStore;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod http;

#[derive(Debug, Parser)]
#[command(name = "caretrack-gateway", version, about = "Caregiver visit tracking API")]
struct Cli {
    /// Path to the TOML config file (falls back to CARETRACK_CONFIG, then ./caretrack.toml).
    #[arg(short, long)]
    config: Option<String>,

    /// Load the demo caregiver, auth client and visits before serving.
    #[arg(long)]
    seed_demo: bool,

    /// Print an argon2 hash for a client secret and exit.
    #[arg(long, value_name = "SECRET")]
    hash_secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(secret) = cli.hash_secret.as_deref() {
        println!("{}", caretrack_auth::secret::hash_secret(secret)?);
        return Ok(());
    }

    let config = CaretrackConfig::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    caretrack_store::db::init_db(&db)?;
    info!("database schema ready");

    if cli.seed_demo {
        if caretrack_store::seed::insert_demo(&db, chrono::Utc::now())? {
            info!(
                client_id = caretrack_store::seed::DEMO_CLIENT_ID,
                "demo data loaded"
            );
        } else {
            info!("demo data already present");
        }
    }

    let store = Arc::new(SqliteStore::new(db));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let addr: SocketAddr = config.app.bind_addr().parse()?;
    let name = config.app.name.clone();

    let state = Arc::new(app::AppState::new(config, store, clock)?);
    let router = app::build_router(state);

    info!(%addr, app = %name, "caretrack gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("caretrack gateway stopped");
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
