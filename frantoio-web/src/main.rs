//! frantoio-web - Record-keeping web service for an olive-oil mill
//!
//! Tracks clients, pressing batches ("moliture") and their per-crate
//! ("cassoni") weight breakdown, with role-gated section access and PDF
//! report generation.

use anyhow::Result;
use clap::Parser;
use frantoio_common::{config, db};
use frantoio_web::{build_router, AppState};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "frantoio-web", about = "Olive mill record-keeping service")]
struct Args {
    /// Root folder holding the database (overrides env/config resolution)
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen port
    #[arg(long, default_value_t = 5730)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Frantoio Manager (frantoio-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    config::ensure_root_folder(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match db::init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("frantoio-web listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
