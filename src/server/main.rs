//! Query server for postal code lookups.
//!
//! Loads the code dataset once at start-up and serves lookup, distance and
//! radius queries over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use zipgeo::config::Config;
use zipgeo::store::load_paths;
use zipgeo::{CodeStore, GeoQuery};

mod handlers;
use handlers::{
    distance_handler, health_handler, lookup_handler, radius_handler, state_handler, AppState,
};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Postal code query server")]
struct Args {
    /// Dataset file or directory (repeatable, merged in order)
    #[arg(short, long)]
    data: Vec<PathBuf>,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Largest radius accepted in miles (overrides config)
    #[arg(long)]
    max_radius: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if !args.data.is_empty() {
        config.dataset.paths = args.data.clone();
    }
    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(max_radius) = args.max_radius {
        config.query.max_radius_miles = max_radius;
    }

    if config.dataset.paths.is_empty() {
        anyhow::bail!("No dataset given: pass --data or set dataset.paths in the config");
    }

    info!("zipgeo Query Server");

    let store = load_paths(&config.dataset.paths).context("Failed to load postal code dataset")?;
    info!(
        "Loaded {} postal codes across {} states",
        store.len(),
        store.state_map().len()
    );

    let state = Arc::new(AppState {
        query: GeoQuery::new(store),
        max_radius_miles: config.query.max_radius_miles,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/lookup", get(lookup_handler))
        .route("/v1/distance", get(distance_handler))
        .route("/v1/radius", get(radius_handler))
        .route("/v1/state/{state}", get(state_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
