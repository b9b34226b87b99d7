use backend_lib::{config::Settings, router, AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// RehabDesk clinic dashboard backend
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize configuration
    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load().or_else(|_| {
            tracing::debug!("trying alternate config location");
            Settings::load_from("config/rehabdesk.toml")
        })?,
    };

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create application state for the configured backend
    let state = Arc::new(AppState::from_settings(settings)?);

    // Initial session load, then keep following session-change events
    let monitor = state.monitor();
    monitor.initialize().await;
    let _monitor_handle = monitor.spawn();

    // Create the router
    let app = router::create_router(Arc::clone(&state));

    // Start the server
    let addr = state.settings.bind_addr;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
