// Price monitor: subscribes to venue prices for the grids' symbols and
// forwards throttled triggers to the trading engine.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use grid_harvester::monitor::{self, PriceMonitor};
use grid_harvester::MonitorConfig;

#[derive(Parser)]
#[command(name = "price-monitor")]
#[command(version)]
#[command(about = "Price monitor", long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let _cli = Cli::parse();
    let cfg = MonitorConfig::from_env()?;
    let monitor = Arc::new(PriceMonitor::new(cfg.clone()));

    // Prime the symbol set before the feed starts.
    if let Err(e) = monitor.refresh_symbols().await {
        warn!("Initial symbol refresh failed: {}", e);
    }

    let feed = monitor.clone();
    tokio::spawn(async move { feed.run().await });

    let refresher = monitor.clone();
    tokio::spawn(async move { refresher.run_symbol_refresh().await });

    let app = monitor::api::router(monitor);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.server_port)).await?;
    info!("Price monitor listening on port {}", cfg.server_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutting down server...");
}
