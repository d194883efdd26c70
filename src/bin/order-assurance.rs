// Order-assurance gateway: idempotent order placement and status lookup
// against the exchange, with fill callbacks to the trading engine.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use grid_harvester::assurance::{self, BinanceClient, Notifier, OrderService};
use grid_harvester::AssuranceConfig;

#[derive(Parser)]
#[command(name = "order-assurance")]
#[command(version)]
#[command(about = "Idempotent order gateway", long_about = None)]
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
    let cfg = AssuranceConfig::from_env()?;

    if cfg.has_credentials() {
        info!("Exchange API credentials configured");
    } else {
        warn!("Exchange API credentials not configured - order placement will fail");
    }

    let exchange = BinanceClient::new(
        &cfg.binance_api_key,
        &cfg.binance_api_secret,
        &cfg.binance_api_url,
    );
    let notifier = Arc::new(Notifier::new(&cfg.grid_trading_url));
    let service = Arc::new(OrderService::new(exchange, notifier));

    let app = assurance::api::router(service);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.server_port)).await?;
    info!("Order assurance service listening on port {}", cfg.server_port);

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
