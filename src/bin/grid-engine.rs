// Trading engine service: owns the grid levels, the state machine, the
// audit log and the recovery sweeper.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio_cron_scheduler::JobScheduler;
use tracing::{info, warn};

use grid_harvester::clients::OrderAssuranceClient;
use grid_harvester::db::{Database, GridLevelRepository, TransactionRepository};
use grid_harvester::engine::{self, GridService};
use grid_harvester::EngineConfig;

#[derive(Parser)]
#[command(name = "grid-engine")]
#[command(version)]
#[command(about = "Grid trading engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading engine service
    Serve,

    /// Initialize grid levels for a symbol, then exit
    InitGrid {
        /// Trading symbol (e.g. ETHUSDT)
        #[arg(long)]
        symbol: String,

        /// Minimum price of the grid
        #[arg(long)]
        min_price: String,

        /// Maximum price of the grid
        #[arg(long)]
        max_price: String,

        /// Price step between levels
        #[arg(long)]
        grid_step: String,

        /// Quote amount (USDT) per buy
        #[arg(long)]
        buy_amount: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = EngineConfig::from_env()?;

    if let Some(parent) = Path::new(&cfg.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::open(&cfg.db_path)?;

    let repo = GridLevelRepository::new(&db);
    let tx_repo = TransactionRepository::new(&db);
    let assurance = Arc::new(OrderAssuranceClient::new(&cfg.order_assurance_url));
    let service = Arc::new(GridService::new(repo, tx_repo, assurance, cfg.trading_fee_pct));

    if let Some(Commands::InitGrid {
        symbol,
        min_price,
        max_price,
        grid_step,
        buy_amount,
    }) = cli.command
    {
        let min_price = Decimal::from_str(&min_price)?;
        let max_price = Decimal::from_str(&max_price)?;
        let grid_step = Decimal::from_str(&grid_step)?;
        let buy_amount = Decimal::from_str(&buy_amount)?;

        info!(
            "Initializing grid for {}: range {}-{}, step {}, amount {} USDT",
            symbol, min_price, max_price, grid_step, buy_amount
        );

        let summary = service
            .create_grid(&symbol.to_uppercase(), min_price, max_price, grid_step, buy_amount)
            .await?;

        info!(
            "Grid initialization complete: {} created, {} already existed",
            summary.created, summary.skipped
        );
        return Ok(());
    }

    let scheduler = if cfg.sync_job_enabled {
        let scheduler = JobScheduler::new().await?;
        engine::sweeper::register_sync_job(&scheduler, service.clone(), &cfg.sync_job_cron).await?;
        scheduler.start().await?;
        info!("Sync job scheduled with cron: {}", cfg.sync_job_cron);
        Some(scheduler)
    } else {
        warn!("Sync job disabled; stuck levels will not be recovered automatically");
        None
    };

    let app = engine::api::router(service);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.server_port)).await?;
    info!("Trading engine listening on port {}", cfg.server_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(mut scheduler) = scheduler {
        scheduler.shutdown().await.ok();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutting down server...");
}
