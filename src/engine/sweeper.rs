//! Periodic order sync job.
//!
//! The sweep bridges any gap between stored level state and the venue: it
//! re-drives stuck placements and reconciles outstanding orders, going
//! through the same fill routine as the webhook path.

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::engine::GridService;
use crate::error::{TradingError, TradingResult};

/// Register the sync job on the scheduler with the given cron expression
/// (six fields, seconds first).
pub async fn register_sync_job(
    scheduler: &JobScheduler,
    service: Arc<GridService>,
    cron_expr: &str,
) -> TradingResult<()> {
    let job = Job::new_async(cron_expr, move |_uuid, _lock| {
        let service = service.clone();
        Box::pin(async move {
            info!("Running order sync job");
            match service.sync_orders().await {
                Ok(()) => info!("Order sync job completed"),
                Err(e) => error!("Order sync job failed: {}", e),
            }
        })
    })
    .map_err(|e| TradingError::Config(format!("invalid sync job cron expression: {}", e)))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| TradingError::Internal(format!("failed to register sync job: {}", e)))?;

    Ok(())
}
