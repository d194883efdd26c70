//! Webhook delivery back to the trading engine.
//!
//! Delivery is at-least-once with a bounded retry ladder; the engine's
//! state guards absorb duplicates.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{TradingError, TradingResult};
use crate::models::{ErrorNotification, FillNotification};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct Notifier {
    engine_url: String,
    http: reqwest::Client,
}

impl Notifier {
    pub fn new(engine_url: &str) -> Self {
        Self {
            engine_url: engine_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub async fn send_fill_notification(&self, notification: &FillNotification) -> TradingResult<()> {
        let url = format!("{}/order-fill-notification", self.engine_url);
        self.post_with_retries(&url, notification, &notification.order_id, "fill")
            .await
    }

    pub async fn send_error_notification(
        &self,
        notification: &ErrorNotification,
    ) -> TradingResult<()> {
        let url = format!("{}/order-fill-error-notification", self.engine_url);
        self.post_with_retries(&url, notification, &notification.order_id, "error")
            .await
    }

    async fn post_with_retries<T: serde::Serialize>(
        &self,
        url: &str,
        payload: &T,
        order_id: &str,
        kind: &str,
    ) -> TradingResult<()> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.http.post(url).json(payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Sent {} notification for order {}", kind, order_id);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!(
                        "Engine returned {} for {} notification (attempt {}/{})",
                        resp.status(),
                        kind,
                        attempt,
                        MAX_ATTEMPTS
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to send {} notification (attempt {}/{}): {}",
                        kind, attempt, MAX_ATTEMPTS, e
                    );
                }
            }

            if attempt < MAX_ATTEMPTS {
                // Linear backoff: 1s, then 2s.
                sleep(RETRY_DELAY * attempt).await;
            }
        }

        Err(TradingError::ApiConnection(format!(
            "failed to deliver {} notification for order {} after {} attempts",
            kind, order_id, MAX_ATTEMPTS
        )))
    }
}
