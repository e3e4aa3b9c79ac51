//! Readiness probe for the application under test

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::{VerifyError, VerifyResult};
use crate::wait::deadline_after;

/// Poll `base_url` until it answers with a non-server-error status.
///
/// The application is started by someone else; this only waits for it.
pub async fn wait_until_ready(
    base_url: &str,
    limit: Duration,
    interval: Duration,
) -> VerifyResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .no_proxy()
        .build()?;

    let deadline = deadline_after(limit);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("Application is reachable at {}", base_url);
                return Ok(());
            }
            Ok(resp) => {
                warn!("Readiness check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for application at {}...", base_url);
                }
                // Connection refused is expected while the dev server starts
                if !e.is_connect() {
                    warn!("Readiness check error: {}", e);
                }
            }
        }

        if deadline.saturating_duration_since(Instant::now()) < interval {
            return Err(VerifyError::TargetUnreachable {
                url: base_url.to_string(),
                attempts,
            });
        }

        sleep(interval).await;
    }
}
