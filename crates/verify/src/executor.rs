//! Navigation and user input
//!
//! Actions never wait for their effects. A click returns as soon as it was
//! dispatched; whatever the page does in response is checked by the next
//! assertion.

use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};
use crate::locator::{resolve, ElementLocator};
use crate::session::PageSession;

/// Extra time granted to the driver to report its own navigation timeout
/// before the harness gives up on it.
const NAVIGATION_GRACE: Duration = Duration::from_millis(2000);

/// Load `url` (root-relative paths join the base URL) and wait for the load
/// event, failing with [`VerifyError::NavigationTimeout`] past `limit`.
pub async fn navigate(session: &mut PageSession, url: &str, limit: Duration) -> VerifyResult<String> {
    let absolute = session.absolute_url(url);
    let timeout_ms = limit.as_millis() as u64;

    match timeout(limit + NAVIGATION_GRACE, session.navigate(&absolute, limit)).await {
        Ok(Ok(())) => Ok(absolute),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(VerifyError::NavigationTimeout {
            url: absolute,
            timeout_ms,
        }),
    }
}

/// Click the first element `locator` resolves to.
pub async fn click(session: &mut PageSession, locator: &ElementLocator) -> VerifyResult<String> {
    let handles = resolve(session, locator).await?;
    let Some(first) = handles.first() else {
        return Err(VerifyError::ElementNotFound(locator.to_string()));
    };

    if handles.len() > 1 {
        debug!("{} matched {} elements, clicking the first", locator, handles.len());
    }

    session.click(first.id()).await?;
    Ok(first.describe())
}
