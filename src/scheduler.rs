use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{error::AppError, repository::RepositoryState};

/// Quotes older than this stop being the quote of the day.
pub const QUOTE_RETENTION_HOURS: i64 = 12;

/// Spawn the quote expiry background task.
///
/// Sleeps one `period`, deactivates stale quotes, repeats. Stops as soon as `cancel`
/// fires, including mid-sleep.
pub fn start(repo: RepositoryState, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_loop(repo, period, cancel).await;
    })
}

async fn run_loop(repo: RepositoryState, period: Duration, cancel: CancellationToken) {
    tracing::info!("Quote expiry task started (interval={:?})", period);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {},
            _ = cancel.cancelled() => {
                tracing::info!("Quote expiry task shutting down");
                return;
            }
        }

        match run_cleanup(&repo, Utc::now()).await {
            Ok(0) => tracing::debug!("Quote expiry: nothing to deactivate"),
            Ok(n) => tracing::info!("Quote expiry: deactivated {} quote(s)", n),
            Err(e) => tracing::error!("Quote expiry error: {}", e),
        }
    }
}

/// One cleanup pass as of `now`. Exposed for tests.
pub async fn run_cleanup(repo: &RepositoryState, now: DateTime<Utc>) -> Result<u64, AppError> {
    let cutoff = now - ChronoDuration::hours(QUOTE_RETENTION_HOURS);
    repo.expire_quotes(cutoff).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, Repository};
    use std::sync::Arc;

    #[tokio::test]
    async fn task_stops_on_cancel() {
        let repo: RepositoryState = Arc::new(InMemoryRepository::new());
        let cancel = CancellationToken::new();
        let handle = start(repo, Duration::from_secs(3600), cancel.clone());

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "expiry task should stop after cancellation");
    }

    #[tokio::test]
    async fn first_run_happens_after_one_period() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();
        repo.insert_quote_at("vieja", true, now - ChronoDuration::hours(13))
            .await;
        let cancel = CancellationToken::new();
        let handle = start(repo.clone(), Duration::from_millis(200), cancel.clone());

        assert!(repo.active_quote().await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(repo.active_quote().await.unwrap().is_none());

        cancel.cancel();
        handle.await.unwrap();
    }
}
