use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

use super::service::SessionService;

/// Starts the background task that periodically sweeps expired refresh sessions
#[instrument(skip(session_service))]
pub async fn start_cleanup_task(session_service: Arc<SessionService>, cleanup_interval: Duration) {
    info!(
        cleanup_interval_secs = cleanup_interval.as_secs(),
        "Starting session cleanup background task"
    );

    let mut ticker = interval(cleanup_interval);

    loop {
        ticker.tick().await;
        run_cleanup(&session_service).await;
    }
}

/// Runs one sweep, logging instead of propagating failures
async fn run_cleanup(session_service: &SessionService) -> u64 {
    match session_service.cleanup_expired_sessions().await {
        Ok(removed) => removed,
        Err(e) => {
            error!(error = %e, "Session cleanup task failed");
            0
        }
    }
}
