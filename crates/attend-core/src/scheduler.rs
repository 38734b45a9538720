//! Recurring auto-logout task

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::AutoLogoutSweeper;

/// Runs the sweeper on a fixed interval until shut down. The first sweep
/// happens as soon as the task starts.
pub struct AutoLogoutScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AutoLogoutScheduler {
    /// Spawn the scheduler onto the current tokio runtime
    pub fn spawn(sweeper: Arc<AutoLogoutSweeper>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(sweeper, interval, cancel.clone()));
        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the loop and wait for an in-flight sweep to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Auto-logout task ended abnormally");
        }
    }
}

async fn run(sweeper: Arc<AutoLogoutSweeper>, interval: Duration, cancel: CancellationToken) {
    info!(
        interval_secs = interval.as_secs(),
        session_limit_secs = sweeper.session_limit().as_secs(),
        "Auto-logout scheduler started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Auto-logout scheduler stopping");
                break;
            }
            _ = ticker.tick() => {
                // Store calls block; keep them off the async workers
                let sweeper = sweeper.clone();
                match tokio::task::spawn_blocking(move || sweeper.sweep()).await {
                    Ok(Ok(report)) => {
                        debug!(closed = report.closed_count(), "Scheduled sweep finished");
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "Scheduled sweep failed, retrying next interval");
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled sweep panicked");
                    }
                }
            }
        }
    }
}
