use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::Engine;

/// Background task that periodically drops expired holds until `shutdown` fires.
pub async fn run_reaper(engine: Arc<Engine>, every: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("hold sweep stopped");
                return;
            }
            _ = interval.tick() => {
                let removed = engine.sweep_expired_holds().await;
                if removed > 0 {
                    debug!("swept {removed} expired holds");
                }
            }
        }
    }
}

/// Running sweep task plus the token that stops it.
pub struct Reaper {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl Reaper {
    pub fn spawn(engine: Arc<Engine>, every: Duration) -> Self {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_reaper(engine, every, shutdown.clone()));
        Self { shutdown, handle }
    }

    /// Cancel the sweep and wait for the task to exit.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        self.shutdown.cancel();
        self.handle.await
    }
}
