use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::SnapshotCache;
use crate::error::LedFxError;
use crate::model::Snapshot;

/// Drives [`SnapshotCache::refresh`] on a fixed interval.
pub struct Poller {
    cache: SnapshotCache,
    interval: Duration,
    token: Option<CancellationToken>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Poller {
    pub fn new(cache: SnapshotCache, interval: Duration) -> Self {
        Poller {
            cache,
            interval,
            token: None,
            handle: None,
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Run the first refresh, then spawn the polling task.
    ///
    /// The first refresh error is returned as-is so setup can report it.
    pub async fn start(&mut self) -> anyhow::Result<Arc<Snapshot>> {
        if self.is_running() {
            anyhow::bail!("Poller already started");
        }
        if self.interval.is_zero() {
            anyhow::bail!("Poll interval must be non-zero");
        }

        let first = self.cache.refresh().await.inspect_err(|e: &LedFxError| {
            error!("Initial refresh failed: {}", e);
        })?;
        info!("Initial refresh found {} virtuals", first.len());

        let token = CancellationToken::new();
        self.token = Some(token.clone());

        let cache = self.cache.clone();
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Exiting poller loop");
                        break;
                    },
                    _ = interval.tick() => {
                        if let Err(e) = cache.refresh().await {
                            warn!("Error communicating with LedFx: {}", e);
                        }
                    }
                }
            }
        });

        self.handle = Some(handle);

        Ok(first)
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.token
            .take()
            .ok_or(anyhow::anyhow!("Poller not started"))?
            .cancel();
        self.handle
            .take()
            .ok_or(anyhow::anyhow!("Poller not started"))?
            .await
            .map_err(|_| anyhow::anyhow!("Failed to join poller task"))?;

        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}
