use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::client::LedFxApi;
use crate::error::LedFxError;
use crate::model::Snapshot;

type Outcome = Result<Arc<Snapshot>, LedFxError>;

struct Shared {
    api: Arc<dyn LedFxApi>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    /// Held for the duration of a fetch. Stores the outcome of the last one.
    refresh: Mutex<Option<Outcome>>,
    /// Bumped every time a fetch finishes.
    generation: AtomicU64,
    last_ok: AtomicBool,
}

/// Latest `/api/virtuals` state, shared by every entity.
///
/// Cloning is cheap; all clones see the same snapshot. Reads never wait on a
/// fetch in progress.
#[derive(Clone)]
pub struct SnapshotCache {
    shared: Arc<Shared>,
}

impl SnapshotCache {
    pub fn new(api: Arc<dyn LedFxApi>) -> Self {
        SnapshotCache {
            shared: Arc::new(Shared {
                api,
                snapshot: RwLock::new(None),
                refresh: Mutex::new(None),
                generation: AtomicU64::new(0),
                last_ok: AtomicBool::new(false),
            }),
        }
    }

    /// Last successfully fetched snapshot, `None` until the first one lands.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        match self.shared.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    pub fn last_refresh_succeeded(&self) -> bool {
        self.shared.last_ok.load(Ordering::Acquire)
    }

    /// Fetch all virtuals and swap the snapshot in.
    ///
    /// Callers arriving while a fetch is running wait for it and get its
    /// outcome instead of issuing their own. On failure the previous
    /// snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, LedFxError> {
        let seen = self.shared.generation.load(Ordering::Acquire);
        let mut last = self.shared.refresh.lock().await;

        if self.shared.generation.load(Ordering::Acquire) != seen {
            if let Some(outcome) = last.as_ref() {
                debug!("Joined an in-flight refresh");
                return outcome.clone();
            }
        }

        let outcome = match self.shared.api.virtuals().await {
            Ok(virtuals) => {
                let snapshot = Arc::new(Snapshot::new(virtuals));
                self.store(snapshot.clone());
                debug!("Refreshed {} virtuals", snapshot.len());
                Ok(snapshot)
            }
            Err(e) => Err(e),
        };

        self.shared.last_ok.store(outcome.is_ok(), Ordering::Release);
        *last = Some(outcome.clone());
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Refresh after a local change. Failures are logged; the next poll retries.
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Refresh after update failed: {}", e);
        }
    }

    fn store(&self, snapshot: Arc<Snapshot>) {
        let mut guard = match self.shared.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(snapshot);
    }
}
