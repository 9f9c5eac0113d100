//! Periodic eviction of stale or excess staged results.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use agrimap_core::defaults;

use crate::store::{JobStore, SweepStats};

/// Periodic sweep bounding the staged-result store by age and size.
///
/// Not self-scheduling: the host drives [`Janitor::run`] on its own
/// cadence (the API binary uses a tokio interval).
pub struct Janitor {
    store: Arc<dyn JobStore>,
    ttl: Duration,
    max_entries: usize,
}

impl Janitor {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(defaults::STAGED_RESULT_TTL_SECS),
            max_entries: defaults::STAGED_RESULT_MAX_ENTRIES,
        }
    }

    /// Override the staged-result TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the size cap triggering a full clear.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// One sweep pass; returns what it did.
    pub async fn run(&self) -> SweepStats {
        let stats = self.store.sweep(self.ttl, self.max_entries).await;

        if stats.cleared_all {
            warn!(
                max_entries = self.max_entries,
                "Staged-result store exceeded size cap, cleared entirely"
            );
        } else if stats.expired > 0 {
            info!(
                expired = stats.expired,
                stamped = stats.stamped,
                "Evicted stale staged results"
            );
        } else {
            debug!(stamped = stats.stamped, "Janitor sweep complete");
        }

        stats
    }
}
