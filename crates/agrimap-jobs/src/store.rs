//! Staging store holding each job's terminal result until confirm/discard.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use agrimap_core::StagedResult;

/// Outcome of a sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries stamped with an insertion time this pass.
    pub stamped: usize,
    /// Entries removed for exceeding the TTL.
    pub expired: usize,
    /// Whether the size cap forced a full clear.
    pub cleared_all: bool,
}

/// Keyed store mapping a job id to its staged result.
///
/// Injected into the pipeline rather than referenced as process-wide
/// state, so each test can run against an isolated instance. Mutation is
/// limited to insert-once, delete, and the lazily-stamped `inserted_at`
/// applied during `sweep`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert the terminal result for a job. At most one entry exists per
    /// job id; the worker writes exactly once.
    async fn put(&self, result: StagedResult);

    async fn get(&self, job_id: Uuid) -> Option<StagedResult>;

    /// Remove an entry; returns whether it existed.
    async fn delete(&self, job_id: Uuid) -> bool;

    async fn len(&self) -> usize;

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Janitor mechanics: stamp entries lacking `inserted_at` with now,
    /// remove entries stamped longer than `ttl` ago, then clear the whole
    /// store if more than `max_entries` remain.
    async fn sweep(&self, ttl: Duration, max_entries: usize) -> SweepStats;
}

/// Default [`JobStore`] backed by a concurrency-safe in-memory map.
#[derive(Default)]
pub struct InMemoryJobStore {
    entries: RwLock<HashMap<Uuid, StagedResult>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, result: StagedResult) {
        let mut entries = self.entries.write().await;
        entries.insert(result.job_id, result);
    }

    async fn get(&self, job_id: Uuid) -> Option<StagedResult> {
        let entries = self.entries.read().await;
        entries.get(&job_id).cloned()
    }

    async fn delete(&self, job_id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(&job_id).is_some()
    }

    async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    async fn sweep(&self, ttl: Duration, max_entries: usize) -> SweepStats {
        let mut stats = SweepStats::default();
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let cutoff = now - ttl;

        let mut entries = self.entries.write().await;

        // Grandfather pre-existing unstamped entries into the TTL scheme.
        for entry in entries.values_mut() {
            if entry.inserted_at.is_none() {
                entry.inserted_at = Some(now);
                stats.stamped += 1;
            }
        }

        entries.retain(|_, entry| match entry.inserted_at {
            Some(stamp) if stamp < cutoff => {
                stats.expired += 1;
                false
            }
            _ => true,
        });

        // Fail-safe bulk eviction: a hard memory bound that may drop
        // recent unconfirmed results.
        if entries.len() > max_entries {
            entries.clear();
            stats.cleared_all = true;
        }

        stats
    }
}
