//! Batched LRU eviction with hysteresis
//!
//! A pass fires only once total occupancy reaches the ceiling, then trims
//! oldest-access-first down to `ceiling * low_watermark`. Trimming below the
//! ceiling amortizes directory deletes across many subsequent puts instead of
//! re-evicting on every single overflow.

use crate::metrics::Metrics;
use crate::store::BlobStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Enforces the byte-size ceiling over the blob store
pub struct EvictionManager {
    store: Arc<BlobStore>,
    metrics: Arc<Metrics>,
    ceiling: u64,
    low_watermark: f64,
    /// Exclusion flag for the single in-flight pass. Non-blocking on
    /// purpose: a caller finding it held skips, since the running pass will
    /// already shrink the store.
    running: AtomicBool,
}

impl EvictionManager {
    pub fn new(
        store: Arc<BlobStore>,
        metrics: Arc<Metrics>,
        ceiling: u64,
        low_watermark: f64,
    ) -> Self {
        Self {
            store,
            metrics,
            ceiling,
            low_watermark,
            running: AtomicBool::new(false),
        }
    }

    /// Run an eviction pass unless one is already in flight.
    ///
    /// Called after every successful put and by the explicit CLN command.
    pub async fn trigger(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("eviction pass already running, skipping");
            return;
        }

        // The guard clears the flag even if the pass unwinds; a permanently
        // set flag would disable eviction for the life of the process.
        let _guard = PassGuard(&self.running);
        self.run_pass().await;
    }

    async fn run_pass(&self) {
        let snapshot = self.store.snapshot();
        let mut total: u64 = snapshot.iter().map(|e| e.total_size).sum();

        if total < self.ceiling {
            return;
        }

        let target = (self.ceiling as f64 * self.low_watermark) as u64;
        info!(total, ceiling = self.ceiling, target, "Trimming the cache");

        let mut candidates = snapshot;
        candidates.sort_by_key(|e| e.last_access);

        let mut evicted_entries = 0u64;
        let mut evicted_bytes = 0u64;
        for entry in candidates {
            if total <= target {
                break;
            }
            // Best-effort: a candidate that already vanished just moves the
            // pass along to the next one, and only directories actually
            // deleted count toward the eviction totals.
            match self.store.remove_entry(&entry.signature).await {
                Ok(true) => {
                    evicted_entries += 1;
                    evicted_bytes += entry.total_size;
                }
                Ok(false) => {
                    debug!(signature = %entry.signature, "eviction candidate already gone");
                }
                Err(e) => {
                    debug!(signature = %entry.signature, error = %e, "eviction skipped entry");
                }
            }
            self.store.forget(&entry.signature);
            total = total.saturating_sub(entry.total_size);
        }

        self.metrics.evicted_entries.inc_by(evicted_entries);
        self.metrics.evicted_bytes.inc_by(evicted_bytes);
        info!(evicted_entries, evicted_bytes, total, "Eviction pass done");
    }
}

/// Clears the in-flight flag when dropped, including on unwind.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
