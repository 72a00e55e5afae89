//! The `[performance]` table of rove.toml: cache, history and concurrency limits.

use crate::core::fileop::{DEFAULT_BATCH_WORKERS, MAX_BATCH_WORKERS};
use crate::core::walker::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::utils::clamp_setting;

use serde::Deserialize;

use std::time::Duration;

pub(crate) const DEFAULT_PREVIEW_CACHE_SIZE: usize = 64;
pub(crate) const DEFAULT_LISTING_CACHE_SIZE: usize = 32;
pub(crate) const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 5;
pub(crate) const DEFAULT_HISTORY_DEPTH: usize = 100;
pub(crate) const DEFAULT_PREWARM_DEPTH: usize = 2;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub(crate) struct Performance {
    preview_cache_size: usize,
    listing_cache_size: usize,
    preview_prune_interval_secs: u64,
    history_depth: usize,
    walker_concurrency: usize,
    batch_workers: usize,
    prewarm_depth: usize,
}

impl Default for Performance {
    fn default() -> Self {
        Performance {
            preview_cache_size: DEFAULT_PREVIEW_CACHE_SIZE,
            listing_cache_size: DEFAULT_LISTING_CACHE_SIZE,
            preview_prune_interval_secs: DEFAULT_PRUNE_INTERVAL_SECS,
            history_depth: DEFAULT_HISTORY_DEPTH,
            walker_concurrency: DEFAULT_CONCURRENCY,
            batch_workers: DEFAULT_BATCH_WORKERS,
            prewarm_depth: DEFAULT_PREWARM_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InternalPerformance {
    preview_cache_size: usize,
    listing_cache_size: usize,
    preview_prune_interval: Duration,
    history_depth: usize,
    walker_concurrency: usize,
    batch_workers: usize,
    prewarm_depth: usize,
}

impl From<Performance> for InternalPerformance {
    fn from(p: Performance) -> Self {
        Self {
            preview_cache_size: p.preview_cache_size,
            listing_cache_size: p.listing_cache_size,
            preview_prune_interval: Duration::from_secs(p.preview_prune_interval_secs.max(1)),
            history_depth: p.history_depth,
            walker_concurrency: clamp_setting(
                "walker_concurrency",
                p.walker_concurrency,
                MIN_CONCURRENCY,
                MAX_CONCURRENCY,
            ),
            batch_workers: clamp_setting("batch_workers", p.batch_workers, 1, MAX_BATCH_WORKERS),
            prewarm_depth: p.prewarm_depth,
        }
    }
}

impl InternalPerformance {
    /// Zero keeps every preview forever.
    #[inline]
    pub fn preview_cache_size(&self) -> usize {
        self.preview_cache_size
    }

    /// Directory listings kept for fast revisits. Zero keeps every listing.
    #[inline]
    pub fn listing_cache_size(&self) -> usize {
        self.listing_cache_size
    }

    #[inline]
    pub fn preview_prune_interval(&self) -> Duration {
        self.preview_prune_interval
    }

    /// Zero keeps unlimited history.
    #[inline]
    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    #[inline]
    pub fn walker_concurrency(&self) -> usize {
        self.walker_concurrency
    }

    #[inline]
    pub fn batch_workers(&self) -> usize {
        self.batch_workers
    }

    /// Zero disables pre-warming.
    #[inline]
    pub fn prewarm_depth(&self) -> usize {
        self.prewarm_depth
    }
}
