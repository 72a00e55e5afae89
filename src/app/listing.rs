//! Directory listings kept for fast revisits.
//!
//! A cached listing is reused while its directory's modify time is unchanged. Creating, removing
//! or renaming a child bumps that time. Rewriting a file in place does not, so sizes and times
//! served from a cached listing can lag until the directory is reloaded.
//!
//! [ListingCache::prewarm] fills the cache with the parents of a directory on a background
//! thread, so going up is served without touching the disk.

use crate::core::{Cache, CacheBuilder, CancelToken, Entry, FileSystem, browse_dir, walk_up};

use tracing::{debug, trace};

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

#[derive(Debug, Clone)]
struct Listing {
    entries: Arc<[Entry]>,
    modified: SystemTime,
    read_at: Instant,
}

#[derive(Clone)]
pub struct ListingCache {
    cache: Cache<PathBuf, Listing>,
}

impl ListingCache {
    /// A `size` of zero keeps every listing.
    pub fn new(
        size: usize,
        prune_interval: Duration,
        cancel: &CancelToken,
    ) -> crate::core::Result<Self> {
        let cache = CacheBuilder::new(size, prune_interval)
            .rank_by_value(|a: &Listing, b: &Listing| a.read_at.cmp(&b.read_at))
            .build(cancel)?;
        Ok(Self { cache })
    }

    /// Unsorted entries of `dir`, from the cache while `dir` is unchanged.
    pub fn read(&self, fs: &dyn FileSystem, dir: &Path) -> io::Result<Vec<Entry>> {
        let modified = fs.stat(dir)?.modified;
        let key = dir.to_path_buf();

        if let Some(modified) = modified
            && let Some(mut hit) = self.cache.get(&key)
            && hit.modified == modified
        {
            trace!(dir = %dir.display(), "listing cache hit");
            hit.read_at = Instant::now();
            let entries = hit.entries.to_vec();
            self.cache.set(key, hit);
            return Ok(entries);
        }

        self.read_and_store(fs, dir, modified)
    }

    /// Lists `dir` from disk, bypassing the cache, and stores the fresh listing.
    pub fn refresh(&self, fs: &dyn FileSystem, dir: &Path) -> io::Result<Vec<Entry>> {
        let modified = fs.stat(dir)?.modified;
        self.read_and_store(fs, dir, modified)
    }

    pub fn invalidate(&self, dir: &Path) {
        self.cache.delete(&dir.to_path_buf());
    }

    /// Number of cached listings.
    pub fn len(&self) -> usize {
        self.cache.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists the parents of `dir`, up to `depth` levels, on a background thread and caches them.
    ///
    /// Nothing is stored once `cancel` is triggered. `dir` itself is not listed.
    pub fn prewarm(
        &self,
        fs: Arc<dyn FileSystem>,
        cancel: &CancelToken,
        dir: &Path,
        depth: usize,
        concurrency: usize,
    ) -> io::Result<JoinHandle<()>> {
        let cache = self.clone();
        let cancel = cancel.clone();
        let dir = dir.to_path_buf();
        thread::Builder::new()
            .name("rove-prewarm".to_string())
            .spawn(move || cache.warm(fs, &cancel, &dir, depth, concurrency))
    }

    fn warm(
        &self,
        fs: Arc<dyn FileSystem>,
        cancel: &CancelToken,
        dir: &Path,
        depth: usize,
        concurrency: usize,
    ) {
        let Some(parent) = dir.parent() else {
            return;
        };
        if depth == 0 {
            return;
        }
        let steps = depth - 1;

        // Modify times are taken before listing, so a change during the walk only makes the
        // stored listing stale, never wrongly fresh.
        let mut listed: HashMap<PathBuf, (SystemTime, Vec<Entry>)> = parent
            .ancestors()
            .take(depth)
            .filter_map(|d| {
                let modified = fs.stat(d).ok()?.modified?;
                Some((d.to_path_buf(), (modified, Vec::new())))
            })
            .collect();

        let walk = walk_up(cancel, Arc::clone(&fs), parent, Some(steps), concurrency, true);
        let (found, errors) = walk.collect();
        if cancel.is_cancelled() {
            trace!(dir = %dir.display(), "prewarm cancelled");
            return;
        }

        for item in found {
            if let Some((_, entries)) = listed.get_mut(&item.dir) {
                entries.push(item.entry);
            }
        }
        if !errors.is_empty() {
            // A failed listing looks like an empty one.
            listed.retain(|_, (_, entries)| !entries.is_empty());
        }

        let count = listed.len();
        for (d, (modified, entries)) in listed {
            self.store(d, modified, entries.into());
        }
        debug!(dir = %dir.display(), dirs = count, "prewarmed parent listings");
    }

    fn read_and_store(
        &self,
        fs: &dyn FileSystem,
        dir: &Path,
        modified: Option<SystemTime>,
    ) -> io::Result<Vec<Entry>> {
        let entries = browse_dir(fs, dir)?;
        match modified {
            Some(modified) => self.store(dir.to_path_buf(), modified, entries.clone().into()),
            None => self.invalidate(dir),
        }
        Ok(entries)
    }

    fn store(&self, dir: PathBuf, modified: SystemTime, entries: Arc<[Entry]>) {
        self.cache.set(
            dir,
            Listing {
                entries,
                modified,
                read_at: Instant::now(),
            },
        );
    }
}
