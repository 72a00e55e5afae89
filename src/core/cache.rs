//! Bounded key/value cache that prunes itself on a timer.
//!
//! The cache may grow past its target size between prune cycles. Every `prune_interval` a
//! background thread ranks all entries with the single ordering function supplied at build time
//! and deletes the lowest ranked ones until the target size is reached again.
//!
//! The map and the prune share one mutex, so a prune never interleaves with `set`/`get`.
//! Entry counts are small (rendered previews) and intervals are in seconds, so holding the lock
//! for a sort is fine.

use crate::core::cancel::CancelToken;
use crate::core::error::{Error, Result};

use crossbeam_channel::tick;
use tracing::{debug, trace};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

const MIN_PRUNE_INTERVAL: Duration = Duration::from_millis(1);

type Compare<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Which half of an entry the ordering looks at. Entries that compare `Less` are evicted first.
enum Ranking<K, V> {
    ByKey(Compare<K>),
    ByValue(Compare<V>),
}

struct Inner<K, V> {
    map: Mutex<HashMap<K, V>>,
    ranking: Ranking<K, V>,
    target_size: usize,
}

/// Builder for [Cache]. Exactly one of [CacheBuilder::rank_by_key] and
/// [CacheBuilder::rank_by_value] must be called before [CacheBuilder::build].
pub struct CacheBuilder<K, V> {
    target_size: usize,
    prune_interval: Duration,
    by_key: Option<Compare<K>>,
    by_value: Option<Compare<V>>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// A `target_size` of zero disables pruning entirely.
    pub fn new(target_size: usize, prune_interval: Duration) -> Self {
        Self {
            target_size,
            prune_interval,
            by_key: None,
            by_value: None,
        }
    }

    pub fn rank_by_key<F>(mut self, cmp: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        self.by_key = Some(Box::new(cmp));
        self
    }

    pub fn rank_by_value<F>(mut self, cmp: F) -> Self
    where
        F: Fn(&V, &V) -> Ordering + Send + Sync + 'static,
    {
        self.by_value = Some(Box::new(cmp));
        self
    }

    /// Builds the cache and, when the target size is non-zero, starts the prune thread.
    ///
    /// The thread exits once `cancel` is triggered or the cache is dropped.
    ///
    /// # Errors
    /// [Error::AmbiguousOrdering] unless exactly one ordering function was given.
    pub fn build(self, cancel: &CancelToken) -> Result<Cache<K, V>> {
        let ranking = match (self.by_key, self.by_value) {
            (Some(cmp), None) => Ranking::ByKey(cmp),
            (None, Some(cmp)) => Ranking::ByValue(cmp),
            _ => return Err(Error::AmbiguousOrdering),
        };

        let inner = Arc::new(Inner {
            map: Mutex::new(HashMap::new()),
            ranking,
            target_size: self.target_size,
        });

        if self.target_size > 0 {
            spawn_pruner(
                Arc::downgrade(&inner),
                cancel.clone(),
                self.prune_interval.max(MIN_PRUNE_INTERVAL),
            );
        }

        Ok(Cache { inner })
    }
}

/// The cache handle. Cloning shares the same storage.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn set(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn delete(&self, key: &K) {
        self.inner.lock().remove(key);
    }

    pub fn size(&self) -> usize {
        self.inner.lock().len()
    }

    /// Runs one prune cycle now. Returns the number of evicted entries.
    pub fn prune(&self) -> usize {
        self.inner.prune()
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(&self) -> usize {
        if self.target_size == 0 {
            return 0;
        }
        let mut map = self.lock();
        let excess = map.len().saturating_sub(self.target_size);
        if excess == 0 {
            return 0;
        }

        let mut ranked: Vec<(&K, &V)> = map.iter().collect();
        match &self.ranking {
            Ranking::ByKey(cmp) => ranked.sort_by(|a, b| cmp(a.0, b.0)),
            Ranking::ByValue(cmp) => ranked.sort_by(|a, b| cmp(a.1, b.1)),
        }
        let evict: Vec<K> = ranked
            .into_iter()
            .take(excess)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &evict {
            map.remove(key);
        }
        debug!(evicted = evict.len(), remaining = map.len(), "cache pruned");
        evict.len()
    }
}

fn spawn_pruner<K, V>(inner: Weak<Inner<K, V>>, cancel: CancelToken, interval: Duration)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    thread::spawn(move || {
        let ticker = tick(interval);
        while ticker.recv().is_ok() {
            if cancel.is_cancelled() {
                break;
            }
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.prune();
        }
        trace!("cache pruner stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    fn by_value_cache(target: usize, interval: Duration) -> Result<Cache<String, u64>> {
        CacheBuilder::new(target, interval)
            .rank_by_value(|a: &u64, b: &u64| a.cmp(b))
            .build(&CancelToken::new())
    }

    #[test]
    fn construction_requires_exactly_one_ordering() {
        let cancel = CancelToken::new();

        let neither = CacheBuilder::<String, u64>::new(4, Duration::from_secs(1)).build(&cancel);
        assert!(matches!(neither, Err(Error::AmbiguousOrdering)));

        let both = CacheBuilder::<String, u64>::new(4, Duration::from_secs(1))
            .rank_by_key(|a, b| a.cmp(b))
            .rank_by_value(|a, b| a.cmp(b))
            .build(&cancel);
        assert!(matches!(both, Err(Error::AmbiguousOrdering)));

        let by_key = CacheBuilder::<String, u64>::new(4, Duration::from_secs(1))
            .rank_by_key(|a, b| a.cmp(b))
            .build(&cancel);
        assert!(by_key.is_ok());
        cancel.cancel();
    }

    #[test]
    fn set_get_delete() -> Result<()> {
        let cache = by_value_cache(0, Duration::from_secs(60))?;
        cache.set("a".into(), 1);
        cache.set("b".into(), 2);
        cache.set("a".into(), 3);

        assert_eq!(cache.size(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(3));
        cache.delete(&"a".to_string());
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.size(), 1);
        Ok(())
    }

    #[test]
    fn prune_keeps_top_ranked_entries() -> Result<()> {
        let cache = by_value_cache(3, Duration::from_secs(3600))?;
        for (i, name) in ["e", "a", "d", "b", "c", "f"].iter().enumerate() {
            cache.set(name.to_string(), i as u64);
        }
        assert_eq!(cache.size(), 6);

        assert_eq!(cache.prune(), 3);
        assert_eq!(cache.size(), 3);
        for kept in ["b", "c", "f"] {
            assert!(cache.get(&kept.to_string()).is_some(), "{kept} evicted");
        }
        for evicted in ["e", "a", "d"] {
            assert!(cache.get(&evicted.to_string()).is_none(), "{evicted} kept");
        }

        assert_eq!(cache.prune(), 0);
        Ok(())
    }

    #[test]
    fn prune_by_key() -> Result<()> {
        let cache: Cache<u32, ()> = CacheBuilder::new(2, Duration::from_secs(3600))
            .rank_by_key(|a: &u32, b: &u32| a.cmp(b))
            .build(&CancelToken::new())?;
        for k in [5, 1, 9, 3] {
            cache.set(k, ());
        }
        cache.prune();
        assert_eq!(cache.get(&5), Some(()));
        assert_eq!(cache.get(&9), Some(()));
        assert_eq!(cache.size(), 2);
        Ok(())
    }

    #[test]
    fn zero_target_never_prunes() -> Result<()> {
        let cache = by_value_cache(0, Duration::from_millis(1))?;
        for i in 0..100 {
            cache.set(format!("k{i}"), i);
        }
        assert_eq!(cache.prune(), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.size(), 100);
        Ok(())
    }

    #[test]
    fn background_prune_restores_target() -> Result<()> {
        let cache = by_value_cache(5, Duration::from_millis(10))?;
        for i in 0..50 {
            cache.set(format!("k{i}"), i);
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        while cache.size() > 5 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(cache.size(), 5);
        for i in 45..50 {
            assert_eq!(cache.get(&format!("k{i}")), Some(i));
        }
        Ok(())
    }

    #[test]
    fn cancelled_pruner_stops() -> Result<()> {
        let cancel = CancelToken::new();
        let cache: Cache<u32, u32> = CacheBuilder::new(1, Duration::from_millis(5))
            .rank_by_value(|a: &u32, b: &u32| a.cmp(b))
            .build(&cancel)?;
        cancel.cancel();
        // give the pruner time to observe the token
        std::thread::sleep(Duration::from_millis(30));

        for i in 0..10 {
            cache.set(i, i);
        }
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.size(), 10);
        Ok(())
    }
}
