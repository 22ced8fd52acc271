use std::collections::{HashMap, VecDeque};
use std::fmt;

use parking_lot::{Mutex, RwLock};

use crate::utils::{drain_over_limit, move_key_to_end, touch_inserted};
use crate::{Args, CacheConfig, CacheKey};

#[cfg(feature = "stats")]
use crate::CacheStats;

fn always<R>(_: &R) -> bool {
    true
}

/// Memoizing wrapper around one free function.
///
/// The cache is owned by the wrapper: one `FunctionCache` per function. Each
/// call builds a [`CacheKey`] from the function name and the argument bundle;
/// a hit returns a clone of the stored value (with `Arc` results, the very
/// same allocation), a miss runs the function and stores its result.
///
/// Arguments that cannot be hashed (see [`CacheableKey`](crate::CacheableKey))
/// make that one call run uncached. No lock is held while the wrapped function
/// runs, so a memoized function may call itself recursively, and a panic in the
/// function leaves nothing behind in the cache.
///
/// # Examples
///
/// ```
/// use memparams_core::FunctionCache;
/// use once_cell::sync::Lazy;
///
/// static FIB: Lazy<FunctionCache<(u64,), u64>> = Lazy::new(|| {
///     FunctionCache::new("fib", |&(n,): &(u64,)| {
///         if n < 2 { n } else { FIB.call(&(n - 1,)) + FIB.call(&(n - 2,)) }
///     })
/// });
///
/// assert_eq!(FIB.call(&(80,)), 23_416_728_348_467_685);
/// assert_eq!(FIB.len(), 81);
/// ```
pub struct FunctionCache<A, R> {
    name: &'static str,
    func: Box<dyn Fn(&A) -> R + Send + Sync>,
    cache_if: fn(&R) -> bool,
    config: CacheConfig,
    map: RwLock<HashMap<CacheKey, R>>,
    order: Mutex<VecDeque<CacheKey>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<A: Args, R: Clone> FunctionCache<A, R> {
    /// Wraps `func`, identified in cache keys and logs by `name`.
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        Self {
            name,
            func: Box::new(func),
            cache_if: always::<R>,
            config: CacheConfig::new(),
            map: RwLock::new(HashMap::new()),
            order: Mutex::new(VecDeque::new()),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Only results for which `predicate` returns `true` are stored; the others
    /// are returned but recomputed on the next call.
    pub fn cache_if(mut self, predicate: fn(&R) -> bool) -> Self {
        self.cache_if = predicate;
        self
    }

    /// Calls the function through the cache.
    pub fn call(&self, args: &A) -> R {
        let key = match CacheKey::for_args(self.name, args) {
            Ok(key) => key,
            Err(err) => {
                tracing::trace!(function = self.name, %err, "calling uncached");
                return (self.func)(args);
            }
        };

        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = (self.func)(args);
        if (self.cache_if)(&value) {
            self.insert(key, value.clone());
        } else {
            tracing::trace!(function = self.name, "result rejected by cache_if");
        }
        value
    }

    /// Whether a result for `args` is currently stored.
    pub fn contains(&self, args: &A) -> bool {
        CacheKey::for_args(self.name, args)
            .map(|key| self.map.read().contains_key(&key))
            .unwrap_or(false)
    }

    /// Drops the stored result for `args`, if any.
    pub fn invalidate(&self, args: &A) -> bool {
        let Ok(key) = CacheKey::for_args(self.name, args) else {
            return false;
        };
        let mut map = self.map.write();
        let removed = map.remove(&key).is_some();
        if removed {
            let mut order = self.order.lock();
            if let Some(pos) = order.iter().position(|k| *k == key) {
                order.remove(pos);
            }
            tracing::debug!(function = self.name, %key, "entry invalidated");
        }
        removed
    }

    fn get(&self, key: &CacheKey) -> Option<R> {
        let value = self.map.read().get(key).cloned();

        #[cfg(feature = "stats")]
        {
            if value.is_some() {
                self.stats.record_hit();
            } else {
                self.stats.record_miss();
            }
        }

        if value.is_some() {
            tracing::trace!(function = self.name, %key, "cache hit");
            if self.config.limit.is_some() && self.config.policy.tracks_access() {
                move_key_to_end(&mut self.order.lock(), key);
            }
        } else {
            tracing::trace!(function = self.name, %key, "cache miss");
        }
        value
    }

    fn insert(&self, key: CacheKey, value: R) {
        let mut map = self.map.write();
        map.insert(key.clone(), value);

        let mut order = self.order.lock();
        touch_inserted(&mut order, key);
        if let Some(limit) = self.config.limit {
            for evicted in drain_over_limit(&mut order, limit) {
                map.remove(&evicted);
                tracing::trace!(function = self.name, key = %evicted, "entry evicted");
            }
        }
    }
}

impl<A, T, E> FunctionCache<A, Result<T, E>>
where
    A: Args,
    T: Clone,
    E: Clone,
{
    /// Wraps a fallible function: only `Ok` results are stored, so a failed
    /// computation is retried in full on the next call with the same key.
    pub fn fallible<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&A) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::new(name, func).cache_if(Result::is_ok)
    }
}

impl<A, R> FunctionCache<A, R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Empties the cache.
    pub fn clear(&self) {
        let mut map = self.map.write();
        map.clear();
        self.order.lock().clear();
        #[cfg(feature = "stats")]
        self.stats.record_clear();
        tracing::debug!(function = self.name, "function cache cleared");
    }

    /// Alias of [`FunctionCache::clear`].
    pub fn clear_cache(&self) {
        self.clear();
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<A, R> fmt::Debug for FunctionCache<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCache")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}
