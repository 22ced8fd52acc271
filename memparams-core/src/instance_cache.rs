use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::Result;
use crate::{CacheKey, FriendGraph};

#[cfg(feature = "stats")]
use crate::CacheStats;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`InstanceCache`].
///
/// The friend graph tracks instances by this id, so instances do not need to
/// implement `Hash` or `Eq` themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

type Entries = HashMap<CacheKey, Box<dyn Any + Send + Sync>>;

/// Shared state behind an `InstanceCache`. The owning instance holds the only
/// strong reference; proxies and the friend graph hold weak ones.
pub(crate) struct CacheCell {
    pub(crate) id: InstanceId,
    entries: Mutex<Entries>,
    /// Bumped by every clear, under the entries lock.
    generation: AtomicU64,
    graph: Arc<FriendGraph>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl CacheCell {
    /// Empties the entries, returning how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        let dropped = {
            let mut entries = self.entries.lock();
            let dropped = entries.len();
            entries.clear();
            self.generation.fetch_add(1, Ordering::AcqRel);
            dropped
        };
        #[cfg(feature = "stats")]
        self.stats.record_clear();
        tracing::debug!(instance = %self.id, dropped, "instance cache cleared");
        dropped
    }
}

/// The method cache of one instance.
///
/// A type whose methods are memoized embeds one `InstanceCache` as an ordinary
/// field and exposes it through [`Memoized`]. Every [`MethodCache`](crate::MethodCache)
/// invoked on that instance stores its results here, keyed by method name and
/// arguments, so clearing it invalidates all of them at once.
///
/// The cache also remembers which [`FriendGraph`] the instance belongs to
/// (the process-wide one unless built with [`InstanceCache::with_graph`]);
/// [`InstanceCache::invalidate`] clears along that graph.
///
/// Cloning an `InstanceCache` yields a fresh, empty cache with a new identity
/// in the same graph: a cloned instance never shares results with its source.
pub struct InstanceCache {
    cell: Arc<CacheCell>,
}

impl InstanceCache {
    /// Creates an empty cache attached to [`FriendGraph::global`].
    pub fn new() -> Self {
        Self::with_graph(Arc::clone(FriendGraph::global()))
    }

    /// Creates an empty cache attached to `graph`.
    pub fn with_graph(graph: Arc<FriendGraph>) -> Self {
        Self {
            cell: Arc::new(CacheCell {
                id: InstanceId::next(),
                entries: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                graph,
                #[cfg(feature = "stats")]
                stats: CacheStats::new(),
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.cell.id
    }

    pub fn graph(&self) -> &Arc<FriendGraph> {
        &self.cell.graph
    }

    /// Clears this instance's cache only. Friends are left alone.
    pub fn clear(&self) {
        self.cell.clear();
    }

    /// Clears this instance's cache and, transitively, every registered
    /// friend's. Returns the number of caches cleared.
    pub fn invalidate(&self) -> usize {
        self.cell.graph.cascade_from(&self.cell)
    }

    /// A non-owning handle that invalidates this cache while it is alive.
    pub fn invalidator(&self) -> Invalidator {
        Invalidator {
            cell: Arc::downgrade(&self.cell),
        }
    }

    pub fn len(&self) -> usize {
        self.cell.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.entries.lock().is_empty()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.cell.stats
    }

    pub(crate) fn cell(&self) -> &Arc<CacheCell> {
        &self.cell
    }

    pub(crate) fn get<R: Clone + 'static>(&self, key: &CacheKey) -> Option<R> {
        let value = self
            .cell
            .entries
            .lock()
            .get(key)
            .and_then(|value| value.downcast_ref::<R>())
            .cloned();

        #[cfg(feature = "stats")]
        {
            if value.is_some() {
                self.cell.stats.record_hit();
            } else {
                self.cell.stats.record_miss();
            }
        }

        if value.is_some() {
            tracing::trace!(instance = %self.cell.id, %key, "cache hit");
        } else {
            tracing::trace!(instance = %self.cell.id, %key, "cache miss");
        }
        value
    }

    /// Number of clears this cache has seen. Read before computing a result
    /// and hand it to [`InstanceCache::insert_if_current`].
    pub(crate) fn generation(&self) -> u64 {
        self.cell.generation.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn insert<R: Send + Sync + 'static>(&self, key: CacheKey, value: R) {
        self.cell.entries.lock().insert(key, Box::new(value));
    }

    /// Stores `value` unless the cache was cleared since `generation` was
    /// read. Returns whether the value was stored.
    pub(crate) fn insert_if_current<R: Send + Sync + 'static>(
        &self,
        key: CacheKey,
        value: R,
        generation: u64,
    ) -> bool {
        let mut entries = self.cell.entries.lock();
        if self.cell.generation.load(Ordering::Acquire) != generation {
            tracing::trace!(instance = %self.cell.id, %key, "result outdated by a clear, not stored");
            return false;
        }
        entries.insert(key, Box::new(value));
        true
    }

    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        self.cell.entries.lock().contains_key(key)
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InstanceCache {
    fn clone(&self) -> Self {
        Self::with_graph(Arc::clone(&self.cell.graph))
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("id", &self.cell.id)
            .field("len", &self.len())
            .finish()
    }
}

/// Weak handle to an instance's cache.
///
/// Held by [`MutationProxy`](crate::MutationProxy) values so that a mutation
/// can clear its owner's cache without keeping the owner alive. Once the owner
/// is dropped, invalidating through the handle does nothing.
#[derive(Clone, Default)]
pub struct Invalidator {
    cell: Weak<CacheCell>,
}

impl Invalidator {
    /// A handle attached to nothing.
    pub fn detached() -> Self {
        Self { cell: Weak::new() }
    }

    /// Clears the owner's cache and its friends'. Returns how many caches were
    /// cleared, `0` if the owner is gone.
    pub fn invalidate(&self) -> usize {
        match self.cell.upgrade() {
            Some(cell) => cell.graph.cascade_from(&cell),
            None => 0,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.cell.strong_count() > 0
    }

    /// Identity of the owner, if it is still alive.
    pub fn owner_id(&self) -> Option<InstanceId> {
        self.cell.upgrade().map(|cell| cell.id)
    }
}

impl fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Invalidator").field(&self.owner_id()).finish()
    }
}

/// Implemented by types whose methods are memoized with [`MethodCache`](crate::MethodCache).
///
/// # Examples
///
/// ```
/// use memparams_core::{InstanceCache, Memoized};
///
/// struct Model {
///     cache: InstanceCache,
/// }
///
/// impl Memoized for Model {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// let a = Model { cache: InstanceCache::new() };
/// let b = Model { cache: InstanceCache::new() };
/// a.add_friend(&b);
/// assert_eq!(a.invalidate(), 2);
/// a.remove_friend(&b).unwrap();
/// ```
pub trait Memoized {
    fn instance_cache(&self) -> &InstanceCache;

    /// Clears this instance's cache only.
    fn clear_cache(&self) {
        self.instance_cache().clear();
    }

    /// Clears this instance's cache and cascades to its friends.
    fn invalidate(&self) -> usize {
        self.instance_cache().invalidate()
    }

    /// Registers `friend` in this instance's friend graph.
    fn add_friend(&self, friend: &dyn Memoized) {
        let host = self.instance_cache();
        host.graph().register(host, friend.instance_cache());
    }

    /// Removes a friend edge registered with [`Memoized::add_friend`].
    fn remove_friend(&self, friend: &dyn Memoized) -> Result<()> {
        let host = self.instance_cache();
        host.graph().unregister(host, friend.instance_cache())
    }
}

impl Memoized for InstanceCache {
    fn instance_cache(&self) -> &InstanceCache {
        self
    }
}
