//! # Friend graph
//!
//! Directed "clear mine, clear theirs too" edges between instance caches.
//!
//! Registering `host → friend` means that whenever `host` is invalidated, the
//! friend's cache is cleared as well, and so on transitively along the
//! friend's own edges. Edges are one-way: the friend does not propagate back to
//! the host unless that edge is registered separately.
//!
//! Propagation walks the graph iteratively with a visited set, so cycles
//! (`A → B → A`) terminate and every reachable instance is cleared exactly
//! once, no matter how many paths lead to it.
//!
//! The graph stores weak handles only. It never keeps an instance alive, but it
//! also does not notice when one is dropped: unregister edges before disposing
//! of an instance, or call [`FriendGraph::prune`] now and then.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use memparams_core::{FriendGraph, InstanceCache};
//!
//! let graph = Arc::new(FriendGraph::new());
//! let a = InstanceCache::with_graph(Arc::clone(&graph));
//! let b = InstanceCache::with_graph(Arc::clone(&graph));
//!
//! graph.register(&a, &b);
//! graph.register(&b, &a);
//!
//! // Terminates, and clears each cache once
//! assert_eq!(graph.clear_cascading(&a), 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::instance_cache::CacheCell;
use crate::{InstanceCache, InstanceId};

static GLOBAL_GRAPH: Lazy<Arc<FriendGraph>> = Lazy::new(|| Arc::new(FriendGraph::new()));

/// Outgoing edges of one host
struct Node {
    host: Weak<CacheCell>,
    friends: HashMap<InstanceId, Weak<CacheCell>>,
}

/// Registry of friend edges between instance caches.
pub struct FriendGraph {
    nodes: RwLock<HashMap<InstanceId, Node>>,
}

impl FriendGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide graph used by [`InstanceCache::new`].
    pub fn global() -> &'static Arc<FriendGraph> {
        &GLOBAL_GRAPH
    }

    /// Adds the edge `host → friend`. Registering an instance as its own
    /// friend, or registering an existing edge again, changes nothing.
    pub fn register(&self, host: &InstanceCache, friend: &InstanceCache) {
        if host.id() == friend.id() {
            return;
        }
        let mut nodes = self.nodes.write();
        let node = nodes.entry(host.id()).or_insert_with(|| Node {
            host: Arc::downgrade(host.cell()),
            friends: HashMap::new(),
        });
        node.friends
            .insert(friend.id(), Arc::downgrade(friend.cell()));
        tracing::debug!(host = %host.id(), friend = %friend.id(), "friend registered");
    }

    /// Removes the edge `host → friend`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the edge was never registered.
    pub fn unregister(&self, host: &InstanceCache, friend: &InstanceCache) -> Result<()> {
        let mut nodes = self.nodes.write();
        let removed = match nodes.get_mut(&host.id()) {
            Some(node) => {
                let removed = node.friends.remove(&friend.id()).is_some();
                if node.friends.is_empty() {
                    nodes.remove(&host.id());
                }
                removed
            }
            None => false,
        };

        if removed {
            tracing::debug!(host = %host.id(), friend = %friend.id(), "friend unregistered");
            Ok(())
        } else {
            Err(Error::NotFound {
                host: host.id(),
                friend: friend.id(),
            })
        }
    }

    pub fn is_registered(&self, host: &InstanceCache, friend: &InstanceCache) -> bool {
        self.nodes
            .read()
            .get(&host.id())
            .map(|node| node.friends.contains_key(&friend.id()))
            .unwrap_or(false)
    }

    /// Direct friends of `host`, sorted by id.
    pub fn friends_of(&self, host: &InstanceCache) -> Vec<InstanceId> {
        let mut friends: Vec<_> = self
            .nodes
            .read()
            .get(&host.id())
            .map(|node| node.friends.keys().copied().collect())
            .unwrap_or_default();
        friends.sort();
        friends
    }

    /// Clears `instance` and every friend reachable from it, each at most once.
    ///
    /// Returns the number of caches cleared. Friends that have been dropped are
    /// skipped, but edges registered on their behalf are still followed.
    pub fn clear_cascading(&self, instance: &InstanceCache) -> usize {
        self.cascade_from(instance.cell())
    }

    pub(crate) fn cascade_from(&self, start: &Arc<CacheCell>) -> usize {
        // Collect under the read lock, clear after releasing it.
        let targets = self.reachable_from(start);
        for cell in &targets {
            cell.clear();
        }
        if targets.len() > 1 {
            tracing::debug!(
                instance = %start.id,
                cleared = targets.len(),
                "cascading clear"
            );
        }
        targets.len()
    }

    fn reachable_from(&self, start: &Arc<CacheCell>) -> Vec<Arc<CacheCell>> {
        let nodes = self.nodes.read();
        let mut visited = HashSet::new();
        visited.insert(start.id);
        let mut pending = vec![start.id];
        let mut reached = vec![Arc::clone(start)];

        while let Some(id) = pending.pop() {
            let Some(node) = nodes.get(&id) else {
                continue;
            };
            for (friend_id, handle) in &node.friends {
                if !visited.insert(*friend_id) {
                    continue;
                }
                if let Some(cell) = handle.upgrade() {
                    reached.push(cell);
                }
                pending.push(*friend_id);
            }
        }
        reached
    }

    /// Drops edges whose host or friend no longer exists. Returns the number of
    /// edges removed.
    pub fn prune(&self) -> usize {
        let mut nodes = self.nodes.write();
        let mut removed = 0;
        nodes.retain(|_, node| {
            if node.host.strong_count() == 0 {
                removed += node.friends.len();
                return false;
            }
            let before = node.friends.len();
            node.friends.retain(|_, friend| friend.strong_count() > 0);
            removed += before - node.friends.len();
            !node.friends.is_empty()
        });
        if removed > 0 {
            tracing::debug!(removed, "pruned dead friend edges");
        }
        removed
    }

    /// Number of registered edges.
    pub fn len(&self) -> usize {
        self.nodes.read().values().map(|node| node.friends.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Drops every edge.
    pub fn clear(&self) {
        self.nodes.write().clear();
    }
}

impl Default for FriendGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FriendGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FriendGraph")
            .field("edges", &self.len())
            .finish()
    }
}
