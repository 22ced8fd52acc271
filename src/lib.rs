//! # Memparams
//!
//! Memoization for deterministic functions and methods, with invalidation
//! driven by the parameters those computations read.
//!
//! ## Features
//!
//! - **Explicit caches**: a memoized function is a [`FunctionCache`] value, a
//!   memoized method a [`MethodCache`] value; no macros involved
//! - **Per-instance storage**: every instance carries its own
//!   [`InstanceCache`], shared by all of its memoized methods
//! - **Tracked parameters**: [`ParameterSlot`] values clear the instance's
//!   cache on every write, delete or in-place edit
//! - **Friends**: clearing one instance can cascade to related instances,
//!   safely through cycles
//! - **Result-aware**: fallible computations only cache `Ok` values
//!
//! ## Quick Start
//!
//! ```rust
//! use memparams::{FunctionCache, Lazy};
//!
//! static FIBONACCI: Lazy<FunctionCache<(u32,), u64>> = Lazy::new(|| {
//!     FunctionCache::new("fibonacci", |&(n,): &(u32,)| {
//!         if n <= 1 {
//!             return n as u64;
//!         }
//!         FIBONACCI.call(&(n - 1,)) + FIBONACCI.call(&(n - 2,))
//!     })
//! });
//!
//! // First call computes the result
//! let result1 = FIBONACCI.call(&(10,));
//! // Second call returns the cached result
//! let result2 = FIBONACCI.call(&(10,));
//! assert_eq!(result1, result2);
//! ```
//!
//! ## Methods and Parameters
//!
//! ```rust
//! use memparams::{HasParameters, InstanceCache, Memoized, MethodCache, ParameterSlot, SlotStorage};
//!
//! #[derive(Default)]
//! struct Polynomial {
//!     cache: InstanceCache,
//!     params: SlotStorage,
//! }
//!
//! impl Memoized for Polynomial {
//!     fn instance_cache(&self) -> &InstanceCache {
//!         &self.cache
//!     }
//! }
//!
//! impl HasParameters for Polynomial {
//!     fn parameter_storage(&self) -> &SlotStorage {
//!         &self.params
//!     }
//! }
//!
//! const COEFFICIENTS: ParameterSlot<Vec<f64>> = ParameterSlot::new("coefficients");
//!
//! static EVAL: MethodCache<Polynomial, (f64,), f64> = MethodCache::new("eval", |p, &(x,)| {
//!     let coefficients = COEFFICIENTS.get(p).unwrap_or_default();
//!     coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
//! });
//!
//! let p = Polynomial::default();
//! COEFFICIENTS.write(&p, vec![1.0, 2.0]);
//! assert_eq!(EVAL.bind(&p).call(&(3.0,)), 7.0);
//!
//! // In-place edits invalidate too
//! COEFFICIENTS.read(&p).unwrap().push(1.0);
//! assert_eq!(EVAL.bind(&p).call(&(3.0,)), 16.0);
//! ```
//!
//! ## Custom Key Types
//!
//! Argument types take part in keys through [`CacheableKey`]. The default
//! implementation uses `Debug`:
//!
//! ```rust
//! use memparams::CacheableKey;
//!
//! #[derive(Debug, Clone)]
//! struct Product {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl CacheableKey for Product {}
//! ```
//!
//! Or a custom, cheaper key:
//!
//! ```rust
//! use memparams::{CacheableKey, Result};
//!
//! #[derive(Debug, Clone)]
//! struct UserId {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl CacheableKey for UserId {
//!     fn to_cache_key(&self) -> Result<String> {
//!         Ok(format!("user:{}", self.id))
//!     }
//! }
//! ```
//!
//! ## Friends
//!
//! The functions at the crate root operate on the friend graph the host
//! instance belongs to: the process-wide [`FriendGraph::global`] for caches
//! built with [`InstanceCache::new`], or the graph passed to
//! [`InstanceCache::with_graph`]. [`prune_friends`] only tidies the global
//! graph.
//!
//! ## Logging
//!
//! Cache activity is reported through `tracing`: hits, misses and uncached
//! calls at `trace` level, clears and parameter changes at `debug` level. The
//! library never installs a subscriber.

pub use memparams_core::*;
pub use once_cell::sync::Lazy;

/// Registers `friend` as a friend of `host` in `host`'s friend graph.
///
/// From then on, invalidating `host` also clears `friend`'s cache.
///
/// # Examples
///
/// ```rust
/// use memparams::{clear_cascading, register_friend, unregister_friend, InstanceCache};
///
/// let host = InstanceCache::new();
/// let friend = InstanceCache::new();
///
/// register_friend(&host, &friend);
/// assert_eq!(clear_cascading(&host), 2);
///
/// unregister_friend(&host, &friend).unwrap();
/// assert_eq!(clear_cascading(&host), 1);
/// ```
pub fn register_friend(host: &dyn Memoized, friend: &dyn Memoized) {
    host.add_friend(friend);
}

/// Removes an edge added with [`register_friend`].
///
/// # Errors
///
/// Returns [`Error::NotFound`] if `friend` is not registered for `host`.
pub fn unregister_friend(host: &dyn Memoized, friend: &dyn Memoized) -> Result<()> {
    host.remove_friend(friend)
}

/// Clears `instance` and every friend reachable from it in its friend graph.
/// Returns the number of caches cleared.
pub fn clear_cascading(instance: &dyn Memoized) -> usize {
    let cleared = instance.invalidate();
    tracing::debug!(instance = %instance.instance_cache().id(), cleared, "global cascading clear");
    cleared
}

/// Drops global friend edges whose endpoints no longer exist.
pub fn prune_friends() -> usize {
    FriendGraph::global().prune()
}
