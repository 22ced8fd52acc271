//! # Memparams Core
//!
//! Core building blocks of the memparams library: memoized functions and
//! methods whose cached results are discarded when the parameters they depend
//! on change.
//!
//! ## Features
//!
//! - **Canonical keys**: positional order matters, keyword order does not, and
//!   mutable containers are refused as key material
//! - **Function caches**: one cache per free function, with optional size
//!   limits and FIFO/LRU eviction
//! - **Method caches**: one cache per instance, shared by all its memoized
//!   methods; unbound calls bypass it
//! - **Parameter slots**: writes, deletes and in-place edits of a tracked value
//!   clear the owning instance's cache
//! - **Friend graph**: cycle-safe propagation of cache clears across instances
//! - **Statistics**: hit, miss and clear counters (feature `stats`)
//!
//! ## Module Organization
//!
//! - [`CacheableKey`] / [`KeyBuilder`] / [`Args`] - Key fragments, key construction and argument bundles
//! - [`FunctionCache`] - Memoization of free functions
//! - [`MethodCache`] / [`InstanceCache`] - Memoization of methods
//! - [`ParameterSlot`] / [`MutationProxy`] - Tracked parameters
//! - [`FriendGraph`] - Cascading invalidation
//! - [`utils`] - Order-queue helpers used by the eviction policies
//!
mod config;
mod error;
mod eviction_policy;
mod friends;
mod function_cache;
mod instance_cache;
mod keys;
mod method_cache;
mod parameter;
mod proxy;

pub mod utils;

#[cfg(feature = "stats")]
mod stats;

pub use config::CacheConfig;
pub use error::{Error, Result};
pub use eviction_policy::EvictionPolicy;
pub use friends::FriendGraph;
pub use function_cache::FunctionCache;
pub use instance_cache::{InstanceCache, InstanceId, Invalidator, Memoized};
pub use keys::{Args, CacheKey, CacheableKey, KeyBuilder, Kwargs, WithKwargs};
pub use method_cache::{BoundMethod, MethodCache};
pub use parameter::{HasParameters, ParameterSlot, SlotStorage};
pub use proxy::MutationProxy;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
