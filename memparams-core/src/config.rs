use crate::EvictionPolicy;

/// Sizing options for a [`FunctionCache`](crate::FunctionCache).
///
/// The default is unbounded, which is what plain memoization expects: every
/// key is computed at most once between clears. With a `limit`, the cache
/// evicts according to `policy` once it holds that many entries, and an evicted
/// key is recomputed on its next call.
///
/// # Examples
///
/// ```
/// use memparams_core::{CacheConfig, EvictionPolicy};
///
/// let config = CacheConfig::new().limit(128).policy(EvictionPolicy::FIFO);
/// assert_eq!(config.limit, Some(128));
/// assert_eq!(config.policy, EvictionPolicy::FIFO);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries, `None` for unbounded
    pub limit: Option<usize>,
    /// Eviction order used when `limit` is reached
    pub policy: EvictionPolicy,
}

impl CacheConfig {
    pub const fn new() -> Self {
        Self {
            limit: None,
            policy: EvictionPolicy::default(),
        }
    }

    /// Bounds the cache to `limit` entries. A limit of zero disables storage.
    pub const fn limit(self, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..self
        }
    }

    pub const fn policy(self, policy: EvictionPolicy) -> Self {
        Self { policy, ..self }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
