/// Which entry a bounded [`FunctionCache`](crate::FunctionCache) drops when it
/// is full.
///
/// * `FIFO` - the oldest insertion goes first; hits do not reorder entries.
/// * `LRU` - the least recently used entry goes first; every hit moves its key
///   to the back of the order queue. This is the default.
///
/// Instance caches are never bounded, so the policy only applies to function
/// caches configured with a [`CacheConfig`](crate::CacheConfig) limit.
///
/// # Examples
///
/// ```
/// use memparams_core::EvictionPolicy;
///
/// assert_eq!(EvictionPolicy::default(), EvictionPolicy::LRU);
///
/// let policy: EvictionPolicy = "fifo".into();
/// assert_eq!(policy, EvictionPolicy::FIFO);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionPolicy {
    FIFO,
    LRU,
}

impl EvictionPolicy {
    pub const fn default() -> Self {
        EvictionPolicy::LRU
    }

    /// Whether a hit changes the eviction order.
    pub(crate) const fn tracks_access(self) -> bool {
        matches!(self, EvictionPolicy::LRU)
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::default()
    }
}

/// Case-insensitive; anything other than `"fifo"` yields `LRU`.
impl From<&str> for EvictionPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fifo" => EvictionPolicy::FIFO,
            _ => EvictionPolicy::LRU,
        }
    }
}
