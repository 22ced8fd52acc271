use thiserror::Error;

use crate::InstanceId;

/// Errors produced by key construction, parameter slots and the friend graph.
///
/// `Unhashable` never reaches the caller of a memoized function or method:
/// [`FunctionCache`](crate::FunctionCache) and [`MethodCache`](crate::MethodCache)
/// catch it and run the computation without caching. The other variants are
/// returned to the caller as ordinary errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An argument cannot be turned into a cache key fragment
    #[error("argument `{argument}` is not hashable")]
    Unhashable { argument: String },

    /// A parameter slot was read or deleted before it was assigned
    #[error("parameter `{slot}` is not set")]
    NotSet { slot: &'static str },

    /// A friend edge that was never registered was unregistered
    #[error("{friend} is not registered as a friend of {host}")]
    NotFound { host: InstanceId, friend: InstanceId },
}

impl Error {
    pub(crate) fn unhashable(argument: impl Into<String>) -> Self {
        Error::Unhashable {
            argument: argument.into(),
        }
    }

    /// Returns `true` for the error that makes a call fall back to uncached execution.
    pub fn is_unhashable(&self) -> bool {
        matches!(self, Error::Unhashable { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
