use std::fmt;

use crate::{Args, CacheKey, Memoized};

fn always<R>(_: &R) -> bool {
    true
}

/// Memoization of one method across all instances of a type.
///
/// A `MethodCache` holds no results itself. Results live in the receiver's
/// [`InstanceCache`](crate::InstanceCache), keyed by the method `name` and the
/// arguments; the receiver is never part of the key. All memoized methods of an
/// instance share that one cache, so names must be unique within a type.
///
/// The bound form, [`MethodCache::bind`], goes through the cache. The unbound
/// form, [`MethodCache::call_unbound`], always runs the method and never reads
/// or writes any cache.
///
/// # Examples
///
/// ```
/// use memparams_core::{InstanceCache, Memoized, MethodCache};
///
/// struct Circle {
///     radius: f64,
///     cache: InstanceCache,
/// }
///
/// impl Memoized for Circle {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// static AREA: MethodCache<Circle, (), f64> =
///     MethodCache::new("area", |c, _| std::f64::consts::PI * c.radius * c.radius);
///
/// let c = Circle { radius: 2.0, cache: InstanceCache::new() };
/// let area = AREA.bind(&c).call(&());
/// assert!(AREA.is_cached(&c, &()));
/// assert_eq!(AREA.call_unbound(&c, &()), area);
/// ```
pub struct MethodCache<S, A, R> {
    name: &'static str,
    method: fn(&S, &A) -> R,
    cache_if: fn(&R) -> bool,
}

impl<S, A, R> MethodCache<S, A, R> {
    pub const fn new(name: &'static str, method: fn(&S, &A) -> R) -> Self {
        Self {
            name,
            method,
            cache_if: always::<R>,
        }
    }

    /// Only results for which `predicate` returns `true` are stored.
    pub const fn cache_if(self, predicate: fn(&R) -> bool) -> Self {
        Self {
            name: self.name,
            method: self.method,
            cache_if: predicate,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the method without touching any cache.
    pub fn call_unbound(&self, receiver: &S, args: &A) -> R {
        (self.method)(receiver, args)
    }
}

impl<S, A, T, E> MethodCache<S, A, Result<T, E>> {
    /// Memoizes a fallible method: only `Ok` results are stored.
    pub const fn fallible(name: &'static str, method: fn(&S, &A) -> Result<T, E>) -> Self {
        Self {
            name,
            method,
            cache_if: Result::is_ok,
        }
    }
}

impl<S, A, R> MethodCache<S, A, R>
where
    S: Memoized,
    A: Args,
    R: Clone + Send + Sync + 'static,
{
    /// Binds the method to `receiver`.
    pub fn bind<'a>(&'a self, receiver: &'a S) -> BoundMethod<'a, S, A, R> {
        BoundMethod {
            method: self,
            receiver,
        }
    }

    /// Clears `receiver`'s cache, which drops the results of every memoized
    /// method of that instance. Other instances and friends are untouched.
    pub fn clear(&self, receiver: &S) {
        receiver.instance_cache().clear();
    }

    /// Whether `receiver` holds a result of this method for `args`.
    pub fn is_cached(&self, receiver: &S, args: &A) -> bool {
        CacheKey::for_args(self.name, args)
            .map(|key| receiver.instance_cache().contains(&key))
            .unwrap_or(false)
    }

    fn call_bound(&self, receiver: &S, args: &A) -> R {
        let key = match CacheKey::for_args(self.name, args) {
            Ok(key) => key,
            Err(err) => {
                tracing::trace!(method = self.name, %err, "calling uncached");
                return (self.method)(receiver, args);
            }
        };

        let cache = receiver.instance_cache();
        let generation = cache.generation();
        if let Some(value) = cache.get::<R>(&key) {
            return value;
        }

        // A clear during the call means the result may predate a parameter write.
        let value = (self.method)(receiver, args);
        if (self.cache_if)(&value) {
            cache.insert_if_current(key, value.clone(), generation);
        } else {
            tracing::trace!(method = self.name, "result rejected by cache_if");
        }
        value
    }
}

impl<S, A, R> fmt::Debug for MethodCache<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCache")
            .field("name", &self.name)
            .finish()
    }
}

/// A [`MethodCache`] bound to one receiver.
pub struct BoundMethod<'a, S, A, R> {
    method: &'a MethodCache<S, A, R>,
    receiver: &'a S,
}

impl<'a, S, A, R> BoundMethod<'a, S, A, R>
where
    S: Memoized,
    A: Args,
    R: Clone + Send + Sync + 'static,
{
    /// Calls the method through the receiver's cache.
    pub fn call(&self, args: &A) -> R {
        self.method.call_bound(self.receiver, args)
    }

    pub fn receiver(&self) -> &'a S {
        self.receiver
    }
}

impl<S, A, R> Clone for BoundMethod<'_, S, A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, A, R> Copy for BoundMethod<'_, S, A, R> {}
