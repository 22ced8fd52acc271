use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::{Memoized, MutationProxy};

/// Implemented by types that carry [`ParameterSlot`] values.
///
/// Writing or deleting a slot invalidates the instance through its
/// [`Memoized`] cache, cascading to friends.
pub trait HasParameters: Memoized {
    fn parameter_storage(&self) -> &SlotStorage;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SlotKey {
    type_id: TypeId,
    name: &'static str,
}

/// Per-instance storage behind every [`ParameterSlot`] of that instance.
///
/// Entries are keyed by the slot's value type and name, so two slots declared
/// with the same `(T, name)` address the same value.
pub struct SlotStorage {
    values: Mutex<HashMap<SlotKey, Box<dyn Any + Send + Sync>>>,
}

impl SlotStorage {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Number of assigned slots.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl Default for SlotStorage {
    fn default() -> Self {
        Self::new()
    }
}

// Cloning an instance starts with no assigned parameters.
impl Clone for SlotStorage {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for SlotStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.lock().keys().map(|k| k.name).collect();
        names.sort_unstable();
        f.debug_struct("SlotStorage").field("slots", &names).finish()
    }
}

/// A named, typed parameter of an instance whose changes invalidate that
/// instance's memoized methods.
///
/// The slot itself is a zero-sized descriptor, usually a `const` or `static`;
/// values live in each instance's [`SlotStorage`]. Reads hand out the stored
/// [`MutationProxy`], so in-place edits through it (`push`, `insert`,
/// `add_assign`, ...) invalidate as well.
///
/// A written value is moved into the slot. Nothing outside the slot can alias
/// it, so the only way to change it is through the proxy.
///
/// Proxies replaced by a later write, or removed by [`ParameterSlot::delete`],
/// stay attached to their instance: mutating a stale handle still invalidates.
///
/// # Examples
///
/// ```
/// use memparams_core::{HasParameters, InstanceCache, Memoized, MethodCache, ParameterSlot, SlotStorage};
///
/// #[derive(Default)]
/// struct Adder {
///     cache: InstanceCache,
///     params: SlotStorage,
/// }
///
/// impl Memoized for Adder {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// impl HasParameters for Adder {
///     fn parameter_storage(&self) -> &SlotStorage {
///         &self.params
///     }
/// }
///
/// const BASE: ParameterSlot<i64> = ParameterSlot::new("base");
///
/// static ADD: MethodCache<Adder, (i64,), i64> =
///     MethodCache::new("add", |adder, &(x,)| BASE.get(adder).unwrap_or(0) + x);
///
/// let adder = Adder::default();
/// BASE.write(&adder, 3);
/// assert_eq!(ADD.bind(&adder).call(&(4,)), 7);
///
/// BASE.write(&adder, 10);
/// assert_eq!(ADD.bind(&adder).call(&(4,)), 14);
///
/// BASE.read(&adder).unwrap().add_assign(1_i64);
/// assert_eq!(ADD.bind(&adder).call(&(4,)), 15);
/// ```
pub struct ParameterSlot<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ParameterSlot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: Send + Sync + 'static> ParameterSlot<T> {
    fn key(&self) -> SlotKey {
        SlotKey {
            type_id: TypeId::of::<T>(),
            name: self.name,
        }
    }

    /// The stored proxy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSet`] if the slot was never written on `instance`
    /// or has been deleted.
    pub fn read<I: HasParameters + ?Sized>(&self, instance: &I) -> Result<Arc<MutationProxy<T>>> {
        instance
            .parameter_storage()
            .values
            .lock()
            .get(&self.key())
            .and_then(|value| value.downcast_ref::<Arc<MutationProxy<T>>>())
            .cloned()
            .ok_or(Error::NotSet { slot: self.name })
    }

    /// A plain copy of the stored value.
    pub fn get<I: HasParameters + ?Sized>(&self, instance: &I) -> Result<T>
    where
        T: Clone,
    {
        self.read(instance).map(|proxy| proxy.get())
    }

    pub fn is_set<I: HasParameters + ?Sized>(&self, instance: &I) -> bool {
        instance
            .parameter_storage()
            .values
            .lock()
            .contains_key(&self.key())
    }

    /// Stores `value` in a fresh proxy bound to `instance`, then invalidates
    /// the instance and its friends.
    pub fn write<I: HasParameters + ?Sized>(&self, instance: &I, value: T) {
        let proxy = Arc::new(MutationProxy::new(
            value,
            instance.instance_cache().invalidator(),
        ));
        instance
            .parameter_storage()
            .values
            .lock()
            .insert(self.key(), Box::new(proxy));

        let cleared = instance.invalidate();
        tracing::debug!(
            slot = self.name,
            instance = %instance.instance_cache().id(),
            cleared,
            "parameter written"
        );
    }

    /// Writes a copy of `source`'s current value. The new proxy belongs to
    /// `instance`, whatever `source` was attached to.
    pub fn write_copy<I: HasParameters + ?Sized>(&self, instance: &I, source: &MutationProxy<T>)
    where
        T: Clone,
    {
        self.write(instance, source.get());
    }

    /// Removes the value and invalidates the instance and its friends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSet`] if there was nothing to remove. The instance
    /// is invalidated either way.
    pub fn delete<I: HasParameters + ?Sized>(&self, instance: &I) -> Result<()> {
        let removed = instance
            .parameter_storage()
            .values
            .lock()
            .remove(&self.key())
            .is_some();

        let cleared = instance.invalidate();
        tracing::debug!(
            slot = self.name,
            instance = %instance.instance_cache().id(),
            removed,
            cleared,
            "parameter deleted"
        );

        if removed {
            Ok(())
        } else {
            Err(Error::NotSet { slot: self.name })
        }
    }
}

impl<T> Clone for ParameterSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ParameterSlot<T> {}

impl<T> fmt::Debug for ParameterSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSlot")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
