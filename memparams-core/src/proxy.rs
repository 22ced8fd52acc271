//! # Mutation proxies
//!
//! A [`MutationProxy`] wraps the value stored in a
//! [`ParameterSlot`](crate::ParameterSlot) and clears its owner's cache after
//! every operation that changes the value.
//!
//! The set of mutating operations is closed and per type:
//!
//! | Type | Mutators |
//! |---|---|
//! | any `T` | `replace`, `modify`, `add_assign` ... `shr_assign` |
//! | `Vec<T>` | `push`, `extend`, `insert`, `pop`, `remove`, `remove_item`, `set`, `splice`, `drain`, `truncate`, `retain`, `reverse`, `sort`, `sort_by`, `dedup`, `clear` |
//! | `VecDeque<T>` | `push_back`, `push_front`, `pop_back`, `pop_front`, `extend`, `extend_front`, `insert`, `remove`, `set`, `rotate_left`, `rotate_right`, `clear` |
//! | `HashMap<K, V>`, `BTreeMap<K, V>` | `insert`, `remove`, `extend`, `set_default`, `retain`, `clear` (+ `pop_any` for `HashMap`, `pop_first`, `pop_last` for `BTreeMap`) |
//! | `HashSet<T>`, `BTreeSet<T>` | `insert`, `remove`, `extend`, `retain`, `clear` (+ `pop_first`, `pop_last` for `BTreeSet`) |
//! | `String` | `push`, `push_str`, `insert_str`, `truncate`, `clear` |
//!
//! Everything else (`read`, `with`, `get`, `len`, `contains`, comparisons,
//! formatting) only reads and never invalidates.
//!
//! Invalidation runs after the mutation completes and the write lock is
//! released.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::ops::{Bound, Range, RangeBounds};

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::{Error, Result};
use crate::{CacheableKey, Invalidator};

/// A tracked value that invalidates its owner on mutation.
///
/// The owner is referenced weakly through an [`Invalidator`]: a proxy never
/// keeps its owner alive, and mutating a proxy whose owner is gone simply
/// changes the value.
///
/// # Examples
///
/// ```
/// use memparams_core::{InstanceCache, MutationProxy};
///
/// let owner = InstanceCache::new();
/// let items = MutationProxy::new(vec![3, 1, 2], owner.invalidator());
///
/// items.push(4);
/// items.sort();
/// assert_eq!(items.get(), vec![1, 2, 3, 4]);
/// assert_eq!(items.len(), 4);
/// ```
pub struct MutationProxy<T> {
    value: RwLock<T>,
    owner: Invalidator,
}

macro_rules! assign_ops {
    ($($(#[$doc:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name<Rhs>(&self, rhs: Rhs)
            where
                T: std::ops::$op<Rhs>,
            {
                self.mutate(stringify!($name), |value| std::ops::$op::$name(value, rhs))
            }
        )*
    };
}

impl<T> MutationProxy<T> {
    /// Wraps `value`, invalidating `owner` on every mutation.
    pub fn new(value: T, owner: Invalidator) -> Self {
        Self {
            value: RwLock::new(value),
            owner,
        }
    }

    /// Wraps `value` with no owner.
    pub fn detached(value: T) -> Self {
        Self::new(value, Invalidator::detached())
    }

    pub fn owner(&self) -> &Invalidator {
        &self.owner
    }

    /// Shared access to the current value. Holding the guard blocks mutators.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.value.read()
    }

    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&*self.value.read())
    }

    /// A plain copy of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.read().clone()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// The same value with the owner association dropped.
    pub fn into_detached(self) -> Self {
        Self::detached(self.value.into_inner())
    }

    /// Assigns a new value, returning the old one.
    pub fn replace(&self, value: T) -> T {
        self.mutate("replace", |current| std::mem::replace(current, value))
    }

    /// Applies an arbitrary in-place edit. Always invalidates, whether or not
    /// `f` actually changed anything.
    pub fn modify<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        self.mutate("modify", f)
    }

    assign_ops! {
        /// `value += rhs`
        add_assign => AddAssign,
        /// `value -= rhs`
        sub_assign => SubAssign,
        /// `value *= rhs`
        mul_assign => MulAssign,
        div_assign => DivAssign,
        rem_assign => RemAssign,
        bitand_assign => BitAndAssign,
        bitor_assign => BitOrAssign,
        bitxor_assign => BitXorAssign,
        shl_assign => ShlAssign,
        shr_assign => ShrAssign,
    }

    fn mutate<U>(&self, op: &'static str, f: impl FnOnce(&mut T) -> U) -> U {
        let out = {
            let mut value = self.value.write();
            f(&mut *value)
        };
        let cleared = self.owner.invalidate();
        tracing::trace!(op, cleared, "tracked value mutated");
        out
    }
}

/// Resolves `range` against a sequence of length `len`, with both ends
/// clamped to `len` and `start <= end`.
fn clamp_range<R: RangeBounds<usize>>(range: &R, len: usize) -> Range<usize> {
    let end = match range.end_bound() {
        Bound::Included(&end) => end.saturating_add(1),
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    }
    .min(len);
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start.saturating_add(1),
        Bound::Unbounded => 0,
    }
    .min(end);
    start..end
}

impl<T> MutationProxy<Vec<T>> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.value.read().contains(item)
    }

    /// Copy of the element at `index`.
    pub fn item(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.value.read().get(index).cloned()
    }

    pub fn push(&self, item: T) {
        self.mutate("push", |v| v.push(item))
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.mutate("extend", |v| v.extend(items))
    }

    /// Inserts `item` at `index`, clamped to the length like a list insert.
    pub fn insert(&self, index: usize, item: T) {
        self.mutate("insert", |v| {
            let index = index.min(v.len());
            v.insert(index, item)
        })
    }

    pub fn pop(&self) -> Option<T> {
        self.mutate("pop", Vec::pop)
    }

    /// Removes and returns the element at `index`, `None` if out of range.
    pub fn remove(&self, index: usize) -> Option<T> {
        self.mutate("remove", |v| (index < v.len()).then(|| v.remove(index)))
    }

    /// Removes the first element equal to `item`.
    pub fn remove_item(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.mutate("remove_item", |v| match v.iter().position(|x| x == item) {
            Some(pos) => {
                v.remove(pos);
                true
            }
            None => false,
        })
    }

    /// Replaces the element at `index`, returning the previous one. Out of
    /// range indices leave the vector unchanged and return `None`.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        self.mutate("set", |v| {
            v.get_mut(index)
                .map(|slot| std::mem::replace(slot, item))
        })
    }

    /// Replaces `range` with `items`, returning the removed elements. The
    /// range is clamped to the length, so `splice(2..10, ..)` on a shorter
    /// vector replaces the tail.
    pub fn splice<R, I>(&self, range: R, items: I) -> Vec<T>
    where
        R: RangeBounds<usize>,
        I: IntoIterator<Item = T>,
    {
        self.mutate("splice", |v| {
            let range = clamp_range(&range, v.len());
            v.splice(range, items).collect()
        })
    }

    /// Removes `range`, clamped to the length, returning the removed elements.
    pub fn drain<R: RangeBounds<usize>>(&self, range: R) -> Vec<T> {
        self.mutate("drain", |v| {
            let range = clamp_range(&range, v.len());
            v.drain(range).collect()
        })
    }

    pub fn truncate(&self, len: usize) {
        self.mutate("truncate", |v| v.truncate(len))
    }

    pub fn retain(&self, f: impl FnMut(&T) -> bool) {
        self.mutate("retain", |v| v.retain(f))
    }

    pub fn reverse(&self) {
        self.mutate("reverse", |v| v.reverse())
    }

    pub fn sort(&self)
    where
        T: Ord,
    {
        self.mutate("sort", |v| v.sort())
    }

    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.mutate("sort_by", |v| v.sort_by(compare))
    }

    pub fn dedup(&self)
    where
        T: PartialEq,
    {
        self.mutate("dedup", |v| v.dedup())
    }

    pub fn clear(&self) {
        self.mutate("clear", |v| v.clear())
    }
}

impl<T> MutationProxy<VecDeque<T>> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.value.read().contains(item)
    }

    pub fn item(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.value.read().get(index).cloned()
    }

    pub fn push_back(&self, item: T) {
        self.mutate("push_back", |v| v.push_back(item))
    }

    pub fn push_front(&self, item: T) {
        self.mutate("push_front", |v| v.push_front(item))
    }

    pub fn pop_back(&self) -> Option<T> {
        self.mutate("pop_back", VecDeque::pop_back)
    }

    pub fn pop_front(&self) -> Option<T> {
        self.mutate("pop_front", VecDeque::pop_front)
    }

    /// Pushes each item to the front in turn, so they end up in reverse order.
    pub fn extend_front(&self, items: impl IntoIterator<Item = T>) {
        self.mutate("extend_front", |v| {
            for item in items {
                v.push_front(item);
            }
        })
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.mutate("extend", |v| v.extend(items))
    }

    pub fn insert(&self, index: usize, item: T) {
        self.mutate("insert", |v| {
            let index = index.min(v.len());
            v.insert(index, item)
        })
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        self.mutate("remove", |v| v.remove(index))
    }

    pub fn set(&self, index: usize, item: T) -> Option<T> {
        self.mutate("set", |v| {
            v.get_mut(index)
                .map(|slot| std::mem::replace(slot, item))
        })
    }

    /// Rotates by `n` places, wrapping `n` to the length.
    pub fn rotate_left(&self, n: usize) {
        self.mutate("rotate_left", |v| {
            if !v.is_empty() {
                let n = n % v.len();
                v.rotate_left(n)
            }
        })
    }

    pub fn rotate_right(&self, n: usize) {
        self.mutate("rotate_right", |v| {
            if !v.is_empty() {
                let n = n % v.len();
                v.rotate_right(n)
            }
        })
    }

    pub fn clear(&self) {
        self.mutate("clear", |v| v.clear())
    }
}

impl<K: Eq + Hash, V> MutationProxy<HashMap<K, V>> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.value.read().contains_key(key)
    }

    /// Copy of the value stored under `key`.
    pub fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.value.read().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.mutate("insert", |m| m.insert(key, value))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.mutate("remove", |m| m.remove(key))
    }

    pub fn extend(&self, entries: impl IntoIterator<Item = (K, V)>) {
        self.mutate("extend", |m| m.extend(entries))
    }

    /// Inserts `default` unless `key` is present, and returns a copy of the
    /// value now stored under `key`.
    pub fn set_default(&self, key: K, default: V) -> V
    where
        V: Clone,
    {
        self.mutate("set_default", |m| m.entry(key).or_insert(default).clone())
    }

    pub fn retain(&self, f: impl FnMut(&K, &mut V) -> bool) {
        self.mutate("retain", |m| m.retain(f))
    }

    /// Removes and returns an arbitrary entry, `None` if the map is empty.
    pub fn pop_any(&self) -> Option<(K, V)>
    where
        K: Clone,
    {
        self.mutate("pop_any", |m| {
            let key = m.keys().next()?.clone();
            m.remove_entry(&key)
        })
    }

    pub fn clear(&self) {
        self.mutate("clear", |m| m.clear())
    }
}

impl<K: Ord, V> MutationProxy<BTreeMap<K, V>> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.value.read().contains_key(key)
    }

    pub fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.value.read().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.mutate("insert", |m| m.insert(key, value))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.mutate("remove", |m| m.remove(key))
    }

    pub fn extend(&self, entries: impl IntoIterator<Item = (K, V)>) {
        self.mutate("extend", |m| m.extend(entries))
    }

    pub fn set_default(&self, key: K, default: V) -> V
    where
        V: Clone,
    {
        self.mutate("set_default", |m| m.entry(key).or_insert(default).clone())
    }

    pub fn retain(&self, f: impl FnMut(&K, &mut V) -> bool) {
        self.mutate("retain", |m| m.retain(f))
    }

    pub fn pop_first(&self) -> Option<(K, V)> {
        self.mutate("pop_first", BTreeMap::pop_first)
    }

    pub fn pop_last(&self) -> Option<(K, V)> {
        self.mutate("pop_last", BTreeMap::pop_last)
    }

    pub fn clear(&self) {
        self.mutate("clear", |m| m.clear())
    }
}

impl<T: Eq + Hash> MutationProxy<HashSet<T>> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.value.read().contains(item)
    }

    pub fn insert(&self, item: T) -> bool {
        self.mutate("insert", |s| s.insert(item))
    }

    pub fn remove(&self, item: &T) -> bool {
        self.mutate("remove", |s| s.remove(item))
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.mutate("extend", |s| s.extend(items))
    }

    pub fn retain(&self, f: impl FnMut(&T) -> bool) {
        self.mutate("retain", |s| s.retain(f))
    }

    pub fn clear(&self) {
        self.mutate("clear", |s| s.clear())
    }
}

impl<T: Ord> MutationProxy<BTreeSet<T>> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.value.read().contains(item)
    }

    pub fn insert(&self, item: T) -> bool {
        self.mutate("insert", |s| s.insert(item))
    }

    pub fn remove(&self, item: &T) -> bool {
        self.mutate("remove", |s| s.remove(item))
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.mutate("extend", |s| s.extend(items))
    }

    pub fn retain(&self, f: impl FnMut(&T) -> bool) {
        self.mutate("retain", |s| s.retain(f))
    }

    pub fn pop_first(&self) -> Option<T> {
        self.mutate("pop_first", BTreeSet::pop_first)
    }

    pub fn pop_last(&self) -> Option<T> {
        self.mutate("pop_last", BTreeSet::pop_last)
    }

    pub fn clear(&self) {
        self.mutate("clear", |s| s.clear())
    }
}

impl MutationProxy<String> {
    pub fn len(&self) -> usize {
        self.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    pub fn push(&self, ch: char) {
        self.mutate("push", |s| s.push(ch))
    }

    pub fn push_str(&self, text: &str) {
        self.mutate("push_str", |s| s.push_str(text))
    }

    /// Inserts `text` at byte offset `index`. Offsets past the end or off a
    /// char boundary leave the string unchanged and return `false`.
    pub fn insert_str(&self, index: usize, text: &str) -> bool {
        self.mutate("insert_str", |s| {
            if s.is_char_boundary(index) {
                s.insert_str(index, text);
                true
            } else {
                false
            }
        })
    }

    /// Shortens to `len` bytes, rounded down to a char boundary.
    pub fn truncate(&self, len: usize) {
        self.mutate("truncate", |s| {
            let mut len = len.min(s.len());
            while !s.is_char_boundary(len) {
                len -= 1;
            }
            s.truncate(len)
        })
    }

    pub fn clear(&self) {
        self.mutate("clear", |s| s.clear())
    }
}

/// A fresh proxy around a copy of the current value, with the same owner.
impl<T: Clone> Clone for MutationProxy<T> {
    fn clone(&self) -> Self {
        Self::new(self.get(), self.owner.clone())
    }
}

impl<T: Default> Default for MutationProxy<T> {
    fn default() -> Self {
        Self::detached(T::default())
    }
}

impl<T: PartialEq> PartialEq for MutationProxy<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || *self.value.read() == *other.value.read()
    }
}

impl<T: fmt::Debug> fmt::Debug for MutationProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value.read(), f)
    }
}

impl<T: fmt::Display> fmt::Display for MutationProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.value.read(), f)
    }
}

// Tracked values change under the key, so they never hash.
impl<T: fmt::Debug> CacheableKey for MutationProxy<T> {
    fn to_cache_key(&self) -> Result<String> {
        Err(Error::unhashable(std::any::type_name::<Self>()))
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for MutationProxy<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.read().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for MutationProxy<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self::detached)
    }
}
