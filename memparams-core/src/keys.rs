use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::{self, Debug, Display};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Trait for values that can take part in a cache key.
///
/// The default implementation uses the `Debug` representation, so for most
/// immutable types an empty `impl CacheableKey for MyType {}` is enough.
/// Override `to_cache_key` for a cheaper or more precise fragment, or return
/// [`Error::Unhashable`] for types whose identity can change while they are in
/// use as an argument (this crate does so for all standard mutable containers).
///
/// # Examples
///
/// ```
/// use memparams_core::CacheableKey;
///
/// #[derive(Debug, Clone)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// // Debug-based key
/// impl CacheableKey for Point {}
///
/// assert_eq!(Point { x: 1, y: 2 }.to_cache_key().unwrap(), "Point { x: 1, y: 2 }");
/// assert!(vec![1, 2, 3].to_cache_key().is_err());
/// ```
pub trait CacheableKey: Debug {
    /// Returns the canonical key fragment for this value.
    fn to_cache_key(&self) -> Result<String> {
        Ok(format!("{:?}", self))
    }
}

macro_rules! impl_debug_cacheable_key {
    ($($t:ty),* $(,)?) => {
        $(impl CacheableKey for $t {})*
    };
}

impl_debug_cacheable_key!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, (),
    String, str,
);

impl<T: CacheableKey + ?Sized> CacheableKey for &T {
    fn to_cache_key(&self) -> Result<String> {
        (**self).to_cache_key()
    }
}

impl<T: CacheableKey + ?Sized> CacheableKey for Box<T> {
    fn to_cache_key(&self) -> Result<String> {
        (**self).to_cache_key()
    }
}

impl<T: CacheableKey + ?Sized> CacheableKey for Rc<T> {
    fn to_cache_key(&self) -> Result<String> {
        (**self).to_cache_key()
    }
}

impl<T: CacheableKey + ?Sized> CacheableKey for Arc<T> {
    fn to_cache_key(&self) -> Result<String> {
        (**self).to_cache_key()
    }
}

impl<T: CacheableKey> CacheableKey for Option<T> {
    fn to_cache_key(&self) -> Result<String> {
        match self {
            Some(value) => Ok(format!("Some({})", value.to_cache_key()?)),
            None => Ok("None".to_string()),
        }
    }
}

impl<T: CacheableKey> CacheableKey for [T] {
    fn to_cache_key(&self) -> Result<String> {
        let parts = self
            .iter()
            .map(CacheableKey::to_cache_key)
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("[{}]", parts.join(", ")))
    }
}

impl<T: CacheableKey, const N: usize> CacheableKey for [T; N] {
    fn to_cache_key(&self) -> Result<String> {
        self.as_slice().to_cache_key()
    }
}

// Mutable containers are never valid key fragments.
macro_rules! impl_unhashable {
    ($(<$($g:ident),+> $t:ty),* $(,)?) => {
        $(impl<$($g: Debug),+> CacheableKey for $t {
            fn to_cache_key(&self) -> Result<String> {
                Err(Error::unhashable(std::any::type_name::<Self>()))
            }
        })*
    };
}

impl_unhashable!(
    <T> Vec<T>,
    <T> VecDeque<T>,
    <T> BTreeSet<T>,
    <K, V> BTreeMap<K, V>,
);

impl<T: Debug, S> CacheableKey for HashSet<T, S> {
    fn to_cache_key(&self) -> Result<String> {
        Err(Error::unhashable(std::any::type_name::<Self>()))
    }
}

impl<K: Debug, V: Debug, S> CacheableKey for HashMap<K, V, S> {
    fn to_cache_key(&self) -> Result<String> {
        Err(Error::unhashable(std::any::type_name::<Self>()))
    }
}

macro_rules! impl_tuple_keys {
    ($($name:ident),+) => {
        impl<$($name: CacheableKey),+> CacheableKey for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_cache_key(&self) -> Result<String> {
                let ($($name,)+) = self;
                let parts = [$($name.to_cache_key()?),+];
                Ok(format!("({})", parts.join(", ")))
            }
        }

        impl<$($name: CacheableKey),+> Args for ($($name,)+) {
            #[allow(non_snake_case)]
            fn write_key(&self, builder: &mut KeyBuilder) {
                let ($($name,)+) = self;
                $(builder.arg($name);)+
            }
        }
    };
}

impl_tuple_keys!(A);
impl_tuple_keys!(A, B);
impl_tuple_keys!(A, B, C);
impl_tuple_keys!(A, B, C, D);
impl_tuple_keys!(A, B, C, D, E);
impl_tuple_keys!(A, B, C, D, E, F);
impl_tuple_keys!(A, B, C, D, E, F, G);
impl_tuple_keys!(A, B, C, D, E, F, G, H);

/// Canonical cache key of one call.
///
/// Built from the callable's name, the positional argument fragments (order
/// significant) and the keyword argument fragments (kept sorted by name, so the
/// order in which keywords were supplied never matters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    callable: &'static str,
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
}

impl CacheKey {
    /// Builds the key of `callable` applied to `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unhashable`] if any argument cannot produce a key fragment.
    pub fn for_args<A: Args + ?Sized>(callable: &'static str, args: &A) -> Result<CacheKey> {
        let mut builder = KeyBuilder::new(callable);
        args.write_key(&mut builder);
        builder.build()
    }

    pub fn callable(&self) -> &'static str {
        self.callable
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn keyword(&self) -> &BTreeMap<String, String> {
        &self.keyword
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.callable)?;
        let mut first = true;
        for part in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            f.write_str(part)?;
        }
        for (name, part) in &self.keyword {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", name, part)?;
        }
        f.write_str(")")
    }
}

/// Incremental constructor for [`CacheKey`].
///
/// The first unhashable argument poisons the builder: later arguments are
/// ignored and [`KeyBuilder::build`] reports the failure. A call is cached as a
/// whole or not at all.
///
/// # Examples
///
/// ```
/// use memparams_core::KeyBuilder;
///
/// let mut a = KeyBuilder::new("solve");
/// a.arg(&1).kwarg("tol", &0.5).kwarg("max_iter", &10);
///
/// let mut b = KeyBuilder::new("solve");
/// b.arg(&1).kwarg("max_iter", &10).kwarg("tol", &0.5);
///
/// assert_eq!(a.build().unwrap(), b.build().unwrap());
/// ```
#[derive(Debug)]
pub struct KeyBuilder {
    callable: &'static str,
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
    error: Option<Error>,
}

impl KeyBuilder {
    pub fn new(callable: &'static str) -> Self {
        Self {
            callable,
            positional: Vec::new(),
            keyword: BTreeMap::new(),
            error: None,
        }
    }

    /// Appends a positional argument.
    pub fn arg(&mut self, value: &dyn CacheableKey) -> &mut Self {
        if self.error.is_none() {
            match value.to_cache_key() {
                Ok(part) => self.positional.push(part),
                Err(_) => {
                    self.error = Some(Error::unhashable(format!(
                        "#{} of {}",
                        self.positional.len(),
                        self.callable
                    )))
                }
            }
        }
        self
    }

    /// Adds a keyword argument. A repeated name replaces the earlier value.
    pub fn kwarg(&mut self, name: &str, value: &dyn CacheableKey) -> &mut Self {
        if self.error.is_none() {
            match value.to_cache_key() {
                Ok(part) => {
                    self.keyword.insert(name.to_string(), part);
                }
                Err(_) => {
                    self.error = Some(Error::unhashable(format!(
                        "{} of {}",
                        name, self.callable
                    )))
                }
            }
        }
        self
    }

    /// Finishes the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unhashable`] naming the first argument that failed.
    pub fn build(self) -> Result<CacheKey> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(CacheKey {
            callable: self.callable,
            positional: self.positional,
            keyword: self.keyword,
        })
    }
}

/// An argument bundle that knows how to describe itself to a [`KeyBuilder`].
///
/// Implemented for tuples (every element positional), [`Kwargs`] (keyword
/// only) and [`WithKwargs`] (both). Implement it for an argument struct to
/// expose its fields as keywords:
///
/// ```
/// use memparams_core::{Args, CacheKey, KeyBuilder};
///
/// struct Tolerance {
///     abs: f64,
///     rel: f64,
/// }
///
/// impl Args for Tolerance {
///     fn write_key(&self, builder: &mut KeyBuilder) {
///         builder.kwarg("abs", &self.abs).kwarg("rel", &self.rel);
///     }
/// }
///
/// let key = CacheKey::for_args("converge", &Tolerance { abs: 1e-9, rel: 1e-6 }).unwrap();
/// assert_eq!(key.keyword().len(), 2);
/// ```
pub trait Args {
    fn write_key(&self, builder: &mut KeyBuilder);
}

impl Args for () {
    fn write_key(&self, _builder: &mut KeyBuilder) {}
}

/// Keyword arguments sharing one value type.
///
/// Lookup keeps insertion order for iteration, but the resulting key is
/// independent of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Kwargs<V> {
    entries: Vec<(String, V)>,
}

impl<V> Kwargs<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a keyword, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for Kwargs<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Kwargs<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        for (name, value) in iter {
            kwargs.insert(name, value);
        }
        kwargs
    }
}

impl<V: CacheableKey> Args for Kwargs<V> {
    fn write_key(&self, builder: &mut KeyBuilder) {
        for (name, value) in &self.entries {
            builder.kwarg(name, value);
        }
    }
}

/// Positional arguments `P` followed by keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct WithKwargs<P, V> {
    pub args: P,
    pub kwargs: Kwargs<V>,
}

impl<P, V> WithKwargs<P, V> {
    pub fn new(args: P, kwargs: Kwargs<V>) -> Self {
        Self { args, kwargs }
    }
}

impl<P: Args, V: CacheableKey> Args for WithKwargs<P, V> {
    fn write_key(&self, builder: &mut KeyBuilder) {
        self.args.write_key(builder);
        self.kwargs.write_key(builder);
    }
}
