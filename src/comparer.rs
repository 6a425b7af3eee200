//! Equality comparers used to suppress redundant publishes.
//!
//! A comparer answers one question for a `publish_on` binding: given the
//! value the observable just changed to and the topic's cache entry, is this
//! publish a duplicate? `true` suppresses the publish, `false` lets it
//! through. A missing cache entry (nothing has been published on the topic
//! yet) is passed as `None`.

use std::rc::Rc;

use crate::serializer::Serializer;

/// The last value published on a topic, with its serialized form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
  pub value: V,
  pub serialized: String,
}

/// Decides whether a candidate publish duplicates the cached entry.
pub type Comparer<V> = Rc<dyn Fn(&V, Option<&CacheEntry<V>>) -> bool>;

/// Wrap a closure as a [`Comparer`].
pub fn comparer<V>(f: impl Fn(&V, Option<&CacheEntry<V>>) -> bool + 'static) -> Comparer<V> {
  Rc::new(f)
}

/// The default duplicate test.
///
/// A value is a duplicate only when it is equal to the cached value **and**
/// its serialized form equals the cached serialized form. Serialization is
/// skipped when the values already differ.
pub fn is_duplicate<V: PartialEq>(
  value: &V,
  entry: Option<&CacheEntry<V>>,
  serializer: &dyn Serializer<V>,
) -> bool {
  entry.is_some_and(|entry| {
    *value == entry.value && serializer.serialize(value) == entry.serialized
  })
}

/// A comparer that never suppresses: every change is published.
pub fn always_publish<V>() -> Comparer<V> { Rc::new(|_, _| false) }

/// A comparer that looks at `PartialEq` only, ignoring the serialized form.
pub fn by_value<V: PartialEq>() -> Comparer<V> {
  Rc::new(|value, entry| entry.is_some_and(|e| *value == e.value))
}
