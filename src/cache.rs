use std::{collections::HashMap, rc::Rc};

use crate::{comparer::CacheEntry, topic::Topic};

/// The last published value of every topic.
///
/// One entry per topic, overwritten on each publish and never removed while
/// the owning broker lives. Entries are reference counted so a reader can
/// hold one without keeping the cache borrowed.
pub struct TopicCache<V> {
  entries: HashMap<Topic, Rc<CacheEntry<V>>>,
}

impl<V> Default for TopicCache<V> {
  fn default() -> Self { Self { entries: HashMap::new() } }
}

impl<V> TopicCache<V> {
  #[inline]
  pub fn get(&self, topic: &str) -> Option<&Rc<CacheEntry<V>>> { self.entries.get(topic) }

  #[inline]
  pub fn contains(&self, topic: &str) -> bool { self.entries.contains_key(topic) }

  /// Store `entry` for `topic`, returning the entry it replaced.
  pub fn insert(&mut self, topic: Topic, entry: CacheEntry<V>) -> Option<Rc<CacheEntry<V>>> {
    self.entries.insert(topic, Rc::new(entry))
  }

  #[inline]
  pub fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn topics(&self) -> impl Iterator<Item = &Topic> { self.entries.keys() }
}
