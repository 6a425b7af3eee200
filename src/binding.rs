//! Bookkeeping for observable ↔ topic bindings.
//!
//! A binding links one observable to one topic in one [`Direction`]. For any
//! `(observable, topic, direction)` there is at most one live binding:
//! establishing another one replaces it. Different topics on the same
//! observable, and the same topic on different observables, never interfere.

use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
  comparer::Comparer,
  observable::ObservableId,
  subscription::BoxedSubscription,
  topic::Topic,
};

/// Maps a topic value before it is written into a subscribed observable.
pub type Transform<V> = Rc<dyn Fn(&V) -> V>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
  /// Observable changes are published on the topic.
  PublishOn,
  /// Topic publishes are written into the observable.
  SubscribeTo,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingKey {
  pub observable: ObservableId,
  pub topic: Topic,
  pub direction: Direction,
}

impl BindingKey {
  pub fn new(observable: ObservableId, topic: Topic, direction: Direction) -> Self {
    Self { observable, topic, direction }
  }
}

/// Live bindings keyed by `(observable, topic, direction)`.
///
/// The table only swaps handles in and out. Disposing a handle it returns is
/// the caller's job, so that disposal never runs while the table is borrowed.
#[derive(Default)]
pub struct BindingTable {
  bindings: HashMap<BindingKey, BoxedSubscription>,
}

impl BindingTable {
  /// Install `subscription` under `key` and hand back the binding it
  /// displaced, if any.
  pub fn rebind(
    &mut self,
    key: BindingKey,
    subscription: BoxedSubscription,
  ) -> Option<BoxedSubscription> {
    self.bindings.insert(key, subscription)
  }

  /// Remove the binding under `key`.
  pub fn take(&mut self, key: &BindingKey) -> Option<BoxedSubscription> {
    self.bindings.remove(key)
  }

  /// Remove every binding of `observable`.
  pub fn take_all(&mut self, observable: ObservableId) -> Vec<BoxedSubscription> {
    let keys: Vec<_> = self
      .bindings
      .keys()
      .filter(|k| k.observable == observable)
      .cloned()
      .collect();
    keys
      .iter()
      .filter_map(|k| self.bindings.remove(k))
      .collect()
  }

  /// Remove every binding.
  pub fn drain(&mut self) -> impl Iterator<Item = BoxedSubscription> + '_ {
    self.bindings.drain().map(|(_, sub)| sub)
  }

  #[inline]
  pub fn contains(&self, key: &BindingKey) -> bool { self.bindings.contains_key(key) }

  #[inline]
  pub fn len(&self) -> usize { self.bindings.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.bindings.is_empty() }
}

// ==================== Options ====================

/// Options for `publish_on`.
pub struct PublishOptions<V> {
  /// Do not publish the observable's current value when binding.
  pub skip_initial: bool,
  /// Duplicate test; the broker's default comparer when `None`.
  pub comparer: Option<Comparer<V>>,
}

impl<V> PublishOptions<V> {
  pub fn new() -> Self { Self::default() }

  pub fn skip_initial(mut self) -> Self {
    self.skip_initial = true;
    self
  }

  pub fn comparer(mut self, comparer: Comparer<V>) -> Self {
    self.comparer = Some(comparer);
    self
  }
}

impl<V> Default for PublishOptions<V> {
  fn default() -> Self { Self { skip_initial: false, comparer: None } }
}

impl<V> Clone for PublishOptions<V> {
  fn clone(&self) -> Self {
    Self { skip_initial: self.skip_initial, comparer: self.comparer.clone() }
  }
}

impl<V> fmt::Debug for PublishOptions<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PublishOptions")
      .field("skip_initial", &self.skip_initial)
      .field("custom_comparer", &self.comparer.is_some())
      .finish()
  }
}

/// Options for `subscribe_to`.
pub struct SubscribeOptions<V> {
  /// Write the topic's cached value (if any) into the observable when
  /// binding.
  pub initialize_with_latest_value: bool,
  /// Applied to every delivered value before it is written.
  pub transform: Option<Transform<V>>,
}

impl<V> SubscribeOptions<V> {
  pub fn new() -> Self { Self::default() }

  pub fn initialize_with_latest_value(mut self) -> Self {
    self.initialize_with_latest_value = true;
    self
  }

  pub fn transform(mut self, transform: impl Fn(&V) -> V + 'static) -> Self {
    self.transform = Some(Rc::new(transform));
    self
  }
}

impl<V> Default for SubscribeOptions<V> {
  fn default() -> Self { Self { initialize_with_latest_value: false, transform: None } }
}

impl<V> Clone for SubscribeOptions<V> {
  fn clone(&self) -> Self {
    Self {
      initialize_with_latest_value: self.initialize_with_latest_value,
      transform: self.transform.clone(),
    }
  }
}

impl<V> fmt::Debug for SubscribeOptions<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SubscribeOptions")
      .field("initialize_with_latest_value", &self.initialize_with_latest_value)
      .field("transform", &self.transform.is_some())
      .finish()
  }
}

/// Options for `sync_with`.
///
/// There is no transform: a transformed inbound value that differs from what
/// was published is republished, delivered, transformed again, and so on
/// without end.
pub struct SyncOptions<V> {
  pub initialize_with_latest_value: bool,
  pub skip_initial: bool,
  pub comparer: Option<Comparer<V>>,
}

impl<V> SyncOptions<V> {
  pub fn new() -> Self { Self::default() }

  pub fn initialize_with_latest_value(mut self) -> Self {
    self.initialize_with_latest_value = true;
    self
  }

  pub fn skip_initial(mut self) -> Self {
    self.skip_initial = true;
    self
  }

  pub fn comparer(mut self, comparer: Comparer<V>) -> Self {
    self.comparer = Some(comparer);
    self
  }

  /// The inbound and outbound halves of the two-way binding.
  pub fn split(self) -> (SubscribeOptions<V>, PublishOptions<V>) {
    (
      SubscribeOptions {
        initialize_with_latest_value: self.initialize_with_latest_value,
        transform: None,
      },
      PublishOptions { skip_initial: self.skip_initial, comparer: self.comparer },
    )
  }
}

impl<V> Default for SyncOptions<V> {
  fn default() -> Self {
    Self { initialize_with_latest_value: false, skip_initial: false, comparer: None }
  }
}

impl<V> Clone for SyncOptions<V> {
  fn clone(&self) -> Self {
    Self {
      initialize_with_latest_value: self.initialize_with_latest_value,
      skip_initial: self.skip_initial,
      comparer: self.comparer.clone(),
    }
  }
}

impl<V> fmt::Debug for SyncOptions<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SyncOptions")
      .field("initialize_with_latest_value", &self.initialize_with_latest_value)
      .field("skip_initial", &self.skip_initial)
      .field("custom_comparer", &self.comparer.is_some())
      .finish()
  }
}
