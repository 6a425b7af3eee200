use std::{
  any::Any,
  rc::{Rc, Weak},
};

use smallvec::SmallVec;

/// A registered callback. Callbacks are `Fn`, not `FnMut`: a publish made
/// from inside a callback may re-enter the very same callback.
pub type Callback<V> = Rc<dyn Fn(&V)>;

/// A point-in-time copy of a registry, taken before dispatch so that no
/// borrow is held while user callbacks run.
pub(crate) type Snapshot<V> = SmallVec<[(usize, Callback<V>); 2]>;

struct Entry<V> {
  id: usize,
  callback: Callback<V>,
  /// Set for registrations bound to a target context; the entry is dead once
  /// the target has been dropped.
  target: Option<Weak<dyn Any>>,
}

impl<V> Entry<V> {
  fn is_alive(&self) -> bool { self.target.as_ref().map_or(true, |t| t.strong_count() > 0) }
}

/// Callback registry with ID-based removal.
///
/// This is the dispatch machinery shared by [`ObservableValue`],
/// [`Computed`] and the [`Postbox`]: the broker is simply a map from topic to
/// one of these.
///
/// # Design
///
/// - **Insertion order**: entries are kept in registration order, which is the
///   order they are notified in.
/// - **SmallVec**: most topics and observables have one or two subscribers,
///   which fit inline without a heap allocation.
/// - **Monotonic IDs**: an ID is never reused, so a stale handle can never
///   remove somebody else's registration.
///
/// [`ObservableValue`]: crate::observable::ObservableValue
/// [`Computed`]: crate::observable::Computed
/// [`Postbox`]: crate::postbox::Postbox
pub struct Subscribers<V> {
  next_id: usize,
  items: SmallVec<[Entry<V>; 2]>,
}

impl<V> Default for Subscribers<V> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<V> Subscribers<V> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Add a callback and return its unique ID.
  pub fn add(&mut self, callback: Callback<V>) -> usize { self.push(callback, None) }

  /// Add a callback that lives only as long as `target` does.
  pub fn add_with_target(&mut self, callback: Callback<V>, target: Weak<dyn Any>) -> usize {
    self.push(callback, Some(target))
  }

  fn push(&mut self, callback: Callback<V>, target: Option<Weak<dyn Any>>) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push(Entry { id, callback, target });
    id
  }

  /// Remove a callback by ID. Returns `true` if it was registered.
  pub fn remove(&mut self, id: usize) -> bool {
    match self.items.iter().position(|e| e.id == id) {
      Some(pos) => {
        self.items.remove(pos);
        true
      }
      None => false,
    }
  }

  /// `true` while the registration exists and its target (if any) is alive.
  pub fn contains(&self, id: usize) -> bool {
    self
      .items
      .iter()
      .any(|e| e.id == id && e.is_alive())
  }

  /// Number of registrations, including ones whose target died but that have
  /// not been pruned yet.
  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Drop registrations whose target has gone away.
  pub fn prune(&mut self) { self.items.retain(|e| e.is_alive()); }

  /// Prune dead registrations and copy out the live ones in notification
  /// order.
  pub(crate) fn snapshot(&mut self) -> Snapshot<V> {
    self.prune();
    self
      .items
      .iter()
      .map(|e| (e.id, e.callback.clone()))
      .collect()
  }
}

/// Invoke every callback of `snapshot` with `value`.
///
/// `is_live` is consulted right before each call, so a callback that
/// unsubscribes a later one during the same dispatch prevents that later
/// invocation.
pub(crate) fn broadcast<V>(snapshot: Snapshot<V>, value: &V, is_live: impl Fn(usize) -> bool) {
  for (id, callback) in snapshot {
    if is_live(id) {
      callback(value);
    }
  }
}
