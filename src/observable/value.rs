use std::{fmt, rc::Rc};

use super::{Observable, ObservableId, Writer};
use crate::{
  rc::{MutRc, RcDeref, RcDerefMut, WeakMutRc},
  subscribers::{broadcast, Subscribers},
  subscription::{BoxedSubscription, Subscription},
};

struct ValueInner<T> {
  value: T,
  version: u64,
  subscribers: Subscribers<T>,
}

/// A shared, writable value with change notification.
///
/// Cloning an `ObservableValue` creates a new handle to the **same** state:
/// both handles see the same value, share subscribers and share an
/// [`ObservableId`].
///
/// # Invariants
///
/// 1. `set(v)` where `v == current` is a no-op: no version bump, no
///    notification.
/// 2. Subscribers are notified in registration order.
/// 3. No borrow is held while subscribers run, so a subscriber may read or
///    write this observable (or any other) re-entrantly.
pub struct ObservableValue<T> {
  id: ObservableId,
  inner: MutRc<ValueInner<T>>,
}

impl<T> Clone for ObservableValue<T> {
  fn clone(&self) -> Self { Self { id: self.id, inner: self.inner.clone() } }
}

impl<T: fmt::Debug> fmt::Debug for ObservableValue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = self.inner.rc_deref();
    f.debug_struct("ObservableValue")
      .field("id", &self.id)
      .field("value", &inner.value)
      .field("version", &inner.version)
      .field("subscriber_count", &inner.subscribers.len())
      .finish()
  }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> {
  pub fn new(value: T) -> Self {
    Self {
      id: ObservableId::next(),
      inner: MutRc::own(ValueInner { value, version: 0, subscribers: Subscribers::new() }),
    }
  }

  #[inline]
  pub fn get(&self) -> T { self.inner.rc_deref().value.clone() }

  /// Access the current value by reference without cloning. `f` must not
  /// write to this observable.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { f(&self.inner.rc_deref().value) }

  /// Replace the value, notifying subscribers if it changed.
  pub fn set(&self, value: T) {
    {
      let mut inner = self.inner.rc_deref_mut();
      if inner.value == value {
        return;
      }
      inner.value = value;
      inner.version += 1;
    }
    self.notify();
  }

  /// Modify a copy of the value, then [`set`](Self::set) it. The closure runs
  /// with nothing borrowed, so it may read this observable.
  pub fn update(&self, f: impl FnOnce(&mut T)) {
    let mut value = self.get();
    f(&mut value);
    self.set(value);
  }

  /// Incremented once per value-changing write.
  #[inline]
  pub fn version(&self) -> u64 { self.inner.rc_deref().version }

  #[inline]
  pub fn subscriber_count(&self) -> usize { self.inner.rc_deref().subscribers.len() }

  pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> ValueSubscription<T> {
    let id = self.inner.rc_deref_mut().subscribers.add(Rc::new(callback));
    ValueSubscription { inner: self.inner.downgrade(), id }
  }

  fn notify(&self) {
    let (snapshot, value) = {
      let mut inner = self.inner.rc_deref_mut();
      (inner.subscribers.snapshot(), inner.value.clone())
    };
    broadcast(snapshot, &value, |id| self.inner.rc_deref().subscribers.contains(id));
  }
}

impl<T: Clone + PartialEq + 'static> Observable for ObservableValue<T> {
  type Item = T;

  #[inline]
  fn id(&self) -> ObservableId { self.id }

  #[inline]
  fn get(&self) -> T { ObservableValue::get(self) }

  fn observe(&self, callback: impl Fn(&T) + 'static) -> BoxedSubscription {
    BoxedSubscription::new(self.subscribe(callback))
  }

  fn writer(&self) -> Option<Writer<T>> {
    let this = self.clone();
    let write: Writer<T> = Rc::new(move |value| this.set(value));
    Some(write)
  }
}

/// Handle returned by [`ObservableValue::subscribe`].
///
/// Holds the observable weakly: an outstanding handle does not keep the
/// observable alive.
pub struct ValueSubscription<T> {
  inner: WeakMutRc<ValueInner<T>>,
  id: usize,
}

impl<T> Subscription for ValueSubscription<T> {
  fn unsubscribe(self) {
    if let Some(inner) = self.inner.upgrade() {
      inner.rc_deref_mut().subscribers.remove(self.id);
    }
  }

  fn is_closed(&self) -> bool {
    self
      .inner
      .upgrade()
      .map_or(true, |inner| !inner.rc_deref().subscribers.contains(self.id))
  }
}
