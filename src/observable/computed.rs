use std::{fmt, rc::Rc};

use super::{Observable, ObservableId, Writer};
use crate::{
  rc::{MutRc, RcDeref, RcDerefMut, WeakMutRc},
  subscribers::{broadcast, Subscribers},
  subscription::{BoxedSubscription, Subscription},
};

struct ComputedInner<T> {
  value: T,
  subscribers: Subscribers<T>,
  source: Option<BoxedSubscription>,
}

impl<T> Drop for ComputedInner<T> {
  fn drop(&mut self) {
    if let Some(source) = self.source.take() {
      source.unsubscribe();
    }
  }
}

/// A value derived from another observable.
///
/// The derived value is recomputed eagerly whenever the source changes and
/// subscribers are notified only when the result differs from the previous
/// one. A `Computed` is read-only unless it was built with
/// [`Computed::writable`], in which case writes are routed through the
/// supplied write function (typically back into the source).
pub struct Computed<T> {
  id: ObservableId,
  inner: MutRc<ComputedInner<T>>,
  write: Option<Writer<T>>,
}

impl<T> Clone for Computed<T> {
  fn clone(&self) -> Self {
    Self { id: self.id, inner: self.inner.clone(), write: self.write.clone() }
  }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = self.inner.rc_deref();
    f.debug_struct("Computed")
      .field("id", &self.id)
      .field("value", &inner.value)
      .field("writable", &self.write.is_some())
      .finish()
  }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
  /// A read-only value computed from `source` with `read`.
  pub fn new<S>(source: &S, read: impl Fn(&S::Item) -> T + 'static) -> Self
  where
    S: Observable,
  {
    let inner = MutRc::own(ComputedInner {
      value: read(&source.get()),
      subscribers: Subscribers::new(),
      source: None,
    });

    let weak = inner.downgrade();
    let sub = source.observe(move |s| {
      if let Some(inner) = weak.upgrade() {
        Self::recompute(&inner, read(s));
      }
    });
    inner.rc_deref_mut().source = Some(sub);

    Self { id: ObservableId::next(), inner, write: None }
  }

  /// A computed value that also accepts writes, forwarding them to `write`.
  pub fn writable<S>(
    source: &S,
    read: impl Fn(&S::Item) -> T + 'static,
    write: impl Fn(T) + 'static,
  ) -> Self
  where
    S: Observable,
  {
    Self { write: Some(Rc::new(write)), ..Self::new(source, read) }
  }

  #[inline]
  pub fn get(&self) -> T { self.inner.rc_deref().value.clone() }

  /// Write through to the source. Ignored for a read-only `Computed`.
  pub fn set(&self, value: T) {
    if let Some(write) = &self.write {
      write(value);
    }
  }

  #[inline]
  pub fn subscriber_count(&self) -> usize { self.inner.rc_deref().subscribers.len() }

  pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> ComputedSubscription<T> {
    let id = self.inner.rc_deref_mut().subscribers.add(Rc::new(callback));
    ComputedSubscription { inner: self.inner.downgrade(), id }
  }

  fn recompute(inner: &MutRc<ComputedInner<T>>, value: T) {
    let snapshot = {
      let mut guard = inner.rc_deref_mut();
      if guard.value == value {
        return;
      }
      guard.value = value.clone();
      guard.subscribers.snapshot()
    };
    broadcast(snapshot, &value, |id| inner.rc_deref().subscribers.contains(id));
  }
}

impl<T: Clone + PartialEq + 'static> Observable for Computed<T> {
  type Item = T;

  #[inline]
  fn id(&self) -> ObservableId { self.id }

  #[inline]
  fn get(&self) -> T { Computed::get(self) }

  fn observe(&self, callback: impl Fn(&T) + 'static) -> BoxedSubscription {
    BoxedSubscription::new(self.subscribe(callback))
  }

  fn writer(&self) -> Option<Writer<T>> { self.write.clone() }
}

/// Handle returned by [`Computed::subscribe`].
pub struct ComputedSubscription<T> {
  inner: WeakMutRc<ComputedInner<T>>,
  id: usize,
}

impl<T> Subscription for ComputedSubscription<T> {
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

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;
  use crate::observable::ObservableValue;

  #[test]
  fn follows_source() {
    let source = ObservableValue::new(2);
    let doubled = Computed::new(&source, |v: &i32| v * 2);
    assert_eq!(doubled.get(), 4);

    source.set(5);
    assert_eq!(doubled.get(), 10);
  }

  #[test]
  fn notifies_only_on_derived_change() {
    let source = ObservableValue::new(1);
    let parity = Computed::new(&source, |v: &i32| v % 2);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    let _sub = parity.subscribe(move |v| s.borrow_mut().push(*v));

    source.set(3);
    source.set(4);
    source.set(6);
    source.set(7);
    assert_eq!(*seen.borrow(), vec![0, 1]);
  }

  #[test]
  fn read_only_by_default() {
    let source = ObservableValue::new(1);
    let c = Computed::new(&source, |v: &i32| *v);
    assert!(!c.is_writable());

    c.set(9);
    assert_eq!(source.get(), 1);
  }

  #[test]
  fn writable_routes_to_source() {
    let celsius = ObservableValue::new(100.0_f64);
    let sink = celsius.clone();
    let fahrenheit = Computed::writable(
      &celsius,
      |c: &f64| c * 9.0 / 5.0 + 32.0,
      move |f: f64| sink.set((f - 32.0) * 5.0 / 9.0),
    );
    assert!(fahrenheit.is_writable());
    assert_eq!(fahrenheit.get(), 212.0);

    fahrenheit.writer().unwrap()(32.0);
    assert_eq!(celsius.get(), 0.0);
    assert_eq!(fahrenheit.get(), 32.0);
  }

  #[test]
  fn dropping_computed_releases_source() {
    let source = ObservableValue::new(0);
    let c = Computed::new(&source, |v: &i32| *v);
    assert_eq!(source.subscriber_count(), 1);
    drop(c);
    assert_eq!(source.subscriber_count(), 0);
  }
}
