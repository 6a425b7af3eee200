//! The observable capability the postbox binds to.
//!
//! The broker only needs four things from a reactive value: read it, hear
//! about its changes through a disposable subscription, tell observables apart
//! and, for writable ones, write into it. [`Observable`] captures exactly
//! that. Two implementations ship with the crate:
//!
//! | Type | Writable | Description |
//! |------|----------|-------------|
//! | [`ObservableValue`] | yes | A plain value cell that notifies on change. |
//! | [`Computed`] | optional | A value derived from another observable. |
//!
//! Anything else (a UI model, a store slice, ...) can take part in topic
//! bindings by implementing the trait.

use std::{
  rc::Rc,
  sync::atomic::{AtomicU64, Ordering},
};

use crate::subscription::BoxedSubscription;

mod computed;
mod value;

pub use computed::{Computed, ComputedSubscription};
pub use value::{ObservableValue, ValueSubscription};

/// Writes a new value into a writable observable.
pub type Writer<T> = Rc<dyn Fn(T)>;

/// Process-unique identity of an observable.
///
/// Bindings are keyed by identity, not by value, so two observables holding
/// equal values still get independent bindings. Clones of one observable
/// handle share its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(u64);

impl ObservableId {
  /// Allocate a fresh identity. Never returns the same value twice.
  pub fn next() -> Self {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    Self(NEXT.fetch_add(1, Ordering::Relaxed))
  }
}

/// A reactive value the postbox can bind to a topic.
pub trait Observable {
  type Item;

  /// Identity used to key this observable's bindings.
  fn id(&self) -> ObservableId;

  /// The current value.
  fn get(&self) -> Self::Item;

  /// Register `callback` to run with the new value after every change.
  fn observe(&self, callback: impl Fn(&Self::Item) + 'static) -> BoxedSubscription;

  /// A writer for observables that accept external writes, `None` for
  /// read-only ones.
  fn writer(&self) -> Option<Writer<Self::Item>> { None }

  #[inline]
  fn is_writable(&self) -> bool { self.writer().is_some() }
}
