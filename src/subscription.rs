//! Disposable subscription handles.
//!
//! Every registration in this crate (a callback on an observable, a callback
//! on a topic, a binding between the two) hands back something implementing
//! [`Subscription`]. Disposal is explicit: dropping a handle does **not**
//! unsubscribe. Call [`SubscriptionExt::unsubscribe_when_dropped`] to opt
//! into RAII behaviour.

use std::fmt;

/// A handle to an active registration.
pub trait Subscription {
  /// Removes the registration. No further callback invocations happen
  /// through this handle once it returns; an invocation already running is
  /// not interrupted.
  fn unsubscribe(self);

  /// `true` once the registration has been removed, or its source is gone.
  fn is_closed(&self) -> bool;
}

/// The unit subscription: nothing to dispose, always closed.
impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<S: Subscription> Subscription for Option<S> {
  #[inline]
  fn unsubscribe(self) {
    if let Some(s) = self {
      s.unsubscribe()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, Subscription::is_closed) }
}

// ==================== BoxedSubscription ====================

/// Helper trait for calling unsubscribe on boxed trait objects.
///
/// `Subscription::unsubscribe(self)` requires `Sized`, so the boxed form goes
/// through `self: Box<Self>` instead.
pub trait BoxedSubscriptionInner {
  fn boxed_unsubscribe(self: Box<Self>);
  fn boxed_is_closed(&self) -> bool;
}

impl<T: Subscription> BoxedSubscriptionInner for T {
  #[inline]
  fn boxed_unsubscribe(self: Box<Self>) { (*self).unsubscribe() }

  #[inline]
  fn boxed_is_closed(&self) -> bool { self.is_closed() }
}

/// A type-erased subscription.
///
/// Lets heterogeneous handles (observable subscriptions, topic subscriptions)
/// live in one collection, which is how the binding table stores them.
pub struct BoxedSubscription(Box<dyn BoxedSubscriptionInner>);

impl BoxedSubscription {
  #[inline]
  pub fn new(subscription: impl Subscription + 'static) -> Self { Self(Box::new(subscription)) }
}

impl Subscription for BoxedSubscription {
  #[inline]
  fn unsubscribe(self) { self.0.boxed_unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.boxed_is_closed() }
}

impl fmt::Debug for BoxedSubscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BoxedSubscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

// ==================== SubscriptionGuard ====================

/// An RAII guard: the wrapped subscription is unsubscribed when the guard is
/// dropped.
///
/// If you don't bind the guard to a variable it is dropped immediately, which
/// is probably not what you want.
#[must_use]
pub struct SubscriptionGuard<S: Subscription>(Option<S>);

impl<S: Subscription> SubscriptionGuard<S> {
  pub fn new(subscription: S) -> Self { Self(Some(subscription)) }

  pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<S: Subscription> Drop for SubscriptionGuard<S> {
  fn drop(&mut self) {
    if let Some(s) = self.0.take() {
      s.unsubscribe();
    }
  }
}

impl<S: Subscription> fmt::Debug for SubscriptionGuard<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SubscriptionGuard")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// Convenience methods available on every subscription.
pub trait SubscriptionExt: Subscription + Sized {
  /// Activates RAII behaviour for this subscription.
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard::new(self) }

  /// Erases the concrete subscription type.
  fn into_boxed(self) -> BoxedSubscription
  where
    Self: 'static,
  {
    BoxedSubscription::new(self)
  }
}

impl<S: Subscription> SubscriptionExt for S {}
