//! The topic broker.
//!
//! A [`Postbox`] owns three pieces of state:
//!
//! - the **topic cache**: the last value published on each topic, with its
//!   serialized form,
//! - the **subscriber registry**: callbacks per topic, in registration order,
//! - the **binding table**: the `publish_on` / `subscribe_to` bindings it has
//!   established between observables and topics.
//!
//! # Execution model
//!
//! Everything is synchronous and runs on the caller's thread. `publish`
//! updates the cache and then invokes every subscriber of the topic before
//! returning. A subscriber that publishes again re-enters the broker
//! immediately; nothing is queued or deferred. No borrow of broker state is
//! held while user code runs, so any re-entrant call is allowed.
//!
//! `Postbox` is `!Send`. Hosting one inside a multi-threaded program means
//! giving it a single owning thread and funnelling every operation through it.
//!
//! # Example
//!
//! ```rust
//! use postbox::prelude::*;
//!
//! let postbox = Postbox::<i32>::new();
//! let total = ObservableValue::new(1);
//! let mirror = ObservableValue::new(0);
//!
//! total.publish_on(&postbox, "total", PublishOptions::default());
//! mirror.subscribe_to(&postbox, "total", SubscribeOptions::new().initialize_with_latest_value());
//! assert_eq!(mirror.get(), 1);
//!
//! total.set(5);
//! assert_eq!(mirror.get(), 5);
//! assert_eq!(postbox.latest("total"), Some(5));
//! ```

use std::{
  any::Any,
  cell::{Cell, RefCell},
  collections::HashMap,
  fmt,
  rc::{Rc, Weak},
};

use serde::Serialize;
use tracing::{debug, error, trace};

use crate::{
  binding::{BindingKey, BindingTable, Direction, PublishOptions, SubscribeOptions, SyncOptions},
  cache::TopicCache,
  comparer::{is_duplicate, CacheEntry},
  config::PostboxConfig,
  error::PostboxError,
  observable::Observable,
  serializer::{JsonSerializer, Serializer},
  subscribers::{broadcast, Callback, Subscribers},
  subscription::{BoxedSubscription, Subscription},
  topic::{IntoTopic, Topic},
};

struct PostboxInner<V> {
  cache: RefCell<TopicCache<V>>,
  subscribers: RefCell<HashMap<Topic, Subscribers<V>>>,
  bindings: RefCell<BindingTable>,
  serializer: Box<dyn Serializer<V>>,
  config: PostboxConfig,
  depth: Cell<usize>,
}

/// An in-process topic broker with a last-value cache.
///
/// `Postbox` is a handle: clones share the same cache, subscribers and
/// bindings. Create one per scope that needs its own topic space (tests
/// typically create one per case).
pub struct Postbox<V> {
  inner: Rc<PostboxInner<V>>,
}

impl<V> Clone for Postbox<V> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<V> fmt::Debug for Postbox<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Postbox")
      .field("cached_topics", &self.inner.cache.borrow().len())
      .field("subscriber_registries", &self.inner.subscribers.borrow().len())
      .field("bindings", &self.inner.bindings.borrow().len())
      .field("config", &self.inner.config)
      .finish()
  }
}

impl<V> Postbox<V>
where
  V: Clone + PartialEq + Serialize + 'static,
{
  /// A broker comparing values through their JSON form.
  pub fn new() -> Self { Self::builder().build() }

  pub fn builder() -> PostboxBuilder<V> { PostboxBuilder::with_serializer(JsonSerializer) }
}

impl<V> Default for Postbox<V>
where
  V: Clone + PartialEq + Serialize + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<V: Clone + PartialEq + 'static> Postbox<V> {
  // ==================== Publish / Subscribe ====================

  /// Cache `value` as the latest on `topic`, then synchronously deliver it to
  /// every subscriber of `topic` in registration order.
  ///
  /// An empty or absent topic is ignored. The only possible error is
  /// [`PostboxError::FeedbackLoop`], when a dispatch depth limit is
  /// configured and this publish would exceed it.
  pub fn publish(&self, topic: impl IntoTopic, value: V) -> Result<(), PostboxError> {
    match topic.into_topic() {
      Some(topic) => self.inner.publish(&topic, value),
      None => {
        debug!("publish without a topic ignored");
        Ok(())
      }
    }
  }

  /// Register `callback` for every value published on `topic`.
  ///
  /// Returns `None`, registering nothing, for an empty or absent topic.
  pub fn subscribe(
    &self,
    topic: impl IntoTopic,
    callback: impl Fn(&V) + 'static,
  ) -> Option<TopicSubscription<V>> {
    let topic = topic.into_topic()?;
    Some(self.inner.add_subscriber(topic, Rc::new(callback), None))
  }

  /// Like [`subscribe`](Self::subscribe), with the callback bound to
  /// `target`.
  ///
  /// The broker holds `target` weakly: once it has been dropped the callback
  /// is no longer invoked and the registration is pruned.
  pub fn subscribe_with_target<T: 'static>(
    &self,
    topic: impl IntoTopic,
    target: &Rc<T>,
    callback: impl Fn(&T, &V) + 'static,
  ) -> Option<TopicSubscription<V>> {
    let topic = topic.into_topic()?;
    let weak = Rc::downgrade(target);
    let alive: Weak<dyn Any> = weak.clone();
    let callback = move |value: &V| {
      if let Some(target) = weak.upgrade() {
        callback(&target, value)
      }
    };
    Some(self.inner.add_subscriber(topic, Rc::new(callback), Some(alive)))
  }

  // ==================== Cache ====================

  /// The last value published on `topic`.
  pub fn latest(&self, topic: impl IntoTopic) -> Option<V> {
    self.cache_entry(topic).map(|entry| entry.value.clone())
  }

  /// The last value published on `topic`, with its serialized form.
  pub fn cache_entry(&self, topic: impl IntoTopic) -> Option<Rc<CacheEntry<V>>> {
    let topic = topic.into_topic()?;
    self.inner.cache.borrow().get(topic.as_str()).cloned()
  }

  /// `true` once something has been published on `topic`.
  pub fn has_topic(&self, topic: impl IntoTopic) -> bool {
    topic
      .into_topic()
      .is_some_and(|t| self.inner.cache.borrow().contains(t.as_str()))
  }

  /// Topics that have a cached value.
  pub fn topics(&self) -> Vec<Topic> { self.inner.cache.borrow().topics().cloned().collect() }

  /// Number of live subscribers on `topic`.
  pub fn subscriber_count(&self, topic: impl IntoTopic) -> usize {
    let Some(topic) = topic.into_topic() else { return 0 };
    let mut subscribers = self.inner.subscribers.borrow_mut();
    subscribers.get_mut(topic.as_str()).map_or(0, |subs| {
      subs.prune();
      subs.len()
    })
  }

  pub fn config(&self) -> PostboxConfig { self.inner.config }

  // ==================== Bindings ====================

  /// Publish every change of `observable` on `topic`, unless the comparer
  /// reports it as a duplicate of the cached value.
  ///
  /// Any earlier `publish_on` binding of the same observable and topic is
  /// disposed before the new one is attached. Unless `skip_initial` is set,
  /// the observable's current value is published once, right away.
  pub fn publish_on<O>(
    &self,
    observable: &O,
    topic: impl IntoTopic,
    options: PublishOptions<V>,
  ) where
    O: Observable<Item = V>,
  {
    let Some(topic) = topic.into_topic() else { return };
    let PublishOptions { skip_initial, comparer } = options;
    let key = BindingKey::new(observable.id(), topic.clone(), Direction::PublishOn);
    self.inner.dispose(&key);

    let weak = Rc::downgrade(&self.inner);
    let bound = topic.clone();
    let subscription = observable.observe(move |value: &V| {
      let Some(inner) = weak.upgrade() else { return };
      let entry = inner.cache.borrow().get(bound.as_str()).cloned();
      let duplicate = match &comparer {
        Some(comparer) => comparer(value, entry.as_deref()),
        None => is_duplicate(value, entry.as_deref(), &*inner.serializer),
      };
      if duplicate {
        trace!(topic = %bound, "duplicate publish suppressed");
      } else if let Err(err) = inner.publish(&bound, value.clone()) {
        error!(%err, "publish_on binding could not publish");
      }
    });

    self.inner.install(key, subscription);
    debug!(%topic, observable = ?observable.id(), skip_initial, "publish_on bound");

    if !skip_initial {
      if let Err(err) = self.inner.publish(&topic, observable.get()) {
        error!(%err, "publish_on initial publish failed");
      }
    }
  }

  /// Stop publishing `observable`'s changes on `topic`. Does nothing when no
  /// such binding exists.
  pub fn stop_publishing_on<O>(&self, observable: &O, topic: impl IntoTopic)
  where
    O: Observable<Item = V>,
  {
    if let Some(topic) = topic.into_topic() {
      self.inner.dispose(&BindingKey::new(observable.id(), topic, Direction::PublishOn));
    }
  }

  /// Write every value published on `topic` into `observable`, through the
  /// transform when one is given.
  ///
  /// A read-only observable is left unbound. Any earlier `subscribe_to`
  /// binding of the same observable and topic is disposed first. With
  /// `initialize_with_latest_value`, a cached value is written immediately.
  pub fn subscribe_to<O>(
    &self,
    observable: &O,
    topic: impl IntoTopic,
    options: SubscribeOptions<V>,
  ) where
    O: Observable<Item = V>,
  {
    let Some(topic) = topic.into_topic() else { return };
    let Some(write) = observable.writer() else {
      debug!(
        %topic,
        observable = ?observable.id(),
        "subscribe_to on a read-only observable ignored"
      );
      return;
    };
    let SubscribeOptions { initialize_with_latest_value, transform } = options;
    let key = BindingKey::new(observable.id(), topic.clone(), Direction::SubscribeTo);
    self.inner.dispose(&key);

    let deliver: Callback<V> = Rc::new(move |value: &V| match &transform {
      Some(transform) => write(transform(value)),
      None => write(value.clone()),
    });
    let subscription = self.inner.add_subscriber(topic.clone(), deliver.clone(), None);
    self.inner.install(key, BoxedSubscription::new(subscription));
    debug!(
      %topic,
      observable = ?observable.id(),
      initialize_with_latest_value,
      "subscribe_to bound"
    );

    if initialize_with_latest_value {
      let latest = self.inner.cache.borrow().get(topic.as_str()).cloned();
      if let Some(entry) = latest {
        deliver(&entry.value);
      }
    }
  }

  /// Stop writing `topic`'s values into `observable`. Does nothing when no
  /// such binding exists.
  pub fn unsubscribe_from<O>(&self, observable: &O, topic: impl IntoTopic)
  where
    O: Observable<Item = V>,
  {
    if let Some(topic) = topic.into_topic() {
      self.inner.dispose(&BindingKey::new(observable.id(), topic, Direction::SubscribeTo));
    }
  }

  /// Two-way binding: [`subscribe_to`](Self::subscribe_to) followed by
  /// [`publish_on`](Self::publish_on) on the same topic.
  ///
  /// An echo of the observable's own publish is written back as an equal
  /// value, which the observable swallows, so the round trip terminates.
  pub fn sync_with<O>(&self, observable: &O, topic: impl IntoTopic, options: SyncOptions<V>)
  where
    O: Observable<Item = V>,
  {
    let topic = topic.into_topic();
    let (subscribe, publish) = options.split();
    self.subscribe_to(observable, topic.clone(), subscribe);
    self.publish_on(observable, topic, publish);
  }

  /// Dispose every binding `observable` has on this broker.
  pub fn unbind_all<O>(&self, observable: &O)
  where
    O: Observable<Item = V>,
  {
    let taken = self.inner.bindings.borrow_mut().take_all(observable.id());
    if !taken.is_empty() {
      debug!(observable = ?observable.id(), count = taken.len(), "bindings disposed");
    }
    taken.into_iter().for_each(Subscription::unsubscribe);
  }

  /// `true` while `observable` has a live binding to `topic` in `direction`.
  pub fn is_bound<O>(&self, observable: &O, topic: impl IntoTopic, direction: Direction) -> bool
  where
    O: Observable<Item = V>,
  {
    topic.into_topic().is_some_and(|topic| {
      let key = BindingKey::new(observable.id(), topic, direction);
      self.inner.bindings.borrow().contains(&key)
    })
  }

  pub fn binding_count(&self) -> usize { self.inner.bindings.borrow().len() }
}

impl<V: Clone + 'static> PostboxInner<V> {
  fn publish(&self, topic: &Topic, value: V) -> Result<(), PostboxError> {
    let depth = self.depth.get();
    if let Some(max) = self.config.max_dispatch_depth {
      if depth > max {
        return Err(PostboxError::FeedbackLoop { topic: topic.clone(), depth: max });
      }
    }

    let serialized = self.serializer.serialize(&value);
    self
      .cache
      .borrow_mut()
      .insert(topic.clone(), CacheEntry { value: value.clone(), serialized });

    let snapshot = self
      .subscribers
      .borrow_mut()
      .get_mut(topic.as_str())
      .map(Subscribers::snapshot)
      .unwrap_or_default();
    trace!(%topic, subscribers = snapshot.len(), depth, "publish");

    let _depth = DepthGuard::enter(&self.depth);
    broadcast(snapshot, &value, |id| self.is_subscribed(topic, id));
    Ok(())
  }

  fn add_subscriber(
    self: &Rc<Self>,
    topic: Topic,
    callback: Callback<V>,
    target: Option<Weak<dyn Any>>,
  ) -> TopicSubscription<V> {
    let mut subscribers = self.subscribers.borrow_mut();
    let subs = subscribers.entry(topic.clone()).or_default();
    let id = match target {
      Some(target) => subs.add_with_target(callback, target),
      None => subs.add(callback),
    };
    TopicSubscription { postbox: Rc::downgrade(self), topic, id }
  }
}

impl<V> PostboxInner<V> {
  fn is_subscribed(&self, topic: &Topic, id: usize) -> bool {
    self
      .subscribers
      .borrow()
      .get(topic.as_str())
      .is_some_and(|subs| subs.contains(id))
  }

  /// The topic's registry stays in the map once empty: it carries the ID
  /// counter, and a fresh registry would hand out IDs that stale handles
  /// still refer to.
  fn remove_subscriber(&self, topic: &Topic, id: usize) {
    if let Some(subs) = self.subscribers.borrow_mut().get_mut(topic.as_str()) {
      subs.remove(id);
    }
  }

  /// Put `subscription` in the binding table. Callers dispose the previous
  /// binding under `key` first; anything still found there (rebound from
  /// inside the observer registration) is disposed here.
  fn install(&self, key: BindingKey, subscription: BoxedSubscription) {
    let displaced = self.bindings.borrow_mut().rebind(key, subscription);
    if let Some(old) = displaced {
      old.unsubscribe();
    }
  }

  fn dispose(&self, key: &BindingKey) {
    let taken = self.bindings.borrow_mut().take(key);
    if let Some(subscription) = taken {
      debug!(
        topic = %key.topic,
        observable = ?key.observable,
        direction = ?key.direction,
        "binding disposed"
      );
      subscription.unsubscribe();
    }
  }
}

impl<V> Drop for PostboxInner<V> {
  fn drop(&mut self) {
    for subscription in self.bindings.get_mut().drain() {
      subscription.unsubscribe();
    }
  }
}

/// Restores the dispatch depth on scope exit, unwinding included.
struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
  fn enter(depth: &'a Cell<usize>) -> Self {
    depth.set(depth.get() + 1);
    Self(depth)
  }
}

impl Drop for DepthGuard<'_> {
  fn drop(&mut self) { self.0.set(self.0.get() - 1); }
}

// ==================== TopicSubscription ====================

/// Handle returned by [`Postbox::subscribe`].
///
/// Holds the broker weakly; outliving the broker is harmless.
pub struct TopicSubscription<V> {
  postbox: Weak<PostboxInner<V>>,
  topic: Topic,
  id: usize,
}

impl<V> TopicSubscription<V> {
  #[inline]
  pub fn topic(&self) -> &Topic { &self.topic }
}

impl<V> Subscription for TopicSubscription<V> {
  fn unsubscribe(self) {
    if let Some(inner) = self.postbox.upgrade() {
      inner.remove_subscriber(&self.topic, self.id);
    }
  }

  fn is_closed(&self) -> bool {
    self
      .postbox
      .upgrade()
      .map_or(true, |inner| !inner.is_subscribed(&self.topic, self.id))
  }
}

impl<V> fmt::Debug for TopicSubscription<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TopicSubscription")
      .field("topic", &self.topic)
      .field("id", &self.id)
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

// ==================== Builder ====================

/// Configures and builds a [`Postbox`].
pub struct PostboxBuilder<V> {
  serializer: Box<dyn Serializer<V>>,
  config: PostboxConfig,
}

impl<V: Clone + PartialEq + 'static> PostboxBuilder<V> {
  /// Start from a custom serializer. This is the entry point for payloads
  /// that do not implement `Serialize`.
  pub fn with_serializer(serializer: impl Serializer<V> + 'static) -> Self {
    Self { serializer: Box::new(serializer), config: PostboxConfig::default() }
  }

  pub fn serializer(mut self, serializer: impl Serializer<V> + 'static) -> Self {
    self.serializer = Box::new(serializer);
    self
  }

  pub fn config(mut self, config: PostboxConfig) -> Self {
    self.config = config;
    self
  }

  /// Reject publishes nested deeper than `depth`.
  pub fn max_dispatch_depth(mut self, depth: usize) -> Self {
    self.config.max_dispatch_depth = Some(depth);
    self
  }

  pub fn build(self) -> Postbox<V> {
    Postbox {
      inner: Rc::new(PostboxInner {
        cache: RefCell::default(),
        subscribers: RefCell::default(),
        bindings: RefCell::default(),
        serializer: self.serializer,
        config: self.config,
        depth: Cell::new(0),
      }),
    }
  }
}
