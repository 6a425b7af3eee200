//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

pub use crate::{
  binding::{Direction, PublishOptions, SubscribeOptions, SyncOptions, Transform},
  comparer::{always_publish, by_value, comparer, CacheEntry, Comparer},
  config::PostboxConfig,
  error::PostboxError,
  ext::PostboxExt,
  observable::{Computed, Observable, ObservableId, ObservableValue, Writer},
  postbox::{Postbox, PostboxBuilder, TopicSubscription},
  serializer::{JsonSerializer, Serializer},
  subscription::{BoxedSubscription, Subscription, SubscriptionExt, SubscriptionGuard},
  topic::{IntoTopic, Topic},
};
