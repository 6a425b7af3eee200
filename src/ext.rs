//! Method-call sugar for bindings.
//!
//! Every observable gets `publish_on`, `subscribe_to` and friends as methods,
//! each forwarding to the [`Postbox`] passed in and returning the observable
//! so calls chain:
//!
//! ```rust
//! use postbox::prelude::*;
//!
//! let postbox = Postbox::<String>::new();
//! let name = ObservableValue::new("ada".to_string());
//! name
//!   .publish_on(&postbox, "name", PublishOptions::default())
//!   .subscribe_to(&postbox, "name.reset", SubscribeOptions::default());
//!
//! assert_eq!(postbox.latest("name").as_deref(), Some("ada"));
//! ```

use crate::{
  binding::{PublishOptions, SubscribeOptions, SyncOptions},
  observable::Observable,
  postbox::Postbox,
  topic::IntoTopic,
};

pub trait PostboxExt: Observable + Sized
where
  Self::Item: Clone + PartialEq + 'static,
{
  /// See [`Postbox::publish_on`].
  fn publish_on(
    &self,
    postbox: &Postbox<Self::Item>,
    topic: impl IntoTopic,
    options: PublishOptions<Self::Item>,
  ) -> &Self {
    postbox.publish_on(self, topic, options);
    self
  }

  /// See [`Postbox::stop_publishing_on`].
  fn stop_publishing_on(&self, postbox: &Postbox<Self::Item>, topic: impl IntoTopic) -> &Self {
    postbox.stop_publishing_on(self, topic);
    self
  }

  /// See [`Postbox::subscribe_to`].
  fn subscribe_to(
    &self,
    postbox: &Postbox<Self::Item>,
    topic: impl IntoTopic,
    options: SubscribeOptions<Self::Item>,
  ) -> &Self {
    postbox.subscribe_to(self, topic, options);
    self
  }

  /// See [`Postbox::unsubscribe_from`].
  fn unsubscribe_from(&self, postbox: &Postbox<Self::Item>, topic: impl IntoTopic) -> &Self {
    postbox.unsubscribe_from(self, topic);
    self
  }

  /// See [`Postbox::sync_with`].
  fn sync_with(
    &self,
    postbox: &Postbox<Self::Item>,
    topic: impl IntoTopic,
    options: SyncOptions<Self::Item>,
  ) -> &Self {
    postbox.sync_with(self, topic, options);
    self
  }
}

impl<O> PostboxExt for O
where
  O: Observable,
  O::Item: Clone + PartialEq + 'static,
{
}
