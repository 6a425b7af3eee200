//! # postbox: topic broker for reactive values
//!
//! An in-process publish/subscribe broker with a last-value cache, plus
//! bindings that connect observables to named topics.
//!
//! ## Quick Start
//!
//! ```rust
//! use postbox::prelude::*;
//!
//! let postbox = Postbox::<u32>::new();
//! let seen = ObservableValue::new(0);
//!
//! let sub = postbox.subscribe("count", |v| println!("count is {v}"));
//! seen.subscribe_to(&postbox, "count", SubscribeOptions::default());
//!
//! postbox.publish("count", 3).unwrap();
//! assert_eq!(seen.get(), 3);
//! assert_eq!(postbox.latest("count"), Some(3));
//! sub.unsubscribe();
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Postbox`] | The broker: topic cache, subscribers and bindings |
//! | [`Observable`] | What a binding needs from a reactive value |
//! | [`PostboxExt`] | `publish_on` / `subscribe_to` / `sync_with` as methods |
//! | [`Subscription`] | Handle to remove a registration |
//!
//! Everything runs synchronously on the caller's thread; see the
//! [`postbox`](mod@postbox) module for the execution model.
//!
//! [`Postbox`]: postbox::Postbox
//! [`Observable`]: observable::Observable
//! [`PostboxExt`]: ext::PostboxExt
//! [`Subscription`]: subscription::Subscription

pub mod binding;
pub mod cache;
pub mod comparer;
pub mod config;
pub mod error;
pub mod ext;
pub mod observable;
pub mod postbox;
pub mod prelude;
pub mod rc;
pub mod serializer;
pub mod subscribers;
pub mod subscription;
pub mod topic;

// Re-export the prelude module
pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
