//! End-to-end behaviour of the postbox: publish/subscribe with the cache and
//! the observable binding protocol.

use std::{cell::RefCell, rc::Rc};

use postbox::prelude::*;
use serde::Serialize;

fn recorder<V: Clone + 'static>() -> (Rc<RefCell<Vec<V>>>, impl Fn(&V) + 'static) {
  let log = Rc::new(RefCell::new(Vec::new()));
  let sink = log.clone();
  (log, move |v: &V| sink.borrow_mut().push(v.clone()))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Cart {
  items: Vec<String>,
  total: u32,
}

fn cart(items: &[&str], total: u32) -> Cart {
  Cart { items: items.iter().map(|s| s.to_string()).collect(), total }
}

#[test]
fn late_subscriber_sees_only_later_publishes() {
  let postbox = Postbox::<i32>::new();
  postbox.publish("t", 1).unwrap();

  let (log, sink) = recorder::<i32>();
  postbox.subscribe("t", sink);
  postbox.publish("t", 2).unwrap();

  assert_eq!(*log.borrow(), vec![2]);
}

#[test]
fn cache_holds_latest_value_and_its_serialized_form() {
  let postbox = Postbox::<Cart>::new();
  let value = cart(&["apple"], 3);
  postbox.publish("cart", value.clone()).unwrap();
  postbox.publish("cart", cart(&["apple", "pear"], 5)).unwrap();

  let entry = postbox.cache_entry("cart").unwrap();
  assert_eq!(entry.value, cart(&["apple", "pear"], 5));
  assert_eq!(entry.serialized, serde_json::to_string(&entry.value).unwrap());
  assert_ne!(entry.serialized, serde_json::to_string(&value).unwrap());
}

#[test]
fn publish_on_suppresses_values_equal_to_the_cache() {
  let postbox = Postbox::<Cart>::new();
  let (log, sink) = recorder::<Cart>();
  postbox.subscribe("cart", sink);

  let model = ObservableValue::new(cart(&[], 0));
  model.publish_on(&postbox, "cart", PublishOptions::default());
  assert_eq!(log.borrow().len(), 1);

  // Another publisher moves the topic on; bringing the model to the same
  // value must not publish again.
  postbox.publish("cart", cart(&["fig"], 2)).unwrap();
  model.set(cart(&["fig"], 2));
  assert_eq!(log.borrow().len(), 2);

  model.set(cart(&["fig", "kiwi"], 4));
  assert_eq!(log.borrow().len(), 3);
  assert_eq!(log.borrow()[2], cart(&["fig", "kiwi"], 4));
}

#[test]
fn publish_on_publishes_current_value_before_returning() {
  let postbox = Postbox::<String>::new();
  let (log, sink) = recorder::<String>();
  postbox.subscribe("greeting", sink);

  let greeting = ObservableValue::new("hello".to_string());
  greeting.publish_on(&postbox, "greeting", PublishOptions::default());

  assert_eq!(*log.borrow(), vec!["hello".to_string()]);
}

#[test]
fn subscribe_to_initializes_from_cache_through_transform() {
  let postbox = Postbox::<String>::new();
  postbox.publish("name", "grace".to_string()).unwrap();

  let plain = ObservableValue::new(String::new());
  let shouted = ObservableValue::new(String::new());
  plain.subscribe_to(&postbox, "name", SubscribeOptions::new().initialize_with_latest_value());
  shouted.subscribe_to(
    &postbox,
    "name",
    SubscribeOptions::new()
      .initialize_with_latest_value()
      .transform(|s: &String| s.to_uppercase()),
  );
  assert_eq!(plain.get(), "grace");
  assert_eq!(shouted.get(), "GRACE");

  postbox.publish("name", "ada".to_string()).unwrap();
  assert_eq!(plain.get(), "ada");
  assert_eq!(shouted.get(), "ADA");
}

#[test]
fn subscribe_to_without_initialize_waits_for_next_publish() {
  let postbox = Postbox::<i32>::new();
  postbox.publish("n", 1).unwrap();

  let value = ObservableValue::new(0);
  value.subscribe_to(&postbox, "n", SubscribeOptions::default());
  assert_eq!(value.get(), 0);

  postbox.publish("n", 2).unwrap();
  assert_eq!(value.get(), 2);
}

#[test]
fn rebinding_keeps_a_single_forward_binding() {
  let postbox = Postbox::<i32>::new();
  let (log, sink) = recorder::<i32>();
  postbox.subscribe("n", sink);

  let value = ObservableValue::new(0);
  value
    .publish_on(&postbox, "n", PublishOptions::new().skip_initial())
    .publish_on(&postbox, "n", PublishOptions::new().skip_initial());

  value.set(1);
  value.set(2);
  assert_eq!(*log.borrow(), vec![1, 2]);
  assert_eq!(postbox.binding_count(), 1);
}

#[test]
fn rebinding_subscribe_to_replaces_the_transform() {
  let postbox = Postbox::<i32>::new();
  let value = ObservableValue::new(0);
  value.subscribe_to(&postbox, "n", SubscribeOptions::new().transform(|v: &i32| v + 1));
  value.subscribe_to(&postbox, "n", SubscribeOptions::new().transform(|v: &i32| v + 100));
  assert_eq!(postbox.subscriber_count("n"), 1);

  postbox.publish("n", 1).unwrap();
  assert_eq!(value.get(), 101);
}

#[test]
fn disposed_bindings_stop_flowing() {
  let postbox = Postbox::<i32>::new();
  let (log, sink) = recorder::<i32>();
  postbox.subscribe("out", sink);

  let value = ObservableValue::new(0);
  value
    .publish_on(&postbox, "out", PublishOptions::new().skip_initial())
    .subscribe_to(&postbox, "in", SubscribeOptions::default());
  value.set(1);

  value
    .stop_publishing_on(&postbox, "out")
    .unsubscribe_from(&postbox, "in");
  value.set(2);
  postbox.publish("in", 3).unwrap();

  assert_eq!(*log.borrow(), vec![1]);
  assert_eq!(value.get(), 2);

  // Disposing again, or disposing what never existed, is harmless.
  value
    .stop_publishing_on(&postbox, "out")
    .unsubscribe_from(&postbox, "never");
}

#[test]
fn sync_with_round_trip_converges() {
  let postbox = Postbox::<i32>::new();
  let a = ObservableValue::new(0);
  let b = ObservableValue::new(0);
  a.sync_with(&postbox, "shared", SyncOptions::default());
  b.subscribe_to(&postbox, "shared", SubscribeOptions::default());

  let (log, sink) = recorder::<i32>();
  postbox.subscribe("shared", sink);

  a.set(7);
  assert_eq!(postbox.latest("shared"), Some(7));
  assert_eq!(b.get(), 7);
  assert_eq!(a.get(), 7);
  // The echo written back into `a` is suppressed, so the topic sees one
  // publish.
  assert_eq!(*log.borrow(), vec![7]);
}

/// A writable observable that notifies on every write, equal or not, the way
/// observables holding objects do.
#[derive(Clone)]
struct Eager {
  id: ObservableId,
  value: Rc<RefCell<i32>>,
  observers: Rc<RefCell<Vec<Option<Rc<dyn Fn(&i32)>>>>>,
}

struct EagerSubscription {
  observers: Rc<RefCell<Vec<Option<Rc<dyn Fn(&i32)>>>>>,
  slot: usize,
}

impl Subscription for EagerSubscription {
  fn unsubscribe(self) { self.observers.borrow_mut()[self.slot] = None; }

  fn is_closed(&self) -> bool { self.observers.borrow()[self.slot].is_none() }
}

impl Eager {
  fn new(value: i32) -> Self {
    Self { id: ObservableId::next(), value: Rc::new(RefCell::new(value)), observers: Rc::default() }
  }

  fn set(&self, value: i32) {
    *self.value.borrow_mut() = value;
    let observers: Vec<_> = self.observers.borrow().iter().flatten().cloned().collect();
    for observer in observers {
      observer(&value);
    }
  }
}

impl Observable for Eager {
  type Item = i32;

  fn id(&self) -> ObservableId { self.id }

  fn get(&self) -> i32 { *self.value.borrow() }

  fn observe(&self, callback: impl Fn(&i32) + 'static) -> BoxedSubscription {
    let callback: Rc<dyn Fn(&i32)> = Rc::new(callback);
    let mut observers = self.observers.borrow_mut();
    observers.push(Some(callback));
    let subscription =
      EagerSubscription { observers: self.observers.clone(), slot: observers.len() - 1 };
    BoxedSubscription::new(subscription)
  }

  fn writer(&self) -> Option<Writer<i32>> {
    let this = self.clone();
    let write: Writer<i32> = Rc::new(move |value| this.set(value));
    Some(write)
  }
}

#[test]
fn sync_with_comparer_suppresses_the_echo() {
  let postbox = Postbox::<i32>::new();
  let (log, sink) = recorder::<i32>();
  postbox.subscribe("shared", sink);

  let eager = Eager::new(0);
  eager.sync_with(&postbox, "shared", SyncOptions::new().skip_initial());

  // The echo is written back and re-notified; only the comparer stops it.
  eager.set(7);
  assert_eq!(*log.borrow(), vec![7]);
  assert_eq!(eager.get(), 7);

  eager.set(7);
  assert_eq!(*log.borrow(), vec![7]);

  postbox.unsubscribe_from(&eager, "shared");
  postbox.stop_publishing_on(&eager, "shared");
  eager.set(8);
  assert_eq!(*log.borrow(), vec![7]);
}

#[test]
fn two_synced_observables_follow_each_other() {
  let postbox = Postbox::<Cart>::new();
  let left = ObservableValue::new(cart(&[], 0));
  let right = ObservableValue::new(cart(&["x"], 1));
  left.sync_with(&postbox, "cart", SyncOptions::default());
  let options = SyncOptions::new().initialize_with_latest_value().skip_initial();
  right.sync_with(&postbox, "cart", options);
  assert_eq!(right.get(), cart(&[], 0));

  right.update(|c| {
    c.items.push("plum".to_string());
    c.total += 9;
  });
  assert_eq!(left.get(), cart(&["plum"], 9));

  left.set(cart(&[], 0));
  assert_eq!(right.get(), cart(&[], 0));
}

#[test]
fn empty_topics_are_no_ops() {
  let postbox = Postbox::<i32>::new();
  postbox.publish("", 1).unwrap();
  postbox.publish(None::<&str>, 1).unwrap();
  assert!(postbox.subscribe(None::<String>, |_| panic!("never called")).is_none());
  assert!(postbox.subscribe("", |_| panic!("never called")).is_none());
  assert!(postbox.topics().is_empty());

  let value = ObservableValue::new(1);
  value
    .publish_on(&postbox, "", PublishOptions::default())
    .subscribe_to(&postbox, "", SubscribeOptions::default())
    .sync_with(&postbox, None::<&str>, SyncOptions::default());
  assert_eq!(postbox.binding_count(), 0);
  assert!(postbox.topics().is_empty());
}

#[test]
fn computed_publishes_derived_values() {
  let postbox = Postbox::<u32>::new();
  let items = ObservableValue::new(vec![1u32, 2, 3]);
  let total = Computed::new(&items, |v: &Vec<u32>| v.iter().sum::<u32>());
  total.publish_on(&postbox, "total", PublishOptions::default());
  assert_eq!(postbox.latest("total"), Some(6));

  items.update(|v| v.push(4));
  assert_eq!(postbox.latest("total"), Some(10));
}

#[test]
fn writable_computed_accepts_topic_values() {
  let postbox = Postbox::<String>::new();
  let celsius = ObservableValue::new(20.0_f64);
  let write_to = celsius.clone();
  let label = Computed::writable(
    &celsius,
    |c: &f64| format!("{c}"),
    move |s: String| {
      if let Ok(c) = s.parse() {
        write_to.set(c)
      }
    },
  );
  label.subscribe_to(&postbox, "temperature", SubscribeOptions::default());

  postbox.publish("temperature", "31.5".to_string()).unwrap();
  assert_eq!(celsius.get(), 31.5);
  assert_eq!(label.get(), "31.5");
}

#[test]
fn feedback_loop_is_reported_when_guarded() {
  let postbox = Postbox::<i32>::builder().max_dispatch_depth(8).build();
  let value = ObservableValue::new(0);
  // A transform that never settles keeps republishing its own echo.
  value
    .subscribe_to(&postbox, "loop", SubscribeOptions::new().transform(|v: &i32| v + 1))
    .publish_on(&postbox, "loop", PublishOptions::new().skip_initial());

  value.set(1);
  let reached = postbox.latest("loop").unwrap();
  assert!(reached > 1);
  assert!(reached <= 1 + 9);
  assert_eq!(postbox.config().max_dispatch_depth, Some(8));
}
