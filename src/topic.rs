use std::{borrow::Borrow, fmt, rc::Rc};

/// A non-empty topic name.
///
/// `Topic` is a cheap-to-clone handle (`Rc<str>`), so the broker can key its
/// cache, its subscriber lists and its binding table by the same name without
/// copying the string around.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(Rc<str>);

impl Topic {
  /// Returns `None` for an empty name.
  pub fn new(name: &str) -> Option<Self> {
    if name.is_empty() { None } else { Some(Self(Rc::from(name))) }
  }

  #[inline]
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Debug for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", &*self.0) }
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl Borrow<str> for Topic {
  #[inline]
  fn borrow(&self) -> &str { &self.0 }
}

impl AsRef<str> for Topic {
  #[inline]
  fn as_ref(&self) -> &str { &self.0 }
}

/// Conversion into an optional [`Topic`].
///
/// Every broker entry point accepts `impl IntoTopic`. Empty strings and `None`
/// convert to `None`, which the broker treats as "do nothing".
pub trait IntoTopic {
  fn into_topic(self) -> Option<Topic>;
}

impl IntoTopic for Topic {
  #[inline]
  fn into_topic(self) -> Option<Topic> { Some(self) }
}

impl IntoTopic for &Topic {
  #[inline]
  fn into_topic(self) -> Option<Topic> { Some(self.clone()) }
}

impl IntoTopic for &str {
  #[inline]
  fn into_topic(self) -> Option<Topic> { Topic::new(self) }
}

impl IntoTopic for String {
  #[inline]
  fn into_topic(self) -> Option<Topic> { Topic::new(&self) }
}

impl IntoTopic for &String {
  #[inline]
  fn into_topic(self) -> Option<Topic> { Topic::new(self) }
}

impl<T: IntoTopic> IntoTopic for Option<T> {
  #[inline]
  fn into_topic(self) -> Option<Topic> { self.and_then(IntoTopic::into_topic) }
}
