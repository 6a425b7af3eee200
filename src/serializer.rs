use serde::Serialize;
use tracing::warn;

/// Converts a value into its canonical string form.
///
/// The broker stores this form next to every cached value and the default
/// comparer checks it, so implementations must be deterministic: equal
/// inputs must always produce equal strings.
///
/// Any `Fn(&V) -> String` is a serializer, which lets a broker carry payloads
/// that do not implement [`Serialize`].
pub trait Serializer<V> {
  fn serialize(&self, value: &V) -> String;
}

impl<V, F> Serializer<V> for F
where
  F: Fn(&V) -> String,
{
  #[inline]
  fn serialize(&self, value: &V) -> String { self(value) }
}

/// The default serializer: compact JSON through `serde_json`.
///
/// A value that fails to serialize (a map with non-string keys, a `Serialize`
/// impl that errors) is logged and mapped to the empty string, so the
/// serializer stays total.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl<V: Serialize> Serializer<V> for JsonSerializer {
  fn serialize(&self, value: &V) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
      warn!(%err, "value could not be serialized to JSON");
      String::new()
    })
  }
}
