/// Tunables for a [`Postbox`](crate::postbox::Postbox).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostboxConfig {
  /// Upper bound on nested publishes (a publish issued from inside a
  /// subscriber callback, directly or through a binding). `None` leaves
  /// re-entrant recursion unguarded.
  pub max_dispatch_depth: Option<usize>,
}

impl PostboxConfig {
  pub fn new() -> Self { Self::default() }

  pub fn max_dispatch_depth(mut self, depth: usize) -> Self {
    self.max_dispatch_depth = Some(depth);
    self
  }
}
