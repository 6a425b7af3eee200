use thiserror::Error;

use crate::topic::Topic;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostboxError {
  /// A publish chain nested deeper than the configured maximum. Usually a
  /// two-way binding whose halves keep disagreeing, so each echo re-triggers
  /// the other side.
  #[error("publish on topic `{topic}` exceeded the dispatch depth limit of {depth}")]
  FeedbackLoop { topic: Topic, depth: usize },
}
