//! Lifecycle state of a flow session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a flow session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
  /// No flow loaded.
  #[default]
  Idle,
  /// Advancing through non-question nodes.
  Running,
  /// Paused at a question node.
  AwaitingInput,
  /// Reached an end node or a dead end.
  Completed,
  /// Stopped by a runtime abort.
  Aborted,
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SessionState::Idle => write!(f, "idle"),
      SessionState::Running => write!(f, "running"),
      SessionState::AwaitingInput => write!(f, "awaiting_input"),
      SessionState::Completed => write!(f, "completed"),
      SessionState::Aborted => write!(f, "aborted"),
    }
  }
}
