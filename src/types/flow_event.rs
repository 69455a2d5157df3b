//! Events a session emits to its observer.

use std::collections::BTreeMap;

use super::QuestionOption;
use crate::error::RuntimeAbort;

/// Events a session emits to its observer.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
  /// A message (or an end node's closing message) to show.
  MessagePresented { node_id: String, text: String },
  /// A question to ask; the session now waits for an answer.
  QuestionPresented {
    node_id: String,
    text: String,
    options: Vec<QuestionOption>,
    variable_name: String,
  },
  /// The session finished. `early_termination` is set when it stopped at a dead end
  /// instead of an end node.
  FlowCompleted {
    variables: BTreeMap<String, String>,
    early_termination: bool,
    end_node_id: Option<String>,
  },
  /// The session cannot continue.
  FlowAborted { reason: RuntimeAbort },
}

impl FlowEvent {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      FlowEvent::FlowCompleted { .. } | FlowEvent::FlowAborted { .. }
    )
  }
}

/// Receives events as a session produces them.
pub trait FlowObserver: Send {
  fn on_event(&mut self, event: &FlowEvent);
}

impl<F> FlowObserver for F
where
  F: FnMut(&FlowEvent) + Send,
{
  fn on_event(&mut self, event: &FlowEvent) {
    self(event)
  }
}
