//! Per-session record of execution steps, for debugging and tests.

use serde::{Deserialize, Serialize};

use super::NodeKind;

/// What happened in one trace step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
  SessionStarted {
    start_node_id: String,
  },
  NodeEntered {
    node_id: String,
    kind: NodeKind,
  },
  RuleEvaluated {
    node_id: String,
    field: String,
    operator: String,
    operand: String,
    actual: Option<String>,
    result: bool,
  },
  RuleSetEvaluated {
    node_id: String,
    /// Multi-output value the rule set belongs to; `None` for simple conditions.
    output: Option<String>,
    result: bool,
  },
  GuardRejected {
    source_id: String,
    target_id: String,
    handle: Option<String>,
    expected: String,
  },
  EdgeResolved {
    source_id: String,
    target_id: String,
    handle: Option<String>,
  },
  AnswerCommitted {
    node_id: String,
    variable: String,
    value: String,
  },
  Suspended {
    node_id: String,
  },
  Completed {
    early_termination: bool,
  },
  Aborted {
    reason: String,
  },
}

/// One numbered trace step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
  /// 1-based step index.
  pub step: u32,
  #[serde(flatten)]
  pub event: TraceEvent,
}

/// Per-session record of execution steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
  /// Log format version.
  pub version: u32,
  pub session_id: String,
  /// RFC 3339 timestamp of `start`.
  pub started_at: Option<String>,
  /// RFC 3339 timestamp of completion or abort.
  pub finished_at: Option<String>,
  pub entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
  pub const VERSION: u32 = 1;

  pub fn new(session_id: impl Into<String>) -> Self {
    Self {
      version: Self::VERSION,
      session_id: session_id.into(),
      started_at: None,
      finished_at: None,
      entries: vec![],
    }
  }

  pub fn push(&mut self, event: TraceEvent) {
    let step = self.entries.len() as u32 + 1;
    self.entries.push(TraceEntry { step, event });
  }

  pub fn extend(&mut self, events: impl IntoIterator<Item = TraceEvent>) {
    for e in events {
      self.push(e);
    }
  }

  /// Node ids in the order they were entered.
  pub fn entered_nodes(&self) -> Vec<&str> {
    self
      .entries
      .iter()
      .filter_map(|e| match &e.event {
        TraceEvent::NodeEntered { node_id, .. } => Some(node_id.as_str()),
        _ => None,
      })
      .collect()
  }
}
