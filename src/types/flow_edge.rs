//! A directed edge between two flow nodes.

use serde::{Deserialize, Serialize};

/// A directed edge between two flow nodes.
///
/// `source_handle` labels the branch on edges leaving condition nodes (`"true"`, `"false"`
/// or a multi-output value). It is ignored for every other source kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
}

impl FlowEdge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
    }
  }

  pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
    self.source_handle = Some(handle.into());
    self
  }

  /// Handle as a plain str, for comparisons.
  pub fn handle(&self) -> Option<&str> {
    self.source_handle.as_deref()
  }
}
