//! Error taxonomy for graph loading, session execution and caller misuse.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SessionState;

/// Structural problem found while building a [FlowGraph](crate::types::FlowGraph).
///
/// Detected once at load time; a graph that constructed successfully never
/// produces one of these during traversal except `NodeNotFound` when a caller
/// hands the interpreter a snapshot that does not belong to the graph.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphError {
  #[error("Flow must have exactly one start node, found none")]
  MissingStartNode,

  #[error("Flow must have exactly one start node, found {count}")]
  MultipleStartNodes { count: usize },

  #[error("Node id '{node_id}' is used more than once")]
  DuplicateNodeId { node_id: String },

  #[error("Edge id '{edge_id}' is used more than once")]
  DuplicateEdgeId { edge_id: String },

  #[error("Edge '{edge_id}' references missing node '{node_id}'")]
  DanglingEdge { edge_id: String, node_id: String },

  #[error("Edge '{edge_id}' leaves condition node '{node_id}' with invalid handle {handle:?}")]
  InvalidHandle {
    node_id: String,
    edge_id: String,
    handle: Option<String>,
  },

  #[error("Condition node '{node_id}' has more than one edge on handle '{handle}'")]
  DuplicateHandle { node_id: String, handle: String },

  #[error("Question node '{node_id}' has no variable name")]
  MissingVariableName { node_id: String },

  #[error("Question node '{node_id}' has a trigger on unknown node '{source_id}'")]
  UnknownTriggerSource { node_id: String, source_id: String },

  #[error("Node '{node_id}' not found")]
  NodeNotFound { node_id: String },
}

/// Non-fatal finding from graph validation. Kept on the graph and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphWarning {
  #[error("Node '{node_id}' is not reachable from the start node")]
  UnreachableNode { node_id: String },

  #[error("No end node is reachable from the start node")]
  UnreachableEndNode,

  #[error("Condition node '{node_id}' has no output with an empty rule set to act as default")]
  MissingDefaultOutput { node_id: String },
}

/// Reason a running session was aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeAbort {
  #[error("No outgoing edge of node '{node_id}' matches handle {handle:?}")]
  NoEdgeResolved {
    node_id: String,
    handle: Option<String>,
  },

  #[error("Every candidate edge of node '{node_id}' was rejected by a target guard")]
  GuardRejectedAllCandidates { node_id: String },

  #[error("Node '{node_id}' was entered twice without waiting for input")]
  CycleWithoutInput { node_id: String },

  #[error("More than {limit} nodes entered without waiting for input")]
  StepLimitExceeded { limit: usize },

  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// Caller-contract violation. Returned synchronously; the session is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidAnswer {
  #[error("'{operation}' is not valid while the session is {state}")]
  WrongState {
    operation: &'static str,
    state: SessionState,
  },

  #[error("Question '{node_id}' has no option with value '{value}'")]
  UnknownOption { node_id: String, value: String },
}

/// Errors from reading a flow document.
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("Failed to read flow document: {0}")]
  Io(#[from] std::io::Error),

  #[error("Failed to parse flow JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Node '{node_id}' has unknown type '{kind}'")]
  UnknownNodeKind { node_id: String, kind: String },

  #[error("Node '{node_id}' has invalid data: {message}")]
  InvalidNodeData { node_id: String, message: String },

  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// Errors from rebuilding a session out of a [SessionSnapshot](crate::types::SessionSnapshot).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
  #[error("Snapshot of a started session has no cursor")]
  MissingCursor,

  #[error("Snapshot waits for input at '{node_id}', which is not a question node")]
  CursorNotQuestion { node_id: String },

  #[error(transparent)]
  Graph(#[from] GraphError),
}
