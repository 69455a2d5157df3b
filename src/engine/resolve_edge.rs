//! Next-node resolution: edge choice by node kind, condition outcome, and target guards.

use tracing::{debug, instrument};

use super::evaluator::evaluate_rule_set_traced;
use crate::error::{GraphError, RuntimeAbort};
use crate::types::{
  ConditionSpec, FALSE_HANDLE, FlowEdge, FlowGraph, FlowNode, NodeData, TRUE_HANDLE, TraceEvent,
  VariableStore,
};

/// Outcome of resolving the node after `current`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'g> {
  /// Continue to `node` along `edge`.
  Next {
    node: &'g FlowNode,
    edge: &'g FlowEdge,
  },
  /// `current` has no outgoing edges.
  EndOfFlow,
  /// Edges exist but none could be taken.
  Unresolved(RuntimeAbort),
}

impl<'g> Resolution<'g> {
  pub fn next_node(&self) -> Option<&'g FlowNode> {
    match self {
      Resolution::Next { node, .. } => Some(*node),
      _ => None,
    }
  }
}

/// Resolves the node after `current`, or `None` when the flow cannot continue from it.
pub fn resolve_next<'g>(
  graph: &'g FlowGraph,
  current: &FlowNode,
  store: &VariableStore,
) -> Option<&'g FlowNode> {
  resolve(graph, current, store, &mut Vec::new())
    .ok()
    .and_then(|r| r.next_node())
}

/// Resolves the node after `current`, recording rule evaluations and guard decisions
/// into `trace`.
///
/// - Non-condition nodes follow their first outgoing edge.
/// - Simple conditions follow the `"true"` or `"false"` handle.
/// - Multi-output conditions follow the first matching output; when a target guard rejects
///   it, the next matching output is tried.
///
/// Errors only when an edge target is missing from the graph.
#[instrument(
  level = "trace",
  skip(graph, current, store, trace),
  fields(node_id = %current.id)
)]
pub fn resolve<'g>(
  graph: &'g FlowGraph,
  current: &FlowNode,
  store: &VariableStore,
  trace: &mut Vec<TraceEvent>,
) -> Result<Resolution<'g>, GraphError> {
  let edges = graph.outgoing_edges(&current.id);
  if edges.is_empty() {
    return Ok(Resolution::EndOfFlow);
  }

  let spec = match &current.data {
    NodeData::Condition(spec) => spec,
    _ => {
      return take_edge(graph, current, edges[0], None, trace);
    }
  };

  match spec {
    ConditionSpec::Simple(rule_set) => {
      let matched = evaluate_rule_set_traced(rule_set, store, &current.id, None, trace);
      let handle = if matched { TRUE_HANDLE } else { FALSE_HANDLE };
      match find_by_handle(&edges, handle) {
        Some(edge) => take_edge(graph, current, edge, Some(handle), trace),
        None => Ok(Resolution::Unresolved(RuntimeAbort::NoEdgeResolved {
          node_id: current.id.clone(),
          handle: Some(handle.to_string()),
        })),
      }
    }
    ConditionSpec::MultiOutput { outputs } => {
      let mut rejected = false;
      for output in outputs {
        let value = output.value.as_str();
        let matched =
          evaluate_rule_set_traced(&output.rule_set, store, &current.id, Some(value), trace);
        if !matched {
          continue;
        }
        let Some(edge) = find_by_handle(&edges, value) else {
          return Ok(Resolution::Unresolved(RuntimeAbort::NoEdgeResolved {
            node_id: current.id.clone(),
            handle: Some(output.value.clone()),
          }));
        };
        match take_edge(graph, current, edge, Some(value), trace)? {
          Resolution::Unresolved(RuntimeAbort::GuardRejectedAllCandidates { .. }) => {
            rejected = true;
          }
          resolved => return Ok(resolved),
        }
      }
      let abort = if rejected {
        RuntimeAbort::GuardRejectedAllCandidates {
          node_id: current.id.clone(),
        }
      } else {
        RuntimeAbort::NoEdgeResolved {
          node_id: current.id.clone(),
          handle: None,
        }
      };
      Ok(Resolution::Unresolved(abort))
    }
  }
}

fn find_by_handle<'g>(edges: &[&'g FlowEdge], handle: &str) -> Option<&'g FlowEdge> {
  edges.iter().copied().find(|e| e.handle() == Some(handle))
}

/// Follows `edge` unless the target's guard rejects entry from `current` via `handle`.
fn take_edge<'g>(
  graph: &'g FlowGraph,
  current: &FlowNode,
  edge: &'g FlowEdge,
  handle: Option<&str>,
  trace: &mut Vec<TraceEvent>,
) -> Result<Resolution<'g>, GraphError> {
  let target = graph.node_by_id(&edge.target)?;
  if let Some(expected) = guard_for(target, &current.id)
    && handle != Some(expected)
  {
    debug!(source = %current.id, target = %target.id, ?handle, expected, "guard rejected edge");
    trace.push(TraceEvent::GuardRejected {
      source_id: current.id.clone(),
      target_id: target.id.clone(),
      handle: handle.map(String::from),
      expected: expected.to_string(),
    });
    return Ok(Resolution::Unresolved(
      RuntimeAbort::GuardRejectedAllCandidates {
        node_id: current.id.clone(),
      },
    ));
  }
  debug!(source = %current.id, target = %target.id, ?handle, "edge resolved");
  trace.push(TraceEvent::EdgeResolved {
    source_id: current.id.clone(),
    target_id: target.id.clone(),
    handle: handle.map(String::from),
  });
  Ok(Resolution::Next { node: target, edge })
}

/// Handle a question node requires when entered from `source_id`, if it guards that source.
fn guard_for<'n>(target: &'n FlowNode, source_id: &str) -> Option<&'n str> {
  target
    .as_question()
    .and_then(|q| q.condition_triggers.get(source_id))
    .map(String::as_str)
}
