//! Structural validation of a flow graph, run once when the graph is built.

use std::collections::{HashSet, VecDeque};

use tracing::instrument;

use crate::error::{GraphError, GraphWarning};
use crate::types::{ConditionSpec, FALSE_HANDLE, FlowGraph, NodeData, TRUE_HANDLE};

/// Validates edges, condition handles and question payloads.
///
/// Start-node uniqueness and node-id uniqueness are checked by [FlowGraph::new] while it
/// builds its indexes. Returns the non-fatal warnings on success.
#[instrument(level = "trace", skip(graph))]
pub(crate) fn validate(graph: &FlowGraph) -> Result<Vec<GraphWarning>, GraphError> {
  check_edges(graph)?;
  check_condition_handles(graph)?;
  check_questions(graph)?;

  let mut warnings = missing_default_outputs(graph);
  warnings.extend(reachability_warnings(graph));
  Ok(warnings)
}

fn check_edges(graph: &FlowGraph) -> Result<(), GraphError> {
  let mut seen = HashSet::new();
  for e in graph.edges() {
    if !seen.insert(e.id.as_str()) {
      return Err(GraphError::DuplicateEdgeId {
        edge_id: e.id.clone(),
      });
    }
    for end in [&e.source, &e.target] {
      if !graph.contains_node(end) {
        return Err(GraphError::DanglingEdge {
          edge_id: e.id.clone(),
          node_id: end.clone(),
        });
      }
    }
  }
  Ok(())
}

fn check_condition_handles(graph: &FlowGraph) -> Result<(), GraphError> {
  for node in graph.nodes() {
    let NodeData::Condition(spec) = &node.data else {
      continue;
    };
    let allowed: Vec<&str> = match spec {
      ConditionSpec::Simple(_) => vec![TRUE_HANDLE, FALSE_HANDLE],
      ConditionSpec::MultiOutput { outputs } => outputs.iter().map(|o| o.value.as_str()).collect(),
    };
    let mut used = HashSet::new();
    for e in graph.outgoing_edges(&node.id) {
      let handle = match e.handle() {
        Some(h) if allowed.contains(&h) => h,
        _ => {
          return Err(GraphError::InvalidHandle {
            node_id: node.id.clone(),
            edge_id: e.id.clone(),
            handle: e.source_handle.clone(),
          });
        }
      };
      if !used.insert(handle) {
        return Err(GraphError::DuplicateHandle {
          node_id: node.id.clone(),
          handle: handle.to_string(),
        });
      }
    }
  }
  Ok(())
}

fn check_questions(graph: &FlowGraph) -> Result<(), GraphError> {
  for node in graph.nodes() {
    let Some(q) = node.as_question() else {
      continue;
    };
    if q.variable_name.trim().is_empty() {
      return Err(GraphError::MissingVariableName {
        node_id: node.id.clone(),
      });
    }
    if let Some(source_id) = q
      .condition_triggers
      .keys()
      .find(|source_id| !graph.contains_node(source_id))
    {
      return Err(GraphError::UnknownTriggerSource {
        node_id: node.id.clone(),
        source_id: source_id.clone(),
      });
    }
  }
  Ok(())
}

fn missing_default_outputs(graph: &FlowGraph) -> Vec<GraphWarning> {
  graph
    .nodes()
    .iter()
    .filter(|n| match &n.data {
      NodeData::Condition(ConditionSpec::MultiOutput { outputs }) => {
        !outputs.iter().any(|o| o.rule_set.is_empty())
      }
      _ => false,
    })
    .map(|n| GraphWarning::MissingDefaultOutput {
      node_id: n.id.clone(),
    })
    .collect()
}

/// Node ids reachable from the start node, in breadth-first order.
pub(crate) fn reachable_from_start(graph: &FlowGraph) -> Vec<&str> {
  let start = graph.start_node().id.as_str();
  let mut seen: HashSet<&str> = HashSet::from([start]);
  let mut order = vec![];
  let mut queue = VecDeque::from([start]);
  while let Some(id) = queue.pop_front() {
    order.push(id);
    for e in graph.outgoing_edges(id) {
      if seen.insert(e.target.as_str()) {
        queue.push_back(e.target.as_str());
      }
    }
  }
  order
}

fn reachability_warnings(graph: &FlowGraph) -> Vec<GraphWarning> {
  let reachable: HashSet<&str> = reachable_from_start(graph).into_iter().collect();
  let mut warnings: Vec<GraphWarning> = graph
    .nodes()
    .iter()
    .filter(|n| !reachable.contains(n.id.as_str()))
    .map(|n| GraphWarning::UnreachableNode {
      node_id: n.id.clone(),
    })
    .collect();
  let end_reachable = graph
    .nodes()
    .iter()
    .any(|n| n.is_end() && reachable.contains(n.id.as_str()));
  if !end_reachable {
    warnings.push(GraphWarning::UnreachableEndNode);
  }
  warnings
}
