//! Validated, immutable conversation flow graph.

use std::collections::HashMap;

use tracing::{instrument, warn};

use super::{FlowEdge, FlowNode};
use crate::engine::validate_graph;
use crate::error::{GraphError, GraphWarning};

/// Validated, immutable conversation flow graph.
///
/// Only constructible through [FlowGraph::new], so holding one means every
/// structural invariant was checked. Safe to share across sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FlowGraph {
  nodes: Vec<FlowNode>,
  edges: Vec<FlowEdge>,
  node_index: HashMap<String, usize>,
  outgoing: HashMap<String, Vec<usize>>,
  start_index: usize,
  warnings: Vec<GraphWarning>,
}

impl FlowGraph {
  /// Builds and validates a graph. Fails on the first structural error.
  #[instrument(
    level = "trace",
    skip(nodes, edges),
    fields(node_count = nodes.len(), edge_count = edges.len())
  )]
  pub fn new(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> Result<Self, GraphError> {
    let mut node_index = HashMap::with_capacity(nodes.len());
    for (i, n) in nodes.iter().enumerate() {
      if node_index.insert(n.id.clone(), i).is_some() {
        return Err(GraphError::DuplicateNodeId {
          node_id: n.id.clone(),
        });
      }
    }

    let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
      outgoing.entry(e.source.clone()).or_default().push(i);
    }

    let starts: Vec<usize> = nodes
      .iter()
      .enumerate()
      .filter(|(_, n)| n.is_start())
      .map(|(i, _)| i)
      .collect();
    let start_index = match starts.as_slice() {
      [] => return Err(GraphError::MissingStartNode),
      [only] => *only,
      many => return Err(GraphError::MultipleStartNodes { count: many.len() }),
    };

    let mut graph = Self {
      nodes,
      edges,
      node_index,
      outgoing,
      start_index,
      warnings: vec![],
    };
    graph.warnings = validate_graph::validate(&graph)?;
    for w in &graph.warnings {
      warn!(warning = %w, "flow graph warning");
    }
    Ok(graph)
  }

  /// Looks up a node by id.
  pub fn node_by_id(&self, id: &str) -> Result<&FlowNode, GraphError> {
    self
      .node_index
      .get(id)
      .map(|&i| &self.nodes[i])
      .ok_or_else(|| GraphError::NodeNotFound {
        node_id: id.to_string(),
      })
  }

  pub fn contains_node(&self, id: &str) -> bool {
    self.node_index.contains_key(id)
  }

  /// Outgoing edges of `node_id` in authoring order.
  pub fn outgoing_edges(&self, node_id: &str) -> Vec<&FlowEdge> {
    self
      .outgoing
      .get(node_id)
      .map(|idx| idx.iter().map(|&i| &self.edges[i]).collect())
      .unwrap_or_default()
  }

  /// Incoming edges of `node_id` in authoring order.
  pub fn incoming_edges(&self, node_id: &str) -> Vec<&FlowEdge> {
    self.edges.iter().filter(|e| e.target == node_id).collect()
  }

  pub fn start_node(&self) -> &FlowNode {
    &self.nodes[self.start_index]
  }

  pub fn nodes(&self) -> &[FlowNode] {
    &self.nodes
  }

  pub fn edges(&self) -> &[FlowEdge] {
    &self.edges
  }

  /// Non-fatal findings from validation.
  pub fn warnings(&self) -> &[GraphWarning] {
    &self.warnings
  }
}
