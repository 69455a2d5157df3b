//! Loader for authored flow documents (JSON).
//!
//! Document shape:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "start", "type": "start" },
//!     { "id": "q1", "type": "question",
//!       "data": { "text": "How old are you?", "variableName": "age" } }
//!   ],
//!   "edges": [{ "id": "e1", "source": "start", "target": "q1" }]
//! }
//! ```
//!
//! Fields the engine does not use (positions, styling) are ignored. Every loaded document
//! goes through [FlowGraph::new], so loading also validates.

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::error::LoadError;
use crate::types::{ConditionSpec, FlowEdge, FlowGraph, FlowNode, NodeData, NodeKind, QuestionData};

#[derive(Debug, Deserialize)]
struct RawFlow {
  #[serde(default)]
  nodes: Vec<RawNode>,
  #[serde(default)]
  edges: Vec<FlowEdge>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
  id: String,
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessageData {
  #[serde(alias = "message", alias = "content")]
  text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionData {
  condition_spec: ConditionSpec,
}

#[derive(Debug, Default, Deserialize)]
struct EndData {
  #[serde(default, alias = "text")]
  message: Option<String>,
}

/// Parses a flow document and builds a validated graph.
#[instrument(level = "trace", skip(source))]
pub fn parse_flow(source: &str) -> Result<FlowGraph, LoadError> {
  let raw: RawFlow = serde_json::from_str(source)?;
  let nodes = raw
    .nodes
    .into_iter()
    .map(convert_node)
    .collect::<Result<Vec<_>, _>>()?;
  let graph = FlowGraph::new(nodes, raw.edges)?;
  info!(
    nodes = graph.nodes().len(),
    edges = graph.edges().len(),
    warnings = graph.warnings().len(),
    "flow loaded"
  );
  Ok(graph)
}

/// Reads and parses a flow document from `path`.
pub fn load_flow(path: &Path) -> Result<FlowGraph, LoadError> {
  let source = std::fs::read_to_string(path)?;
  parse_flow(&source)
}

fn convert_node(raw: RawNode) -> Result<FlowNode, LoadError> {
  let kind = NodeKind::parse(&raw.kind).ok_or_else(|| LoadError::UnknownNodeKind {
    node_id: raw.id.clone(),
    kind: raw.kind.clone(),
  })?;
  let id = raw.id;
  let data = match kind {
    NodeKind::Start => NodeData::Start,
    NodeKind::Message => {
      let m: MessageData = payload(&id, raw.data)?;
      NodeData::Message { text: m.text }
    }
    NodeKind::Question => NodeData::Question(payload::<QuestionData>(&id, raw.data)?),
    NodeKind::Condition => {
      let c: ConditionData = payload(&id, raw.data)?;
      NodeData::Condition(c.condition_spec)
    }
    NodeKind::End => {
      let e: EndData = payload(&id, raw.data)?;
      NodeData::End { message: e.message }
    }
  };
  Ok(FlowNode::new(id, data))
}

/// Decodes a node's `data` object; a missing payload decodes as `{}`.
fn payload<T: DeserializeOwned>(node_id: &str, data: serde_json::Value) -> Result<T, LoadError> {
  let data = if data.is_null() {
    serde_json::Value::Object(serde_json::Map::new())
  } else {
    data
  };
  serde_json::from_value(data).map_err(|e| LoadError::InvalidNodeData {
    node_id: node_id.to_string(),
    message: e.to_string(),
  })
}
