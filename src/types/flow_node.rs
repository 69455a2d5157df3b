//! A node in an authored conversation flow.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConditionSpec;

/// Kind of a flow node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  Start,
  Message,
  Question,
  Condition,
  End,
}

impl NodeKind {
  /// Parses an authoring-tool node type. Case-insensitive; a trailing `Node` is tolerated
  /// (`questionNode`, `Question`, `question` are all accepted).
  pub fn parse(s: &str) -> Option<Self> {
    let lower = s.trim().to_lowercase();
    let name = lower.strip_suffix("node").unwrap_or(&lower);
    match name {
      "start" => Some(NodeKind::Start),
      "message" => Some(NodeKind::Message),
      "question" => Some(NodeKind::Question),
      "condition" => Some(NodeKind::Condition),
      "end" => Some(NodeKind::End),
      _ => None,
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeKind::Start => write!(f, "start"),
      NodeKind::Message => write!(f, "message"),
      NodeKind::Question => write!(f, "question"),
      NodeKind::Condition => write!(f, "condition"),
      NodeKind::End => write!(f, "end"),
    }
  }
}

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
  pub id: String,
  pub label: String,
  pub value: String,
}

impl QuestionOption {
  pub fn new(id: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      value: value.into(),
    }
  }
}

/// Payload of a question node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
  #[serde(alias = "question", alias = "label")]
  pub text: String,
  #[serde(default)]
  pub options: Vec<QuestionOption>,
  #[serde(default)]
  pub variable_name: String,
  /// Guard: `source node id -> handle` the question must be entered through.
  #[serde(default)]
  pub condition_triggers: BTreeMap<String, String>,
}

impl QuestionData {
  pub fn new(text: impl Into<String>, variable_name: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      options: vec![],
      variable_name: variable_name.into(),
      condition_triggers: BTreeMap::new(),
    }
  }

  pub fn with_options(mut self, options: Vec<QuestionOption>) -> Self {
    self.options = options;
    self
  }

  pub fn with_trigger(mut self, source_id: impl Into<String>, handle: impl Into<String>) -> Self {
    self.condition_triggers.insert(source_id.into(), handle.into());
    self
  }

  /// Finds the option matching `value`, falling back to a match on option id.
  pub fn find_option(&self, value: &str) -> Option<&QuestionOption> {
    self
      .options
      .iter()
      .find(|o| o.value == value)
      .or_else(|| self.options.iter().find(|o| o.id == value))
  }
}

/// Kind-specific payload of a flow node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
  Start,
  Message { text: String },
  Question(QuestionData),
  Condition(ConditionSpec),
  End { message: Option<String> },
}

impl NodeData {
  pub fn kind(&self) -> NodeKind {
    match self {
      NodeData::Start => NodeKind::Start,
      NodeData::Message { .. } => NodeKind::Message,
      NodeData::Question(_) => NodeKind::Question,
      NodeData::Condition(_) => NodeKind::Condition,
      NodeData::End { .. } => NodeKind::End,
    }
  }
}

/// A node in an authored conversation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
  pub id: String,
  pub data: NodeData,
}

impl FlowNode {
  pub fn new(id: impl Into<String>, data: NodeData) -> Self {
    Self {
      id: id.into(),
      data,
    }
  }

  pub fn start(id: impl Into<String>) -> Self {
    Self::new(id, NodeData::Start)
  }

  pub fn message(id: impl Into<String>, text: impl Into<String>) -> Self {
    Self::new(id, NodeData::Message { text: text.into() })
  }

  pub fn question(id: impl Into<String>, data: QuestionData) -> Self {
    Self::new(id, NodeData::Question(data))
  }

  pub fn condition(id: impl Into<String>, spec: ConditionSpec) -> Self {
    Self::new(id, NodeData::Condition(spec))
  }

  pub fn end(id: impl Into<String>, message: Option<&str>) -> Self {
    Self::new(
      id,
      NodeData::End {
        message: message.map(String::from),
      },
    )
  }

  pub fn kind(&self) -> NodeKind {
    self.data.kind()
  }

  pub fn is_start(&self) -> bool {
    matches!(self.data, NodeData::Start)
  }

  pub fn is_end(&self) -> bool {
    matches!(self.data, NodeData::End { .. })
  }

  /// Question payload, if this is a question node.
  pub fn as_question(&self) -> Option<&QuestionData> {
    match &self.data {
      NodeData::Question(q) => Some(q),
      _ => None,
    }
  }
}
