//! Per-session answers keyed by variable name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One recorded write, kept when history is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableWrite {
  pub name: String,
  pub value: String,
  /// Value overwritten by this write, if any.
  pub previous: Option<String>,
  /// Question node that produced the value.
  pub node_id: String,
}

/// Per-session answers keyed by variable name.
///
/// Holds the last-written value per name. Values are strings; the evaluator coerces
/// them when a rule needs a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableStore {
  values: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  history: Option<Vec<VariableWrite>>,
}

impl VariableStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store that also keeps an append-only write history.
  pub fn with_history() -> Self {
    Self {
      values: BTreeMap::new(),
      history: Some(vec![]),
    }
  }

  pub fn from_map(values: BTreeMap<String, String>) -> Self {
    Self {
      values,
      history: None,
    }
  }

  /// Writes `value` under `name`, recording the write when history is on.
  pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>, node_id: &str) {
    let name = name.into();
    let value = value.into();
    let previous = self.values.insert(name.clone(), value.clone());
    if let Some(history) = self.history.as_mut() {
      history.push(VariableWrite {
        name,
        value,
        previous,
        node_id: node_id.to_string(),
      });
    }
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn as_map(&self) -> &BTreeMap<String, String> {
    &self.values
  }

  /// Write history, or `None` when the store was created without it.
  pub fn history(&self) -> Option<&[VariableWrite]> {
    self.history.as_deref()
  }
}
