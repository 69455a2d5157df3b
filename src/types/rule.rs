//! Branching rules attached to condition nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison applied by a [Rule].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
  Equals,
  NotEquals,
  Contains,
  StartsWith,
  EndsWith,
  GreaterThan,
  LessThan,
  IsEmpty,
  IsNotEmpty,
  InList,
  NotInList,
}

impl RuleOperator {
  pub const ALL: [RuleOperator; 11] = [
    RuleOperator::Equals,
    RuleOperator::NotEquals,
    RuleOperator::Contains,
    RuleOperator::StartsWith,
    RuleOperator::EndsWith,
    RuleOperator::GreaterThan,
    RuleOperator::LessThan,
    RuleOperator::IsEmpty,
    RuleOperator::IsNotEmpty,
    RuleOperator::InList,
    RuleOperator::NotInList,
  ];

  /// Wire name of the operator (`equals`, `not_in_list`, ...).
  pub fn as_str(&self) -> &'static str {
    match self {
      RuleOperator::Equals => "equals",
      RuleOperator::NotEquals => "not_equals",
      RuleOperator::Contains => "contains",
      RuleOperator::StartsWith => "starts_with",
      RuleOperator::EndsWith => "ends_with",
      RuleOperator::GreaterThan => "greater_than",
      RuleOperator::LessThan => "less_than",
      RuleOperator::IsEmpty => "is_empty",
      RuleOperator::IsNotEmpty => "is_not_empty",
      RuleOperator::InList => "in_list",
      RuleOperator::NotInList => "not_in_list",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|op| op.as_str() == name)
  }
}

impl fmt::Display for RuleOperator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One comparison of a variable against an operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
  /// Variable name looked up in the store.
  pub field: String,
  pub operator: RuleOperator,
  /// Operand; a comma-separated list for the list operators.
  #[serde(default)]
  pub value: String,
}

impl Rule {
  pub fn new(field: impl Into<String>, operator: RuleOperator, value: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      operator,
      value: value.into(),
    }
  }
}

/// How the rules of a [RuleSet] combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
  #[default]
  And,
  Or,
}

/// Ordered rules plus their combination. An empty set is always satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
  #[serde(default)]
  pub operator: Combinator,
  #[serde(default)]
  pub rules: Vec<Rule>,
}

impl RuleSet {
  pub fn all(rules: Vec<Rule>) -> Self {
    Self {
      operator: Combinator::And,
      rules,
    }
  }

  pub fn any(rules: Vec<Rule>) -> Self {
    Self {
      operator: Combinator::Or,
      rules,
    }
  }

  /// The empty rule set, used as a default output.
  pub fn always() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

/// A named branch of a multi-output condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionOutput {
  /// Handle name matched against `source_handle` of outgoing edges.
  pub value: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(flatten)]
  pub rule_set: RuleSet,
}

impl ConditionOutput {
  pub fn new(value: impl Into<String>, rule_set: RuleSet) -> Self {
    Self {
      value: value.into(),
      label: None,
      rule_set,
    }
  }
}

/// Routing spec of a condition node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConditionSpec {
  /// One rule set; routes along the `"true"` or `"false"` handle.
  Simple(RuleSet),
  /// First matching output wins; routes along the handle named by its value.
  MultiOutput { outputs: Vec<ConditionOutput> },
}

/// Handle taken when a simple condition matches.
pub const TRUE_HANDLE: &str = "true";
/// Handle taken when a simple condition does not match.
pub const FALSE_HANDLE: &str = "false";
