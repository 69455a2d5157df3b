//! Condition evaluation: rules, rule sets, and multi-output selection.
//!
//! The plain functions are pure. The `*_traced` variants do the same work and append one
//! [TraceEvent] per evaluated rule and rule set, attributed to `node_id`.

use tracing::instrument;

use super::operators::operator_fn;
use crate::types::{Combinator, ConditionOutput, Rule, RuleSet, TraceEvent, VariableStore};

/// Evaluates one rule against the store.
pub fn evaluate_rule(rule: &Rule, store: &VariableStore) -> bool {
  operator_fn(rule.operator)(store.get(&rule.field), &rule.value)
}

/// Evaluates a rule set. An empty set is always true.
pub fn evaluate_rule_set(rule_set: &RuleSet, store: &VariableStore) -> bool {
  evaluate_rule_set_traced(rule_set, store, "", None, &mut Vec::new())
}

/// Returns the value of the first output whose rule set holds, in declaration order.
pub fn evaluate_multi_output<'a>(
  outputs: &'a [ConditionOutput],
  store: &VariableStore,
) -> Option<&'a str> {
  let mut trace = Vec::new();
  outputs
    .iter()
    .find(|o| {
      let value = Some(o.value.as_str());
      evaluate_rule_set_traced(&o.rule_set, store, "", value, &mut trace)
    })
    .map(|o| o.value.as_str())
}

pub(crate) fn evaluate_rule_traced(
  rule: &Rule,
  store: &VariableStore,
  node_id: &str,
  trace: &mut Vec<TraceEvent>,
) -> bool {
  let actual = store.get(&rule.field);
  let result = operator_fn(rule.operator)(actual, &rule.value);
  trace.push(TraceEvent::RuleEvaluated {
    node_id: node_id.to_string(),
    field: rule.field.clone(),
    operator: rule.operator.as_str().to_string(),
    operand: rule.value.clone(),
    actual: actual.map(String::from),
    result,
  });
  result
}

#[instrument(level = "trace", skip(rule_set, store, trace))]
pub(crate) fn evaluate_rule_set_traced(
  rule_set: &RuleSet,
  store: &VariableStore,
  node_id: &str,
  output: Option<&str>,
  trace: &mut Vec<TraceEvent>,
) -> bool {
  let result = if rule_set.rules.is_empty() {
    true
  } else {
    let mut rules = rule_set.rules.iter();
    match rule_set.operator {
      Combinator::And => rules.all(|r| evaluate_rule_traced(r, store, node_id, trace)),
      Combinator::Or => rules.any(|r| evaluate_rule_traced(r, store, node_id, trace)),
    }
  };
  trace.push(TraceEvent::RuleSetEvaluated {
    node_id: node_id.to_string(),
    output: output.map(String::from),
    result,
  });
  result
}
