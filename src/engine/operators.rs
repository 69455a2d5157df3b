//! Rule operator registry: operator name → pure comparison function.
//!
//! Every function receives the field value (`None` when the variable is unset) and the
//! rule operand. String operands and values are trimmed before comparing.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::types::RuleOperator;

/// Pure comparison of a (possibly absent) field value against a rule operand.
pub type OperatorFn = fn(Option<&str>, &str) -> bool;

static REGISTRY: Lazy<HashMap<&'static str, OperatorFn>> = Lazy::new(|| {
  let entries: [(RuleOperator, OperatorFn); 11] = [
    (RuleOperator::Equals, equals),
    (RuleOperator::NotEquals, not_equals),
    (RuleOperator::Contains, contains),
    (RuleOperator::StartsWith, starts_with),
    (RuleOperator::EndsWith, ends_with),
    (RuleOperator::GreaterThan, greater_than),
    (RuleOperator::LessThan, less_than),
    (RuleOperator::IsEmpty, is_empty),
    (RuleOperator::IsNotEmpty, is_not_empty),
    (RuleOperator::InList, in_list),
    (RuleOperator::NotInList, not_in_list),
  ];
  entries
    .into_iter()
    .map(|(op, f)| (op.as_str(), f))
    .collect()
});

/// Looks up an operator function by wire name.
pub fn lookup(name: &str) -> Option<OperatorFn> {
  REGISTRY.get(name).copied()
}

/// Operator function for a typed operator. Every [RuleOperator] is registered.
pub fn operator_fn(op: RuleOperator) -> OperatorFn {
  match lookup(op.as_str()) {
    Some(f) => f,
    None => unregistered,
  }
}

/// Registered operator names, sorted.
pub fn registered_names() -> Vec<&'static str> {
  let mut names: Vec<_> = REGISTRY.keys().copied().collect();
  names.sort_unstable();
  names
}

fn unregistered(_field: Option<&str>, _operand: &str) -> bool {
  false
}

/// Coerces a string to a number; blank or non-numeric input yields NaN.
///
/// Only finite values count as numbers, so words `f64::from_str` accepts (`inf`,
/// `infinity`, `NaN`) coerce to NaN like any other word.
pub(crate) fn to_number(s: &str) -> f64 {
  let s = s.trim();
  if s.is_empty() {
    return f64::NAN;
  }
  s.parse::<f64>()
    .ok()
    .filter(|n| n.is_finite())
    .unwrap_or(f64::NAN)
}

/// Splits a comma-separated operand into trimmed, lower-cased items.
pub(crate) fn split_list(operand: &str) -> Vec<String> {
  operand
    .split(',')
    .map(|item| item.trim().to_lowercase())
    .collect()
}

fn field_text(field: Option<&str>) -> &str {
  field.map(str::trim).unwrap_or("")
}

fn equals(field: Option<&str>, operand: &str) -> bool {
  field_text(field).to_lowercase() == operand.trim().to_lowercase()
}

fn not_equals(field: Option<&str>, operand: &str) -> bool {
  !equals(field, operand)
}

fn contains(field: Option<&str>, operand: &str) -> bool {
  field_text(field).contains(operand.trim())
}

fn starts_with(field: Option<&str>, operand: &str) -> bool {
  field_text(field)
    .to_lowercase()
    .starts_with(&operand.trim().to_lowercase())
}

fn ends_with(field: Option<&str>, operand: &str) -> bool {
  field_text(field)
    .to_lowercase()
    .ends_with(&operand.trim().to_lowercase())
}

fn greater_than(field: Option<&str>, operand: &str) -> bool {
  to_number(field_text(field)) > to_number(operand)
}

fn less_than(field: Option<&str>, operand: &str) -> bool {
  to_number(field_text(field)) < to_number(operand)
}

fn is_empty(field: Option<&str>, _operand: &str) -> bool {
  field_text(field).is_empty()
}

fn is_not_empty(field: Option<&str>, operand: &str) -> bool {
  !is_empty(field, operand)
}

fn in_list(field: Option<&str>, operand: &str) -> bool {
  let needle = field_text(field).to_lowercase();
  split_list(operand).iter().any(|item| *item == needle)
}

fn not_in_list(field: Option<&str>, operand: &str) -> bool {
  !in_list(field, operand)
}
