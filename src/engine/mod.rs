//! Flow execution engine: condition evaluation, edge resolution, and the session
//! interpreter.

pub mod evaluator;
pub mod interpreter;
#[cfg(test)]
mod interpreter_test;
pub mod operators;
pub mod resolve_edge;
pub(crate) mod validate_graph;

pub use evaluator::{evaluate_multi_output, evaluate_rule, evaluate_rule_set};
pub use interpreter::FlowInterpreter;
pub use resolve_edge::{Resolution, resolve, resolve_next};
