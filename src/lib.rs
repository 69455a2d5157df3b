//! # convoflow
//!
//! Conversation flow engine: walks an authored graph of start, message, question,
//! condition and end nodes, routes through conditions with rule sets evaluated against
//! the answers collected so far, and suspends at each question until the caller submits
//! an answer. A finished session yields a flat map of variables, keyed by each question's
//! variable name.
//!
//! ## Architecture
//!
//! - [types]: flow model ([FlowGraph], [FlowNode], rules) and session data
//!   ([VariableStore], [FlowEvent], [ExecutionTrace]).
//! - [engine]: the operator registry and condition evaluator, the edge resolver with
//!   target guards, and the per-session [FlowInterpreter].
//! - [flow_loader]: JSON flow documents → validated [FlowGraph].
//! - [trace_io]: write/read execution traces.

pub mod config;
pub mod engine;
pub mod error;
pub mod flow_loader;
pub mod trace_io;
pub mod types;

pub use config::{DeadEndPolicy, EngineConfig};
pub use engine::{
  FlowInterpreter, Resolution, evaluate_multi_output, evaluate_rule, evaluate_rule_set,
  resolve_next,
};
pub use error::{GraphError, GraphWarning, InvalidAnswer, LoadError, RestoreError, RuntimeAbort};
pub use flow_loader::{load_flow, parse_flow};
pub use types::{
  ExecutionTrace, FlowEdge, FlowEvent, FlowGraph, FlowNode, FlowObserver, NodeData, NodeKind,
  SessionSnapshot, SessionState, VariableStore,
};
