//! Flow data model: nodes, edges, rules, the validated graph, and session state.

mod execution_trace;
mod flow_edge;
mod flow_event;
mod flow_graph;
mod flow_node;
mod rule;
mod session_snapshot;
mod session_state;
mod variable_store;

pub use execution_trace::{ExecutionTrace, TraceEntry, TraceEvent};
pub use flow_edge::FlowEdge;
pub use flow_event::{FlowEvent, FlowObserver};
pub use flow_graph::FlowGraph;
pub use flow_node::{FlowNode, NodeData, NodeKind, QuestionData, QuestionOption};
pub use rule::{
  Combinator, ConditionOutput, ConditionSpec, FALSE_HANDLE, Rule, RuleOperator, RuleSet,
  TRUE_HANDLE,
};
pub use session_snapshot::SessionSnapshot;
pub use session_state::SessionState;
pub use variable_store::{VariableStore, VariableWrite};
