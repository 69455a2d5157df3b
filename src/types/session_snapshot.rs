//! Serializable capture of a session, for an external store to persist.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SessionState, VariableStore};
use crate::error::RuntimeAbort;

/// Serializable capture of a session.
///
/// Paired with the same [FlowGraph](super::FlowGraph) it was taken from, it is enough to
/// rebuild the interpreter with `FlowInterpreter::restore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
  pub session_id: Uuid,
  pub state: SessionState,
  /// Node the session is positioned at (the pending question while awaiting input).
  pub cursor: Option<String>,
  pub variables: VariableStore,
  pub early_termination: bool,
  /// Why the session stopped, for an aborted session.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub abort_reason: Option<RuntimeAbort>,
}
