//! Flow interpreter: the per-session state machine.
//!
//! A session walks the graph synchronously from the start node, presenting messages and
//! silently routing through conditions, until it reaches a question (suspends), an end
//! node (completes), or a dead end. Answers resume it from the pending question.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::resolve_edge::{Resolution, resolve};
use crate::config::{DeadEndPolicy, EngineConfig};
use crate::error::{GraphError, InvalidAnswer, RestoreError, RuntimeAbort};
use crate::types::{
  ExecutionTrace, FlowEvent, FlowGraph, FlowNode, FlowObserver, NodeData, QuestionData,
  SessionSnapshot, SessionState, TraceEvent, VariableStore,
};

/// Per-session flow interpreter. Owns its cursor, variables and trace exclusively.
pub struct FlowInterpreter {
  config: EngineConfig,
  session_id: Uuid,
  graph: Option<Arc<FlowGraph>>,
  state: SessionState,
  cursor: Option<String>,
  store: VariableStore,
  trace: ExecutionTrace,
  abort_reason: Option<RuntimeAbort>,
  early_termination: bool,
  observer: Option<Box<dyn FlowObserver>>,
}

impl Default for FlowInterpreter {
  fn default() -> Self {
    Self::new(EngineConfig::default())
  }
}

impl fmt::Debug for FlowInterpreter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FlowInterpreter")
      .field("session_id", &self.session_id)
      .field("state", &self.state)
      .field("cursor", &self.cursor)
      .field("variables", &self.store.len())
      .finish_non_exhaustive()
  }
}

impl FlowInterpreter {
  pub fn new(config: EngineConfig) -> Self {
    let session_id = Uuid::new_v4();
    Self {
      store: new_store(&config),
      trace: ExecutionTrace::new(session_id.to_string()),
      config,
      session_id,
      graph: None,
      state: SessionState::Idle,
      cursor: None,
      abort_reason: None,
      early_termination: false,
      observer: None,
    }
  }

  /// Attaches an observer that receives every event as it is emitted.
  pub fn with_observer(mut self, observer: impl FlowObserver + 'static) -> Self {
    self.observer = Some(Box::new(observer));
    self
  }

  /// Loads `graph` and runs from its start node to the first suspension point.
  ///
  /// Only valid while idle.
  #[instrument(level = "trace", skip(self, graph), fields(session_id = %self.session_id))]
  pub fn start(&mut self, graph: Arc<FlowGraph>) -> Result<Vec<FlowEvent>, InvalidAnswer> {
    if self.state != SessionState::Idle {
      return Err(InvalidAnswer::WrongState {
        operation: "start",
        state: self.state,
      });
    }
    let start = graph.start_node();
    info!(session_id = %self.session_id, start_node = %start.id, "session started");

    self.graph = Some(Arc::clone(&graph));
    self.store = new_store(&self.config);
    self.trace = ExecutionTrace::new(self.session_id.to_string());
    self.trace.started_at = Some(Utc::now().to_rfc3339());
    self.abort_reason = None;
    self.early_termination = false;
    self.state = SessionState::Running;
    self.record(TraceEvent::SessionStarted {
      start_node_id: start.id.clone(),
    });

    let mut out = vec![];
    if self.enter(start, &mut out) {
      self.advance(&graph, &start.id, Some(&start.id), &mut out);
    }
    Ok(out)
  }

  /// Commits `value` as the answer to the pending question and resumes the flow.
  ///
  /// Only valid while awaiting input.
  #[instrument(level = "trace", skip(self, value), fields(session_id = %self.session_id))]
  pub fn submit_answer(
    &mut self,
    value: impl Into<String>,
  ) -> Result<Vec<FlowEvent>, InvalidAnswer> {
    let (graph, node_id) = self.pending("submit_answer")?;
    let mut out = vec![];
    let variable = match graph.node_by_id(&node_id) {
      Ok(node) => match node.as_question() {
        Some(q) => q.variable_name.clone(),
        None => {
          self.abort(GraphError::NodeNotFound { node_id }.into(), &mut out);
          return Ok(out);
        }
      },
      Err(e) => {
        self.abort(e.into(), &mut out);
        return Ok(out);
      }
    };

    let value = value.into();
    info!(
      session_id = %self.session_id,
      node_id = %node_id,
      variable = %variable,
      "answer committed"
    );
    self.store.set(&variable, &value, &node_id);
    self.record(TraceEvent::AnswerCommitted {
      node_id: node_id.clone(),
      variable,
      value,
    });
    self.state = SessionState::Running;
    self.advance(&graph, &node_id, None, &mut out);
    Ok(out)
  }

  /// Answers the pending question with one of its options, matched by value or id.
  ///
  /// For a question without options this is [FlowInterpreter::submit_answer].
  pub fn select_option(&mut self, option_value: &str) -> Result<Vec<FlowEvent>, InvalidAnswer> {
    let (graph, node_id) = self.pending("select_option")?;
    let value = match graph.node_by_id(&node_id).ok().and_then(FlowNode::as_question) {
      Some(q) if !q.options.is_empty() => match q.find_option(option_value) {
        Some(option) => option.value.clone(),
        None => {
          return Err(InvalidAnswer::UnknownOption {
            node_id,
            value: option_value.to_string(),
          });
        }
      },
      _ => option_value.to_string(),
    };
    self.submit_answer(value)
  }

  /// Clears cursor, variables and trace and returns to idle. Valid in any state.
  ///
  /// The last loaded graph is kept for [FlowInterpreter::restart].
  pub fn reset(&mut self) {
    if self.state != SessionState::Idle {
      info!(session_id = %self.session_id, state = %self.state, "session reset");
    }
    self.state = SessionState::Idle;
    self.cursor = None;
    self.store = new_store(&self.config);
    self.trace = ExecutionTrace::new(self.session_id.to_string());
    self.abort_reason = None;
    self.early_termination = false;
  }

  /// Resets and starts again on the last loaded graph.
  pub fn restart(&mut self) -> Result<Vec<FlowEvent>, InvalidAnswer> {
    let Some(graph) = self.graph.clone() else {
      return Err(InvalidAnswer::WrongState {
        operation: "restart",
        state: self.state,
      });
    };
    self.reset();
    self.start(graph)
  }

  /// Captures the session for an external store.
  pub fn snapshot(&self) -> SessionSnapshot {
    SessionSnapshot {
      session_id: self.session_id,
      state: self.state,
      cursor: self.cursor.clone(),
      variables: self.store.clone(),
      early_termination: self.early_termination,
      abort_reason: self.abort_reason.clone(),
    }
  }

  /// Rebuilds a session from a snapshot taken on the same graph.
  ///
  /// The cursor must name a node of `graph`; a session that was waiting for input must
  /// point at a question node. The trace starts empty; an aborted session keeps its
  /// abort reason.
  pub fn restore(
    config: EngineConfig,
    graph: Arc<FlowGraph>,
    snapshot: SessionSnapshot,
  ) -> Result<Self, RestoreError> {
    let mut interp = Self::new(config);
    interp.session_id = snapshot.session_id;
    interp.trace = ExecutionTrace::new(snapshot.session_id.to_string());
    if snapshot.state == SessionState::Idle {
      return Ok(interp);
    }

    let cursor = snapshot.cursor.ok_or(RestoreError::MissingCursor)?;
    let node = graph.node_by_id(&cursor)?;
    let state = match snapshot.state {
      SessionState::Running | SessionState::AwaitingInput => {
        if node.as_question().is_none() {
          return Err(RestoreError::CursorNotQuestion { node_id: cursor });
        }
        SessionState::AwaitingInput
      }
      other => other,
    };

    interp.graph = Some(graph);
    interp.state = state;
    interp.cursor = Some(cursor);
    interp.store = snapshot.variables;
    interp.early_termination = snapshot.early_termination;
    if state == SessionState::Aborted {
      interp.abort_reason = snapshot.abort_reason;
    }
    Ok(interp)
  }

  pub fn session_id(&self) -> Uuid {
    self.session_id
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn variables(&self) -> &VariableStore {
    &self.store
  }

  pub fn trace(&self) -> &ExecutionTrace {
    &self.trace
  }

  /// Reason of the last abort, while the session is aborted.
  pub fn abort_reason(&self) -> Option<&RuntimeAbort> {
    self.abort_reason.as_ref()
  }

  /// True when the session completed at a dead end rather than an end node.
  pub fn early_termination(&self) -> bool {
    self.early_termination
  }

  /// Node the session last entered.
  pub fn current_node(&self) -> Option<&FlowNode> {
    let graph = self.graph.as_ref()?;
    graph.node_by_id(self.cursor.as_deref()?).ok()
  }

  /// The question waiting for an answer, if any.
  pub fn pending_question(&self) -> Option<&QuestionData> {
    if self.state != SessionState::AwaitingInput {
      return None;
    }
    self.current_node()?.as_question()
  }

  /// Graph and pending question id, or `WrongState` when not awaiting input.
  fn pending(&self, operation: &'static str) -> Result<(Arc<FlowGraph>, String), InvalidAnswer> {
    let wrong_state = || InvalidAnswer::WrongState {
      operation,
      state: self.state,
    };
    if self.state != SessionState::AwaitingInput {
      return Err(wrong_state());
    }
    match (self.graph.clone(), self.cursor.clone()) {
      (Some(graph), Some(cursor)) => Ok((graph, cursor)),
      _ => Err(wrong_state()),
    }
  }

  /// Resolves the node after `from_id` and keeps entering nodes until the session
  /// suspends, completes, or aborts.
  ///
  /// `entered` seeds the cycle guard with a node already entered in this pass.
  fn advance(
    &mut self,
    graph: &FlowGraph,
    from_id: &str,
    entered: Option<&str>,
    out: &mut Vec<FlowEvent>,
  ) {
    let mut visited: HashSet<String> = entered.into_iter().map(String::from).collect();
    let mut steps = 0usize;
    let mut current_id = from_id.to_string();

    loop {
      let current = match graph.node_by_id(&current_id) {
        Ok(n) => n,
        Err(e) => return self.abort(e.into(), out),
      };

      let mut trace = vec![];
      let resolution = resolve(graph, current, &self.store, &mut trace);
      self.record_all(trace);
      let next = match resolution {
        Ok(Resolution::Next { node, .. }) => node,
        Ok(Resolution::EndOfFlow) => return self.complete(true, None, out),
        Ok(Resolution::Unresolved(reason)) => return self.dead_end(reason, out),
        Err(e) => return self.abort(e.into(), out),
      };

      steps += 1;
      if steps > self.config.max_auto_steps {
        let limit = self.config.max_auto_steps;
        return self.abort(RuntimeAbort::StepLimitExceeded { limit }, out);
      }
      if !visited.insert(next.id.clone()) {
        let node_id = next.id.clone();
        return self.abort(RuntimeAbort::CycleWithoutInput { node_id }, out);
      }
      if !self.enter(next, out) {
        return;
      }
      current_id = next.id.clone();
    }
  }

  /// Enters `node`. Returns true when the session should keep advancing past it.
  fn enter(&mut self, node: &FlowNode, out: &mut Vec<FlowEvent>) -> bool {
    self.cursor = Some(node.id.clone());
    self.record(TraceEvent::NodeEntered {
      node_id: node.id.clone(),
      kind: node.kind(),
    });
    match &node.data {
      NodeData::Start | NodeData::Condition(_) => true,
      NodeData::Message { text } => {
        self.emit(
          FlowEvent::MessagePresented {
            node_id: node.id.clone(),
            text: text.clone(),
          },
          out,
        );
        true
      }
      NodeData::Question(q) => {
        self.state = SessionState::AwaitingInput;
        self.record(TraceEvent::Suspended {
          node_id: node.id.clone(),
        });
        info!(session_id = %self.session_id, node_id = %node.id, "awaiting input");
        self.emit(
          FlowEvent::QuestionPresented {
            node_id: node.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            variable_name: q.variable_name.clone(),
          },
          out,
        );
        false
      }
      NodeData::End { message } => {
        if let Some(text) = message {
          self.emit(
            FlowEvent::MessagePresented {
              node_id: node.id.clone(),
              text: text.clone(),
            },
            out,
          );
        }
        self.complete(false, Some(node.id.clone()), out);
        false
      }
    }
  }

  fn dead_end(&mut self, reason: RuntimeAbort, out: &mut Vec<FlowEvent>) {
    match self.config.dead_end_policy {
      DeadEndPolicy::Complete => {
        info!(session_id = %self.session_id, reason = %reason, "dead end, completing early");
        self.complete(true, None, out);
      }
      DeadEndPolicy::Abort => self.abort(reason, out),
    }
  }

  fn complete(
    &mut self,
    early_termination: bool,
    end_node_id: Option<String>,
    out: &mut Vec<FlowEvent>,
  ) {
    self.state = SessionState::Completed;
    self.early_termination = early_termination;
    self.record(TraceEvent::Completed { early_termination });
    self.trace.finished_at = Some(Utc::now().to_rfc3339());
    info!(
      session_id = %self.session_id,
      early_termination,
      variables = self.store.len(),
      "session completed"
    );
    self.emit(
      FlowEvent::FlowCompleted {
        variables: self.store.as_map().clone(),
        early_termination,
        end_node_id,
      },
      out,
    );
  }

  fn abort(&mut self, reason: RuntimeAbort, out: &mut Vec<FlowEvent>) {
    warn!(session_id = %self.session_id, reason = %reason, "session aborted");
    self.state = SessionState::Aborted;
    self.abort_reason = Some(reason.clone());
    self.record(TraceEvent::Aborted {
      reason: reason.to_string(),
    });
    self.trace.finished_at = Some(Utc::now().to_rfc3339());
    self.emit(FlowEvent::FlowAborted { reason }, out);
  }

  fn emit(&mut self, event: FlowEvent, out: &mut Vec<FlowEvent>) {
    if let Some(observer) = self.observer.as_mut() {
      observer.on_event(&event);
    }
    out.push(event);
  }

  fn record(&mut self, event: TraceEvent) {
    if self.config.record_trace {
      self.trace.push(event);
    }
  }

  fn record_all(&mut self, events: Vec<TraceEvent>) {
    if self.config.record_trace {
      self.trace.extend(events);
    }
  }
}

fn new_store(config: &EngineConfig) -> VariableStore {
  if config.record_history {
    VariableStore::with_history()
  } else {
    VariableStore::new()
  }
}
