//! Tests for `FlowInterpreter`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::interpreter::FlowInterpreter;
use crate::config::{DeadEndPolicy, EngineConfig};
use crate::error::{GraphError, InvalidAnswer, RestoreError, RuntimeAbort};
use crate::types::{
  ConditionSpec, FlowEdge, FlowEvent, FlowGraph, FlowNode, QuestionData, QuestionOption, Rule,
  RuleOperator, RuleSet, SessionSnapshot, SessionState, TraceEvent,
};

fn edge(id: &str, from: &str, to: &str) -> FlowEdge {
  FlowEdge::new(id, from, to)
}

fn handle_edge(id: &str, from: &str, to: &str, handle: &str) -> FlowEdge {
  FlowEdge::new(id, from, to).with_handle(handle)
}

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// start → welcome → q_age → c1 (age > 18) → adult | minor
fn age_graph() -> Arc<FlowGraph> {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::message("welcome", "Welcome!"),
    FlowNode::question("q_age", QuestionData::new("How old are you?", "age")),
    FlowNode::condition(
      "c1",
      ConditionSpec::Simple(RuleSet::all(vec![Rule::new(
        "age",
        RuleOperator::GreaterThan,
        "18",
      )])),
    ),
    FlowNode::end("adult", Some("Thanks, you qualify.")),
    FlowNode::end("minor", None),
  ];
  let edges = vec![
    edge("e1", "start", "welcome"),
    edge("e2", "welcome", "q_age"),
    edge("e3", "q_age", "c1"),
    handle_edge("t", "c1", "adult", "true"),
    handle_edge("f", "c1", "minor", "false"),
  ];
  Arc::new(FlowGraph::new(nodes, edges).unwrap())
}

/// start → c1 → only a `true` edge, so a false condition dead-ends.
fn dead_end_graph() -> Arc<FlowGraph> {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::question("q", QuestionData::new("Continue?", "go")),
    FlowNode::condition(
      "c1",
      ConditionSpec::Simple(RuleSet::all(vec![Rule::new(
        "go",
        RuleOperator::Equals,
        "yes",
      )])),
    ),
    FlowNode::end("end", None),
  ];
  let edges = vec![
    edge("e1", "start", "q"),
    edge("e2", "q", "c1"),
    handle_edge("t", "c1", "end", "true"),
  ];
  Arc::new(FlowGraph::new(nodes, edges).unwrap())
}

fn with_policy(policy: DeadEndPolicy) -> EngineConfig {
  EngineConfig {
    dead_end_policy: policy,
    ..EngineConfig::default()
  }
}

fn completed(variables: BTreeMap<String, String>, end: Option<&str>) -> FlowEvent {
  FlowEvent::FlowCompleted {
    variables,
    early_termination: end.is_none(),
    end_node_id: end.map(String::from),
  }
}

#[test]
fn start_runs_to_first_question() {
  let mut interp = FlowInterpreter::default();
  let events = interp.start(age_graph()).unwrap();
  assert_eq!(
    events,
    vec![
      FlowEvent::MessagePresented {
        node_id: "welcome".to_string(),
        text: "Welcome!".to_string(),
      },
      FlowEvent::QuestionPresented {
        node_id: "q_age".to_string(),
        text: "How old are you?".to_string(),
        options: vec![],
        variable_name: "age".to_string(),
      },
    ]
  );
  assert!(!events.iter().any(FlowEvent::is_terminal));
  assert_eq!(interp.state(), SessionState::AwaitingInput);
  assert_eq!(interp.current_node().map(|n| n.id.as_str()), Some("q_age"));
  assert_eq!(interp.pending_question().map(|q| q.variable_name.as_str()), Some("age"));
}

#[test]
fn adult_answer_reaches_adult_end() {
  let mut interp = FlowInterpreter::default();
  interp.start(age_graph()).unwrap();
  let events = interp.submit_answer("25").unwrap();
  assert_eq!(
    events,
    vec![
      FlowEvent::MessagePresented {
        node_id: "adult".to_string(),
        text: "Thanks, you qualify.".to_string(),
      },
      completed(vars(&[("age", "25")]), Some("adult")),
    ]
  );
  assert!(events.last().is_some_and(FlowEvent::is_terminal));
  assert_eq!(interp.state(), SessionState::Completed);
  assert!(!interp.early_termination());
  assert_eq!(
    interp.trace().entered_nodes(),
    vec!["start", "welcome", "q_age", "c1", "adult"]
  );
}

#[test]
fn minor_and_non_numeric_answers_reach_minor_end() {
  for answer in ["10", "eighteen", "", "inf"] {
    let mut interp = FlowInterpreter::default();
    interp.start(age_graph()).unwrap();
    let events = interp.submit_answer(answer).unwrap();
    assert_eq!(
      events,
      vec![completed(vars(&[("age", answer)]), Some("minor"))],
      "answer {:?}",
      answer
    );
  }
}

#[test]
fn runs_are_deterministic() {
  let graph = age_graph();
  let run = |answer: &str| {
    let mut interp = FlowInterpreter::default();
    let mut events = interp.start(Arc::clone(&graph)).unwrap();
    events.extend(interp.submit_answer(answer).unwrap());
    (events, interp.trace().entries.clone())
  };
  assert_eq!(run("42"), run("42"));
}

#[test]
fn answers_rejected_outside_awaiting_input() {
  let mut interp = FlowInterpreter::default();
  assert_eq!(
    interp.submit_answer("x").unwrap_err(),
    InvalidAnswer::WrongState {
      operation: "submit_answer",
      state: SessionState::Idle,
    }
  );
  interp.start(age_graph()).unwrap();
  interp.submit_answer("30").unwrap();
  assert_eq!(
    interp.submit_answer("31").unwrap_err(),
    InvalidAnswer::WrongState {
      operation: "submit_answer",
      state: SessionState::Completed,
    }
  );
  assert_eq!(interp.variables().get("age"), Some("30"));
}

#[test]
fn start_twice_is_wrong_state() {
  let mut interp = FlowInterpreter::default();
  interp.start(age_graph()).unwrap();
  assert_eq!(
    interp.start(age_graph()).unwrap_err(),
    InvalidAnswer::WrongState {
      operation: "start",
      state: SessionState::AwaitingInput,
    }
  );
  assert_eq!(interp.state(), SessionState::AwaitingInput);
}

#[test]
fn reset_is_idempotent() {
  let mut interp = FlowInterpreter::default();
  interp.start(age_graph()).unwrap();
  interp.submit_answer("25").unwrap();
  interp.reset();
  interp.reset();
  assert_eq!(interp.state(), SessionState::Idle);
  assert!(interp.variables().is_empty());
  assert!(interp.trace().entries.is_empty());
  assert!(interp.current_node().is_none());
  assert!(interp.start(age_graph()).is_ok());
}

#[test]
fn restart_replays_from_start() {
  let mut interp = FlowInterpreter::default();
  let first = interp.start(age_graph()).unwrap();
  interp.submit_answer("25").unwrap();
  let again = interp.restart().unwrap();
  assert_eq!(first, again);
  assert!(interp.variables().is_empty());
  assert_eq!(interp.state(), SessionState::AwaitingInput);
}

#[test]
fn restart_after_reset_uses_last_graph() {
  let mut interp = FlowInterpreter::default();
  let first = interp.start(age_graph()).unwrap();
  interp.submit_answer("25").unwrap();
  interp.reset();
  assert_eq!(interp.state(), SessionState::Idle);
  assert!(interp.pending_question().is_none());
  assert_eq!(interp.restart().unwrap(), first);
  assert_eq!(interp.state(), SessionState::AwaitingInput);
}

#[test]
fn restart_without_graph_is_wrong_state() {
  let mut interp = FlowInterpreter::default();
  assert!(matches!(
    interp.restart(),
    Err(InvalidAnswer::WrongState {
      operation: "restart",
      ..
    })
  ));
}

fn options_graph() -> Arc<FlowGraph> {
  let q = QuestionData::new("Pick a level", "level").with_options(vec![
    QuestionOption::new("o1", "Junior", "junior"),
    QuestionOption::new("o2", "Senior", "senior"),
  ]);
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::question("q", q),
    FlowNode::end("end", None),
  ];
  let edges = vec![edge("e1", "start", "q"), edge("e2", "q", "end")];
  Arc::new(FlowGraph::new(nodes, edges).unwrap())
}

#[test]
fn select_option_by_id_stores_value() {
  let mut interp = FlowInterpreter::default();
  interp.start(options_graph()).unwrap();
  let events = interp.select_option("o2").unwrap();
  assert_eq!(events, vec![completed(vars(&[("level", "senior")]), Some("end"))]);
}

#[test]
fn select_unknown_option_leaves_session_waiting() {
  let mut interp = FlowInterpreter::default();
  interp.start(options_graph()).unwrap();
  assert_eq!(
    interp.select_option("lead").unwrap_err(),
    InvalidAnswer::UnknownOption {
      node_id: "q".to_string(),
      value: "lead".to_string(),
    }
  );
  assert_eq!(interp.state(), SessionState::AwaitingInput);
  assert!(interp.select_option("junior").is_ok());
  assert_eq!(interp.variables().get("level"), Some("junior"));
}

#[test]
fn select_option_without_options_passes_value_through() {
  let mut interp = FlowInterpreter::default();
  interp.start(age_graph()).unwrap();
  interp.select_option("19").unwrap();
  assert_eq!(interp.variables().get("age"), Some("19"));
}

#[test]
fn dead_end_completes_early_by_default() {
  let mut interp = FlowInterpreter::default();
  interp.start(dead_end_graph()).unwrap();
  let events = interp.submit_answer("no").unwrap();
  assert_eq!(events, vec![completed(vars(&[("go", "no")]), None)]);
  assert!(interp.early_termination());
  assert!(interp.abort_reason().is_none());
}

#[test]
fn dead_end_aborts_under_abort_policy() {
  let mut interp = FlowInterpreter::new(with_policy(DeadEndPolicy::Abort));
  interp.start(dead_end_graph()).unwrap();
  let reason = RuntimeAbort::NoEdgeResolved {
    node_id: "c1".to_string(),
    handle: Some("false".to_string()),
  };
  let events = interp.submit_answer("no").unwrap();
  assert_eq!(
    events,
    vec![FlowEvent::FlowAborted {
      reason: reason.clone()
    }]
  );
  assert_eq!(interp.state(), SessionState::Aborted);
  assert_eq!(interp.abort_reason(), Some(&reason));
}

#[test]
fn node_without_edges_completes_early() {
  let nodes = vec![FlowNode::start("start"), FlowNode::message("m", "bye")];
  let graph = Arc::new(FlowGraph::new(nodes, vec![edge("e1", "start", "m")]).unwrap());
  let mut interp = FlowInterpreter::new(with_policy(DeadEndPolicy::Abort));
  let events = interp.start(graph).unwrap();
  assert_eq!(
    events,
    vec![
      FlowEvent::MessagePresented {
        node_id: "m".to_string(),
        text: "bye".to_string(),
      },
      completed(BTreeMap::new(), None),
    ]
  );
}

#[test]
fn loop_without_question_aborts() {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::message("m", "again"),
    FlowNode::condition("c1", ConditionSpec::Simple(RuleSet::always())),
    FlowNode::end("end", None),
  ];
  let edges = vec![
    edge("e1", "start", "m"),
    edge("e2", "m", "c1"),
    handle_edge("t", "c1", "m", "true"),
    handle_edge("f", "c1", "end", "false"),
  ];
  let graph = Arc::new(FlowGraph::new(nodes, edges).unwrap());
  let mut interp = FlowInterpreter::default();
  let events = interp.start(graph).unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(
    events[1],
    FlowEvent::FlowAborted {
      reason: RuntimeAbort::CycleWithoutInput {
        node_id: "m".to_string()
      }
    }
  );
}

#[test]
fn question_may_loop_back_to_itself() {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::question("q", QuestionData::new("Your name?", "name")),
    FlowNode::condition(
      "c1",
      ConditionSpec::Simple(RuleSet::all(vec![Rule::new(
        "name",
        RuleOperator::IsEmpty,
        "",
      )])),
    ),
    FlowNode::end("end", None),
  ];
  let edges = vec![
    edge("e1", "start", "q"),
    edge("e2", "q", "c1"),
    handle_edge("t", "c1", "q", "true"),
    handle_edge("f", "c1", "end", "false"),
  ];
  let graph = Arc::new(FlowGraph::new(nodes, edges).unwrap());
  let mut interp = FlowInterpreter::default();
  interp.start(graph).unwrap();
  let events = interp.submit_answer("  ").unwrap();
  assert!(matches!(
    events.as_slice(),
    [FlowEvent::QuestionPresented { node_id, .. }] if node_id == "q"
  ));
  let events = interp.submit_answer("Ada").unwrap();
  assert_eq!(events, vec![completed(vars(&[("name", "Ada")]), Some("end"))]);
}

#[test]
fn step_limit_aborts_long_chains() {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::message("m1", "1"),
    FlowNode::message("m2", "2"),
    FlowNode::message("m3", "3"),
    FlowNode::end("end", None),
  ];
  let edges = vec![
    edge("e1", "start", "m1"),
    edge("e2", "m1", "m2"),
    edge("e3", "m2", "m3"),
    edge("e4", "m3", "end"),
  ];
  let graph = Arc::new(FlowGraph::new(nodes, edges).unwrap());
  let config = EngineConfig {
    max_auto_steps: 2,
    ..EngineConfig::default()
  };
  let mut interp = FlowInterpreter::new(config);
  let events = interp.start(graph).unwrap();
  assert_eq!(
    events.last(),
    Some(&FlowEvent::FlowAborted {
      reason: RuntimeAbort::StepLimitExceeded { limit: 2 }
    })
  );
  assert_eq!(interp.trace().entered_nodes(), vec!["start", "m1", "m2"]);
}

#[test]
fn guarded_question_is_skipped_to_dead_end() {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::question("q_age", QuestionData::new("Age?", "age")),
    FlowNode::condition(
      "c1",
      ConditionSpec::Simple(RuleSet::all(vec![Rule::new(
        "age",
        RuleOperator::LessThan,
        "18",
      )])),
    ),
    FlowNode::question(
      "q_guardian",
      QuestionData::new("Guardian name?", "guardian").with_trigger("c1", "true"),
    ),
    FlowNode::end("end", None),
  ];
  let edges = vec![
    edge("e1", "start", "q_age"),
    edge("e2", "q_age", "c1"),
    handle_edge("f", "c1", "q_guardian", "false"),
    edge("e3", "q_guardian", "end"),
  ];
  let graph = Arc::new(FlowGraph::new(nodes, edges).unwrap());
  let mut interp = FlowInterpreter::default();
  interp.start(graph).unwrap();
  let events = interp.submit_answer("40").unwrap();
  assert_eq!(events, vec![completed(vars(&[("age", "40")]), None)]);
  assert!(interp.trace().entries.iter().any(|e| matches!(
    &e.event,
    TraceEvent::GuardRejected { target_id, .. } if target_id == "q_guardian"
  )));
}

#[test]
fn observer_sees_every_event() {
  let seen = Arc::new(Mutex::new(vec![]));
  let sink = Arc::clone(&seen);
  let mut interp = FlowInterpreter::default().with_observer(move |e: &FlowEvent| {
    sink.lock().unwrap().push(e.clone());
  });
  let mut all = interp.start(age_graph()).unwrap();
  all.extend(interp.submit_answer("20").unwrap());
  assert_eq!(*seen.lock().unwrap(), all);
}

#[test]
fn history_is_recorded_when_enabled() {
  let config = EngineConfig {
    record_history: true,
    ..EngineConfig::default()
  };
  let mut interp = FlowInterpreter::new(config);
  interp.start(age_graph()).unwrap();
  interp.submit_answer("20").unwrap();
  let history = interp.variables().history().unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].node_id, "q_age");
  assert!(FlowInterpreter::default().variables().history().is_none());
}

#[test]
fn trace_can_be_disabled() {
  let config = EngineConfig {
    record_trace: false,
    ..EngineConfig::default()
  };
  let mut interp = FlowInterpreter::new(config);
  interp.start(age_graph()).unwrap();
  assert!(interp.trace().entries.is_empty());
}

#[test]
fn trace_records_answers_and_suspension() {
  let mut interp = FlowInterpreter::default();
  interp.start(age_graph()).unwrap();
  interp.submit_answer("25").unwrap();
  let events: Vec<_> = interp.trace().entries.iter().map(|e| &e.event).collect();
  assert_eq!(
    events.first(),
    Some(&&TraceEvent::SessionStarted {
      start_node_id: "start".to_string()
    })
  );
  assert!(events.contains(&&TraceEvent::Suspended {
    node_id: "q_age".to_string()
  }));
  assert!(events.contains(&&TraceEvent::AnswerCommitted {
    node_id: "q_age".to_string(),
    variable: "age".to_string(),
    value: "25".to_string(),
  }));
  assert_eq!(
    events.last(),
    Some(&&TraceEvent::Completed {
      early_termination: false
    })
  );
  assert!(interp.trace().started_at.is_some());
  assert!(interp.trace().finished_at.is_some());
}

#[test]
fn snapshot_restore_resumes_at_question() {
  let graph = age_graph();
  let mut interp = FlowInterpreter::default();
  interp.start(Arc::clone(&graph)).unwrap();
  let snap = interp.snapshot();
  assert_eq!(snap.cursor.as_deref(), Some("q_age"));

  let mut restored =
    FlowInterpreter::restore(EngineConfig::default(), graph, snap.clone()).unwrap();
  assert_eq!(restored.session_id(), interp.session_id());
  assert_eq!(restored.state(), SessionState::AwaitingInput);
  let events = restored.submit_answer("12").unwrap();
  assert_eq!(events, vec![completed(vars(&[("age", "12")]), Some("minor"))]);
}

#[test]
fn restore_rejects_bad_cursor() {
  let graph = age_graph();
  let mut interp = FlowInterpreter::default();
  interp.start(Arc::clone(&graph)).unwrap();
  let snap = interp.snapshot();

  let mut at_condition = snap.clone();
  at_condition.cursor = Some("c1".to_string());
  assert_eq!(
    FlowInterpreter::restore(EngineConfig::default(), Arc::clone(&graph), at_condition)
      .unwrap_err(),
    RestoreError::CursorNotQuestion {
      node_id: "c1".to_string()
    }
  );

  let mut missing = snap.clone();
  missing.cursor = None;
  assert_eq!(
    FlowInterpreter::restore(EngineConfig::default(), Arc::clone(&graph), missing).unwrap_err(),
    RestoreError::MissingCursor
  );

  let mut ghost = snap;
  ghost.cursor = Some("ghost".to_string());
  assert_eq!(
    FlowInterpreter::restore(EngineConfig::default(), graph, ghost).unwrap_err(),
    RestoreError::Graph(GraphError::NodeNotFound {
      node_id: "ghost".to_string()
    })
  );
}

#[test]
fn aborted_snapshot_keeps_reason() {
  let nodes = vec![
    FlowNode::start("start"),
    FlowNode::message("m", "again"),
    FlowNode::condition("c1", ConditionSpec::Simple(RuleSet::always())),
    FlowNode::end("end", None),
  ];
  let edges = vec![
    edge("e1", "start", "m"),
    edge("e2", "m", "c1"),
    handle_edge("t", "c1", "m", "true"),
    handle_edge("f", "c1", "end", "false"),
  ];
  let graph = Arc::new(FlowGraph::new(nodes, edges).unwrap());
  let mut interp = FlowInterpreter::default();
  interp.start(Arc::clone(&graph)).unwrap();
  let reason = RuntimeAbort::CycleWithoutInput {
    node_id: "m".to_string(),
  };
  assert_eq!(interp.abort_reason(), Some(&reason));

  let json = serde_json::to_string(&interp.snapshot()).unwrap();
  let snap: SessionSnapshot = serde_json::from_str(&json).unwrap();
  let restored = FlowInterpreter::restore(EngineConfig::default(), graph, snap).unwrap();
  assert_eq!(restored.state(), SessionState::Aborted);
  assert_eq!(restored.abort_reason(), Some(&reason));
}
