//! CLI: Run a conversation flow from a JSON flow document.
//!
//! Questions are answered from `--answer` values in order; once those run out, answers are
//! read from stdin (a number picks the n-th option when the question has options).
//!
//! Usage: `run_flow [OPTIONS] <path-to-flow-json>`
//! Example: run_flow --answer 25 flows/age_check.json
//!
//! Set RUST_LOG=convoflow=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use convoflow::config::DeadEndPolicy;
use convoflow::types::QuestionOption;
use convoflow::{
  EngineConfig, FlowEvent, FlowInterpreter, InvalidAnswer, SessionState, load_flow, trace_io,
};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Run a conversation flow from a JSON flow document.
#[derive(Parser, Debug)]
#[command(name = "run_flow")]
#[command(
  after_help = r#"Environment variables (overridden by the matching flags):
  CONVOFLOW_MAX_STEPS       Most nodes entered without waiting for input (default 1000).
  CONVOFLOW_RECORD_HISTORY  Keep the variable write history (true/false).
  CONVOFLOW_RECORD_TRACE    Keep the execution trace (true/false, default true).
  CONVOFLOW_DEAD_END        complete | abort (default complete).

Examples:
  run_flow flows/cv_wizard.json
  run_flow --answer 25 --answer yes --trace-out run/trace.json flows/cv_wizard.json"#
)]
struct Args {
  /// Answer for the next question; repeat for each question in order.
  #[arg(long = "answer", value_name = "VALUE")]
  answers: Vec<String>,

  /// Write the execution trace as JSON to this path when the session ends. An existing
  /// directory gets a `trace-<session id>.json` file.
  #[arg(long, value_name = "PATH")]
  trace_out: Option<PathBuf>,

  /// Most nodes entered without waiting for input.
  #[arg(long, value_name = "N")]
  max_steps: Option<usize>,

  /// What to do when no edge can be followed: complete | abort.
  #[arg(long, value_name = "POLICY")]
  dead_end: Option<DeadEndPolicy>,

  /// Path to the flow JSON document
  #[arg(value_name = "path-to-flow-json")]
  flow_path: PathBuf,
}

/// Where answers come from: scripted values first, then stdin.
struct AnswerSource {
  scripted: VecDeque<String>,
  stdin: io::StdinLock<'static>,
}

impl AnswerSource {
  fn next(&mut self) -> Option<String> {
    if let Some(a) = self.scripted.pop_front() {
      println!("> {}", a);
      return Some(a);
    }
    print!("> ");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match self.stdin.read_line(&mut line) {
      Ok(0) | Err(_) => None,
      Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(io::stderr)
    .init();

  let args = Args::parse();

  // Flags override env vars.
  let mut config = EngineConfig::from_env();
  if let Some(n) = args.max_steps {
    config.max_auto_steps = n;
  }
  if let Some(p) = args.dead_end {
    config.dead_end_policy = p;
  }
  info!(config = ?config, flow = %args.flow_path.display(), "run_flow starting");

  let graph = match load_flow(&args.flow_path) {
    Ok(g) => Arc::new(g),
    Err(e) => {
      eprintln!("Error loading {}: {}", args.flow_path.display(), e);
      process::exit(1);
    }
  };
  for w in graph.warnings() {
    eprintln!("Warning: {}", w);
  }

  let mut interp = FlowInterpreter::new(config);
  let mut answers = AnswerSource {
    scripted: args.answers.into_iter().collect(),
    stdin: io::stdin().lock(),
  };

  let mut events = match interp.start(graph) {
    Ok(ev) => ev,
    Err(e) => {
      eprintln!("Error starting flow: {}", e);
      process::exit(1);
    }
  };

  let code = loop {
    let mut pending: Option<Vec<QuestionOption>> = None;
    for event in &events {
      match event {
        FlowEvent::MessagePresented { text, .. } => println!("{}", text),
        FlowEvent::QuestionPresented { text, options, .. } => {
          println!("{}", text);
          for (i, o) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, o.label);
          }
          pending = Some(options.clone());
        }
        FlowEvent::FlowCompleted {
          variables,
          early_termination,
          ..
        } => {
          if *early_termination {
            println!("Flow ended early (no further step).");
          } else {
            println!("Flow completed.");
          }
          match serde_json::to_string_pretty(variables) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error encoding variables: {}", e),
          }
        }
        FlowEvent::FlowAborted { reason } => eprintln!("Flow aborted: {}", reason),
      }
    }
    if events.iter().any(FlowEvent::is_terminal) {
      break if interp.state() == SessionState::Completed { 0 } else { 1 };
    }
    let Some(options) = pending else {
      eprintln!("Flow stopped without a question or completion");
      break 1;
    };

    let Some(answer) = answers.next() else {
      eprintln!("No more input; session left waiting at a question.");
      break 1;
    };
    match answer_question(&mut interp, &options, &answer) {
      Ok(ev) => events = ev,
      Err(InvalidAnswer::UnknownOption { value, .. }) => {
        eprintln!("'{}' is not one of the options, try again.", value);
        events = reask(&interp);
      }
      Err(e) => {
        eprintln!("Error: {}", e);
        break 1;
      }
    }
  };

  if let Some(out) = args.trace_out.as_deref() {
    let path = if out.is_dir() {
      trace_io::session_trace_path(out, interp.trace())
    } else {
      out.to_path_buf()
    };
    if let Err(e) = trace_io::write_trace(&path, interp.trace()) {
      eprintln!("Error writing trace {}: {}", path.display(), e);
    } else {
      info!(path = %path.display(), "trace written");
    }
  }
  process::exit(code);
}

/// Re-presents the pending question after a rejected answer.
fn reask(interp: &FlowInterpreter) -> Vec<FlowEvent> {
  let node_id = interp
    .current_node()
    .map(|n| n.id.clone())
    .unwrap_or_default();
  interp
    .pending_question()
    .map(|q| FlowEvent::QuestionPresented {
      node_id,
      text: q.text.clone(),
      options: q.options.clone(),
      variable_name: q.variable_name.clone(),
    })
    .into_iter()
    .collect()
}

/// Submits `answer`, treating a 1-based number as an option pick when options exist.
fn answer_question(
  interp: &mut FlowInterpreter,
  options: &[QuestionOption],
  answer: &str,
) -> Result<Vec<FlowEvent>, InvalidAnswer> {
  if options.is_empty() {
    return interp.submit_answer(answer);
  }
  let picked = answer
    .trim()
    .parse::<usize>()
    .ok()
    .and_then(|n| n.checked_sub(1))
    .and_then(|i| options.get(i));
  match picked {
    Some(o) => interp.select_option(&o.value),
    None => interp.select_option(answer.trim()),
  }
}
