//! Engine configuration with environment overrides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable overriding [EngineConfig::max_auto_steps].
pub const ENV_MAX_STEPS: &str = "CONVOFLOW_MAX_STEPS";
/// Environment variable overriding [EngineConfig::record_history].
pub const ENV_RECORD_HISTORY: &str = "CONVOFLOW_RECORD_HISTORY";
/// Environment variable overriding [EngineConfig::record_trace].
pub const ENV_RECORD_TRACE: &str = "CONVOFLOW_RECORD_TRACE";
/// Environment variable overriding [EngineConfig::dead_end_policy].
pub const ENV_DEAD_END: &str = "CONVOFLOW_DEAD_END";

/// What the interpreter does when a condition or guard leaves no edge to follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadEndPolicy {
  /// Complete the session with `early_termination` set.
  #[default]
  Complete,
  /// Abort the session with the resolver's reason.
  Abort,
}

impl FromStr for DeadEndPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "complete" => Ok(DeadEndPolicy::Complete),
      "abort" => Ok(DeadEndPolicy::Abort),
      other => Err(format!("unknown dead-end policy '{}'", other)),
    }
  }
}

impl fmt::Display for DeadEndPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeadEndPolicy::Complete => write!(f, "complete"),
      DeadEndPolicy::Abort => write!(f, "abort"),
    }
  }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Most nodes entered in one pass before the session aborts.
  pub max_auto_steps: usize,
  /// Keep the variable write history.
  pub record_history: bool,
  /// Keep the per-step execution trace.
  pub record_trace: bool,
  pub dead_end_policy: DeadEndPolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_auto_steps: 1000,
      record_history: false,
      record_trace: true,
      dead_end_policy: DeadEndPolicy::Complete,
    }
  }
}

impl EngineConfig {
  /// Defaults overlaid with `CONVOFLOW_*` environment variables.
  pub fn from_env() -> Self {
    Self::default().with_overrides(|key| std::env::var(key).ok())
  }

  /// Overlays values returned by `lookup` for the `CONVOFLOW_*` keys. Unparsable values
  /// are logged and ignored.
  pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(v) = lookup(ENV_MAX_STEPS) {
      match v.trim().parse::<usize>() {
        Ok(n) if n > 0 => self.max_auto_steps = n,
        _ => warn!(key = ENV_MAX_STEPS, value = %v, "ignoring invalid config value"),
      }
    }
    if let Some(v) = lookup(ENV_RECORD_HISTORY) {
      match parse_flag(&v) {
        Some(b) => self.record_history = b,
        None => warn!(key = ENV_RECORD_HISTORY, value = %v, "ignoring invalid config value"),
      }
    }
    if let Some(v) = lookup(ENV_RECORD_TRACE) {
      match parse_flag(&v) {
        Some(b) => self.record_trace = b,
        None => warn!(key = ENV_RECORD_TRACE, value = %v, "ignoring invalid config value"),
      }
    }
    if let Some(v) = lookup(ENV_DEAD_END) {
      match v.parse::<DeadEndPolicy>() {
        Ok(p) => self.dead_end_policy = p,
        Err(e) => warn!(key = ENV_DEAD_END, error = %e, "ignoring invalid config value"),
      }
    }
    self
  }
}

fn parse_flag(s: &str) -> Option<bool> {
  match s.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}
