//! Execution trace save/load (JSON), for debugging sessions after the fact.

use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::types::ExecutionTrace;

/// Default filename for a trace under a run directory.
pub const TRACE_FILENAME: &str = "trace.json";

/// Per-session trace file under `dir`: `trace-<session_id>.json`.
pub fn session_trace_path(dir: &Path, trace: &ExecutionTrace) -> PathBuf {
  dir.join(format!("trace-{}.json", trace.session_id))
}

/// Writes `trace` to `path` as pretty JSON, creating the parent directory if needed.
#[instrument(level = "trace", skip(path, trace), fields(session_id = %trace.session_id))]
pub fn write_trace(path: &Path, trace: &ExecutionTrace) -> Result<(), Error> {
  let json = serde_json::to_string_pretty(trace).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)?;
  debug!(entries = trace.entries.len(), "trace written");
  Ok(())
}

/// Loads a trace from `path`.
///
/// Fails with `InvalidData` when the file is not a trace, was written by a newer log
/// format, or its step numbers are not `1..=n` in order.
#[instrument(level = "trace", skip(path))]
pub fn load_trace(path: &Path) -> Result<ExecutionTrace, Error> {
  let bytes = std::fs::read(path)?;
  let trace: ExecutionTrace = serde_json::from_slice(&bytes).map_err(|e| {
    Error::new(
      ErrorKind::InvalidData,
      format!("{} is not an execution trace: {}", path.display(), e),
    )
  })?;
  if trace.version > ExecutionTrace::VERSION {
    return Err(Error::new(
      ErrorKind::InvalidData,
      format!(
        "unsupported trace version {} (newest known is {})",
        trace.version,
        ExecutionTrace::VERSION
      ),
    ));
  }
  if let Some((i, entry)) = trace
    .entries
    .iter()
    .enumerate()
    .find(|(i, e)| e.step as usize != i + 1)
  {
    return Err(Error::new(
      ErrorKind::InvalidData,
      format!("trace entry {} has step {}, expected {}", i, entry.step, i + 1),
    ));
  }
  Ok(trace)
}
