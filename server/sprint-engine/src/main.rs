//! Binary entrypoint: read JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is an AnalysisRequest. Each output line is either:
//! - A SprintReport (valid request)
//! - An ErrorOutput (invalid JSON or rejected input)
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to see more.

use std::io::{self, BufRead, Write};

use sprint_engine::types::ErrorOutput;
use sprint_engine::{AnalysisRequest, Engine, EngineError};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .init();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let engine = Engine::with_defaults();

  for (lineno, line) in stdin.lock().lines().enumerate() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        tracing::error!(error = %e, "read error");
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let raw: AnalysisRequest = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        let e = EngineError::from(e);
        tracing::warn!(line = lineno + 1, error = %e, "rejected request");
        emit(&mut out, &ErrorOutput::new(e.to_string()));
        continue;
      }
    };

    match engine.analyze(&raw) {
      Ok(report) => emit(&mut out, &report),
      Err(e) => {
        tracing::warn!(line = lineno + 1, sprint = %raw.sprint_id, error = %e, "rejected request");
        let err = match &e {
          EngineError::Input { field, reason } => {
            ErrorOutput::new(reason.clone()).with_field(field.clone())
          }
          _ => ErrorOutput::new(e.to_string()),
        };
        emit(&mut out, &err);
      }
    }
  }

  let _ = out.flush();
}

fn emit<W: Write, T: serde::Serialize>(out: &mut W, value: &T) {
  let _ = serde_json::to_writer(&mut *out, value);
  let _ = writeln!(out);
}
