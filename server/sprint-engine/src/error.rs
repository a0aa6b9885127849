//! Structured error types for the sprint engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// Malformed or inconsistent input. Always surfaced, never corrected.
  #[error("input: {field}: {reason}")]
  Input { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn input(field: &str, reason: &str) -> Self {
    Self::Input {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  /// Field name for input errors (used by the binary's error lines).
  pub fn field(&self) -> Option<&str> {
    match self {
      Self::Input { field, .. } => Some(field),
      Self::Json(_) => None,
    }
  }
}
