//! Core types for the sprint engine (JSON contracts + normalized issue model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigOverrides;
use crate::health::HealthAssessment;
use crate::metrics::SprintMetrics;
use crate::priority::PriorityReport;
use crate::recommend::Finding;
use crate::trend::TrendReport;
use crate::workload::WorkloadReport;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the caller sends)
// ---------------------------------------------------------------------------

/// One analysis request line from stdin. Unknown fields are silently ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
  /// Sprint under analysis; must appear in `sprints`.
  pub sprint_id: String,
  /// Evaluation instant (RFC3339). Injected so classification stays pure.
  pub now: String,
  pub sprints: Vec<InboundSprint>,
  pub issues: Vec<InboundIssue>,
  /// Earlier sprint ids in chronological order, oldest first.
  #[serde(default)]
  pub history: Vec<String>,
  /// Threshold overrides layered on the engine's config for this request.
  #[serde(default)]
  pub options: Option<ConfigOverrides>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundSprint {
  pub id: String,
  #[serde(default)]
  pub name: String,
  pub start_date: String,
  pub end_date: String,
  pub state: String,
  #[serde(default)]
  pub board_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundIssue {
  pub key: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub priority: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub assignee: Option<InboundPerson>,
  #[serde(default)]
  pub story_points: Option<f64>,
  #[serde(default)]
  pub sprint_id: Option<String>,
  #[serde(default)]
  pub created: Option<String>,
  #[serde(default)]
  pub updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundPerson {
  pub id: String,
  #[serde(default)]
  pub display_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Closed enums (normalized)
// ---------------------------------------------------------------------------

/// Issue priority. Declaration order is ascending, so `Critical` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
  Undefined,
  Minor,
  Normal,
  Major,
  Critical,
}

impl Priority {
  /// All levels, most important first.
  pub const ALL: [Priority; 5] = [
    Priority::Critical,
    Priority::Major,
    Priority::Normal,
    Priority::Minor,
    Priority::Undefined,
  ];

  /// Parse a tracker priority name. `None` means the name is not recognized.
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "critical" | "blocker" | "highest" => Some(Self::Critical),
      "major" | "high" => Some(Self::Major),
      "normal" | "medium" => Some(Self::Normal),
      "minor" | "low" | "lowest" | "trivial" => Some(Self::Minor),
      "" | "undefined" | "none" | "no priority" => Some(Self::Undefined),
      _ => None,
    }
  }

  /// Critical and Major count as high priority for focus and gap analysis.
  pub fn is_high(self) -> bool {
    matches!(self, Self::Critical | Self::Major)
  }
}

/// Workflow status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
  ToDo,
  InProgress,
  Review,
  Done,
}

impl Status {
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "to do" | "todo" | "to_do" | "open" | "backlog" | "new" | "selected for development" => {
        Some(Self::ToDo)
      }
      "in progress" | "in_progress" | "in-progress" | "in development" | "doing" => {
        Some(Self::InProgress)
      }
      "review" | "in review" | "code review" | "qa" | "testing" => Some(Self::Review),
      "done" | "complete" | "completed" | "closed" | "resolved" => Some(Self::Done),
      _ => None,
    }
  }

  /// Only `Done` counts toward completion.
  pub fn is_resolved(self) -> bool {
    matches!(self, Self::Done)
  }

  /// `InProgress` and `Review` both occupy a WIP slot.
  pub fn is_in_progress(self) -> bool {
    matches!(self, Self::InProgress | Self::Review)
  }

  pub fn is_not_started(self) -> bool {
    matches!(self, Self::ToDo)
  }
}

/// Sprint lifecycle: Future -> Active -> Closed. Ordered along the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintState {
  Future,
  Active,
  Closed,
}

impl SprintState {
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "future" | "planned" => Some(Self::Future),
      "active" | "open" => Some(Self::Active),
      "closed" | "complete" | "completed" => Some(Self::Closed),
      _ => None,
    }
  }
}

// ---------------------------------------------------------------------------
// Normalized issue model
// ---------------------------------------------------------------------------

/// Assignee reference. Ordered by id so reports sort stably.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Person {
  pub id: String,
  pub display_name: String,
}

impl Person {
  pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      display_name: display_name.into(),
    }
  }
}

/// Canonical issue after normalization + validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
  pub key: String,
  pub title: String,
  pub priority: Priority,
  pub status: Status,
  pub assignee: Option<Person>,
  /// `None` means the issue is not estimated, not zero points.
  pub story_points: Option<f64>,
  pub sprint_id: Option<String>,
  pub created: Option<DateTime<Utc>>,
  pub updated: Option<DateTime<Utc>>,
}

impl Issue {
  /// Minimal issue for callers building the model directly.
  pub fn new(key: impl Into<String>, priority: Priority, status: Status) -> Self {
    Self {
      key: key.into(),
      title: String::new(),
      priority,
      status,
      assignee: None,
      story_points: None,
      sprint_id: None,
      created: None,
      updated: None,
    }
  }

  pub fn with_assignee(mut self, person: Person) -> Self {
    self.assignee = Some(person);
    self
  }

  pub fn with_points(mut self, points: f64) -> Self {
    self.story_points = Some(points);
    self
  }

  pub fn in_sprint(mut self, sprint_id: impl Into<String>) -> Self {
    self.sprint_id = Some(sprint_id.into());
    self
  }

  pub fn created_at(mut self, ts: DateTime<Utc>) -> Self {
    self.created = Some(ts);
    self
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprint {
  pub id: String,
  pub name: String,
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
  pub state: SprintState,
  pub board_id: Option<String>,
}

impl Sprint {
  /// Share of the sprint's calendar duration still ahead of `now`, in 0..1.
  ///
  /// Before the start the whole sprint remains; at or after the end nothing does.
  pub fn remaining_fraction(&self, now: DateTime<Utc>) -> f64 {
    if now <= self.start {
      return 1.0;
    }
    if now >= self.end {
      return 0.0;
    }
    let total = (self.end - self.start).num_seconds() as f64;
    let left = (self.end - now).num_seconds() as f64;
    (left / total).clamp(0.0, 1.0)
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SprintInfo {
  pub id: String,
  pub name: String,
  pub state: SprintState,
  pub start_date: String,
  pub end_date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub board_id: Option<String>,
}

impl From<&Sprint> for SprintInfo {
  fn from(sprint: &Sprint) -> Self {
    Self {
      id: sprint.id.clone(),
      name: sprint.name.clone(),
      state: sprint.state,
      start_date: sprint.start.to_rfc3339(),
      end_date: sprint.end.to_rfc3339(),
      board_id: sprint.board_id.clone(),
    }
  }
}

/// Full analysis of one sprint.
#[derive(Debug, Clone, Serialize)]
pub struct SprintReport {
  pub sprint: SprintInfo,
  pub metrics: SprintMetrics,
  pub health: HealthAssessment,
  pub trend: TrendReport,
  pub workload: WorkloadReport,
  pub priority: PriorityReport,
  pub findings: Vec<Finding>,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
