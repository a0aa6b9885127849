//! Normalize inbound records into the canonical issue model.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::types::*;

/// Validated contents of one analysis request.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub now: DateTime<Utc>,
  pub sprints: Vec<Sprint>,
  pub issues: Vec<Issue>,
}

impl Snapshot {
  pub fn sprint(&self, id: &str) -> Option<&Sprint> {
    self.sprints.iter().find(|s| s.id == id)
  }
}

/// Parse and validate a request into a Snapshot.
///
/// Rejects duplicate ids and issues that reference sprints not supplied in the request.
pub fn normalize(raw: &AnalysisRequest) -> Result<Snapshot, EngineError> {
  let now = parse_timestamp("now", &raw.now)?;

  let sprints = raw
    .sprints
    .iter()
    .enumerate()
    .map(|(i, s)| normalize_sprint(s, i))
    .collect::<Result<Vec<_>, EngineError>>()?;

  let mut sprint_ids = HashSet::new();
  for (i, s) in sprints.iter().enumerate() {
    if !sprint_ids.insert(s.id.as_str()) {
      return Err(EngineError::input(
        &format!("sprints[{}].id", i),
        &format!("duplicate sprint id {}", s.id),
      ));
    }
  }

  let issues = raw
    .issues
    .iter()
    .enumerate()
    .map(|(i, issue)| normalize_issue(issue, i))
    .collect::<Result<Vec<_>, EngineError>>()?;

  let mut keys = HashSet::new();
  for (i, issue) in issues.iter().enumerate() {
    if !keys.insert(issue.key.as_str()) {
      return Err(EngineError::input(
        &format!("issues[{}].key", i),
        &format!("duplicate issue key {}", issue.key),
      ));
    }
    if let Some(sid) = &issue.sprint_id {
      if !sprint_ids.contains(sid.as_str()) {
        return Err(EngineError::input(
          &format!("issues[{}].sprint_id", i),
          &format!("references unknown sprint {}", sid),
        ));
      }
    }
  }

  Ok(Snapshot {
    now,
    sprints,
    issues,
  })
}

/// Normalize one sprint record. `index` only feeds error field names.
pub fn normalize_sprint(raw: &InboundSprint, index: usize) -> Result<Sprint, EngineError> {
  let field = |name: &str| format!("sprints[{}].{}", index, name);

  if raw.id.trim().is_empty() {
    return Err(EngineError::input(&field("id"), "must not be empty"));
  }
  let start = parse_timestamp(&field("start_date"), &raw.start_date)?;
  let end = parse_timestamp(&field("end_date"), &raw.end_date)?;
  if end < start {
    return Err(EngineError::input(
      &field("end_date"),
      "must not be before start_date",
    ));
  }
  let state = SprintState::from_str_loose(&raw.state)
    .ok_or_else(|| EngineError::input(&field("state"), "expected future|active|closed"))?;

  Ok(Sprint {
    id: raw.id.trim().to_string(),
    name: raw.name.clone(),
    start,
    end,
    state,
    board_id: raw.board_id.clone(),
  })
}

/// Normalize one issue record. `index` only feeds error field names.
pub fn normalize_issue(raw: &InboundIssue, index: usize) -> Result<Issue, EngineError> {
  let field = |name: &str| format!("issues[{}].{}", index, name);

  if raw.key.trim().is_empty() {
    return Err(EngineError::input(&field("key"), "must not be empty"));
  }

  let status_name = raw
    .status
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| EngineError::input(&field("status"), "must not be empty"))?;
  let status = Status::from_str_loose(status_name).ok_or_else(|| {
    EngineError::input(
      &field("status"),
      &format!("unknown status {:?}", status_name),
    )
  })?;

  let priority = match raw.priority.as_deref() {
    Some(name) => Priority::from_str_loose(name).ok_or_else(|| {
      EngineError::input(&field("priority"), &format!("unknown priority {:?}", name))
    })?,
    None => Priority::Undefined,
  };

  if let Some(points) = raw.story_points {
    if !points.is_finite() || points < 0.0 {
      return Err(EngineError::input(
        &field("story_points"),
        "must be a non-negative number",
      ));
    }
  }

  let assignee = match &raw.assignee {
    Some(p) if p.id.trim().is_empty() => {
      return Err(EngineError::input(&field("assignee.id"), "must not be empty"));
    }
    Some(p) => Some(Person::new(
      p.id.trim(),
      p.display_name.clone().unwrap_or_else(|| p.id.trim().to_string()),
    )),
    None => None,
  };

  let sprint_id = match raw.sprint_id.as_deref().map(str::trim) {
    Some("") => {
      return Err(EngineError::input(&field("sprint_id"), "must not be empty"));
    }
    Some(id) => Some(id.to_string()),
    None => None,
  };

  let created = raw
    .created
    .as_deref()
    .map(|t| parse_timestamp(&field("created"), t))
    .transpose()?;
  let updated = raw
    .updated
    .as_deref()
    .map(|t| parse_timestamp(&field("updated"), t))
    .transpose()?;

  Ok(Issue {
    key: raw.key.trim().to_string(),
    title: raw.title.clone(),
    priority,
    status,
    assignee,
    story_points: raw.story_points,
    sprint_id,
    created,
    updated,
  })
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, EngineError> {
  DateTime::parse_from_rfc3339(value)
    .map(|t| t.with_timezone(&Utc))
    .map_err(|e| EngineError::input(field, &format!("invalid RFC3339: {}", e)))
}
