//! Metric aggregation: reduce a sprint's issues into counts, rates and point sums.
//!
//! Every committed issue lands in exactly one of completed / in-progress /
//! not-started. Story points are only aggregated when at least one issue in
//! scope is estimated; otherwise they are reported as not tracked.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::EngineError;
use crate::types::{Issue, Priority};

/// Story point sums mirroring the count partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointTotals {
  pub committed: f64,
  pub completed: f64,
  pub in_progress: f64,
  pub not_started: f64,
  /// Issues in scope carrying an estimate.
  pub estimated_issues: usize,
}

impl PointTotals {
  pub fn completion_rate(&self) -> f64 {
    if self.committed > 0.0 {
      self.completed / self.committed
    } else {
      0.0
    }
  }
}

/// Point-based metrics, or an explicit marker that the team does not estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "tracking", rename_all = "snake_case")]
pub enum StoryPoints {
  NotTracked,
  Tracked(PointTotals),
}

impl StoryPoints {
  pub fn totals(&self) -> Option<&PointTotals> {
    match self {
      Self::NotTracked => None,
      Self::Tracked(t) => Some(t),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintMetrics {
  pub committed: usize,
  pub completed: usize,
  pub in_progress: usize,
  pub not_started: usize,
  /// completed / committed as a fraction; 0 when nothing is committed.
  pub completion_rate: f64,
  /// completion_rate as a percentage, one decimal.
  pub completion_pct: f64,
  pub story_points: StoryPoints,
  /// Issue count per assignee id.
  pub by_assignee: BTreeMap<String, usize>,
  pub unassigned: usize,
  pub by_priority: BTreeMap<Priority, usize>,
}

/// Completed work for one sprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Velocity {
  pub issues: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub points: Option<f64>,
}

impl SprintMetrics {
  /// Build metrics from pre-aggregated counts (e.g. a stored historical snapshot).
  ///
  /// The three partitions must sum to `committed`.
  pub fn from_counts(
    committed: usize,
    completed: usize,
    in_progress: usize,
    not_started: usize,
  ) -> Result<Self, EngineError> {
    if completed + in_progress + not_started != committed {
      return Err(EngineError::input(
        "metrics",
        &format!(
          "completed ({}) + in_progress ({}) + not_started ({}) must equal committed ({})",
          completed, in_progress, not_started, committed
        ),
      ));
    }
    let completion_rate = ratio(completed, committed);
    Ok(Self {
      committed,
      completed,
      in_progress,
      not_started,
      completion_rate,
      completion_pct: round1(completion_rate * 100.0),
      story_points: StoryPoints::NotTracked,
      by_assignee: BTreeMap::new(),
      unassigned: 0,
      by_priority: BTreeMap::new(),
    })
  }

  pub fn velocity(&self) -> Velocity {
    Velocity {
      issues: self.completed,
      points: self.story_points.totals().map(|t| t.completed),
    }
  }
}

/// Issues currently belonging to `sprint_id`.
pub fn scope<'a>(issues: &'a [Issue], sprint_id: &str) -> Vec<&'a Issue> {
  issues
    .iter()
    .filter(|i| i.sprint_id.as_deref() == Some(sprint_id))
    .collect()
}

/// Aggregate a collection of issues (already scoped to one sprint).
///
/// Empty input yields all-zero metrics.
pub fn aggregate<'a, I>(issues: I) -> SprintMetrics
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut committed = 0;
  let mut completed = 0;
  let mut in_progress = 0;
  let mut not_started = 0;
  let mut points = PointTotals {
    committed: 0.0,
    completed: 0.0,
    in_progress: 0.0,
    not_started: 0.0,
    estimated_issues: 0,
  };
  let mut by_assignee: BTreeMap<String, usize> = BTreeMap::new();
  let mut unassigned = 0;
  let mut by_priority: BTreeMap<Priority, usize> = BTreeMap::new();

  for issue in issues {
    committed += 1;
    let sp = issue.story_points.unwrap_or(0.0);
    if issue.story_points.is_some() {
      points.estimated_issues += 1;
    }
    points.committed += sp;

    if issue.status.is_resolved() {
      completed += 1;
      points.completed += sp;
    } else if issue.status.is_in_progress() {
      in_progress += 1;
      points.in_progress += sp;
    } else {
      not_started += 1;
      points.not_started += sp;
    }

    match &issue.assignee {
      Some(p) => *by_assignee.entry(p.id.clone()).or_insert(0) += 1,
      None => unassigned += 1,
    }
    *by_priority.entry(issue.priority).or_insert(0) += 1;
  }

  let story_points = if points.estimated_issues > 0 {
    StoryPoints::Tracked(points)
  } else {
    StoryPoints::NotTracked
  };
  let completion_rate = ratio(completed, committed);

  SprintMetrics {
    committed,
    completed,
    in_progress,
    not_started,
    completion_rate,
    completion_pct: round1(completion_rate * 100.0),
    story_points,
    by_assignee,
    unassigned,
    by_priority,
  }
}

/// num / den, or 0 when den is 0.
pub fn ratio(num: usize, den: usize) -> f64 {
  if den == 0 {
    0.0
  } else {
    num as f64 / den as f64
  }
}

/// Round to one decimal place.
pub fn round1(x: f64) -> f64 {
  (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Person, Status};
  use proptest::prelude::*;

  fn issue(key: &str, status: Status) -> Issue {
    Issue::new(key, Priority::Normal, status).in_sprint("s1")
  }

  #[test]
  fn empty_input_is_all_zero() {
    let m = aggregate(&[] as &[Issue]);
    assert_eq!(m.committed, 0);
    assert_eq!(m.completion_rate, 0.0);
    assert_eq!(m.story_points, StoryPoints::NotTracked);
  }

  #[test]
  fn partitions_by_status() {
    let issues = vec![
      issue("A-1", Status::Done),
      issue("A-2", Status::InProgress),
      issue("A-3", Status::Review),
      issue("A-4", Status::ToDo),
    ];
    let m = aggregate(&issues);
    assert_eq!(m.committed, 4);
    assert_eq!(m.completed, 1);
    assert_eq!(m.in_progress, 2);
    assert_eq!(m.not_started, 1);
    assert!((m.completion_rate - 0.25).abs() < f64::EPSILON);
    assert_eq!(m.completion_pct, 25.0);
  }

  #[test]
  fn points_not_tracked_without_estimates() {
    let issues = vec![issue("A-1", Status::Done), issue("A-2", Status::ToDo)];
    assert_eq!(aggregate(&issues).story_points, StoryPoints::NotTracked);
  }

  #[test]
  fn points_tracked_when_any_issue_estimated() {
    let issues = vec![
      issue("A-1", Status::Done).with_points(5.0),
      issue("A-2", Status::InProgress).with_points(3.0),
      issue("A-3", Status::ToDo),
    ];
    let m = aggregate(&issues);
    let totals = m.story_points.totals().copied().unwrap();
    assert_eq!(totals.committed, 8.0);
    assert_eq!(totals.completed, 5.0);
    assert_eq!(totals.in_progress, 3.0);
    assert_eq!(totals.not_started, 0.0);
    assert_eq!(totals.estimated_issues, 2);
    assert_eq!(m.velocity().points, Some(5.0));
  }

  #[test]
  fn zero_point_estimates_still_count_as_tracked() {
    let issues = vec![issue("A-1", Status::Done).with_points(0.0)];
    let m = aggregate(&issues);
    assert!(matches!(m.story_points, StoryPoints::Tracked(_)));
  }

  #[test]
  fn scope_selects_current_membership() {
    let issues = vec![
      issue("A-1", Status::Done),
      Issue::new("A-2", Priority::Major, Status::ToDo).in_sprint("s2"),
      Issue::new("A-3", Priority::Major, Status::ToDo),
    ];
    let scoped = scope(&issues, "s1");
    assert_eq!(scoped.len(), 1);
    assert_eq!(aggregate(scoped).committed, 1);
  }

  #[test]
  fn per_assignee_and_priority_counts() {
    let alice = Person::new("alice", "Alice");
    let issues = vec![
      issue("A-1", Status::Done).with_assignee(alice.clone()),
      Issue::new("A-2", Priority::Critical, Status::ToDo).with_assignee(alice),
      issue("A-3", Status::ToDo),
    ];
    let m = aggregate(&issues);
    assert_eq!(m.by_assignee.get("alice"), Some(&2));
    assert_eq!(m.unassigned, 1);
    assert_eq!(m.by_priority.get(&Priority::Critical), Some(&1));
    assert_eq!(m.by_priority.get(&Priority::Normal), Some(&2));
  }

  #[test]
  fn from_counts_rejects_broken_partition() {
    assert!(SprintMetrics::from_counts(45, 25, 14, 6).is_ok());
    let err = SprintMetrics::from_counts(10, 5, 5, 5).unwrap_err();
    assert!(err.to_string().contains("must equal committed"));
  }

  #[test]
  fn from_counts_rounds_completion_pct() {
    let m = SprintMetrics::from_counts(45, 25, 14, 6).unwrap();
    assert_eq!(m.completion_pct, 55.6);
  }

  fn status_strategy() -> impl Strategy<Value = Status> {
    prop_oneof![
      Just(Status::ToDo),
      Just(Status::InProgress),
      Just(Status::Review),
      Just(Status::Done),
    ]
  }

  proptest! {
    #[test]
    fn partition_is_exhaustive_and_disjoint(statuses in prop::collection::vec(status_strategy(), 0..64)) {
      let issues: Vec<Issue> = statuses
        .iter()
        .enumerate()
        .map(|(i, s)| issue(&format!("P-{}", i), *s))
        .collect();
      let m = aggregate(&issues);
      prop_assert_eq!(m.committed, issues.len());
      prop_assert_eq!(m.completed + m.in_progress + m.not_started, m.committed);
      prop_assert!((0.0..=1.0).contains(&m.completion_rate));
    }
  }
}
