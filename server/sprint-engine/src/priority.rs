//! Priority gap analysis: priority x status coverage and unaddressed high-priority work.
//!
//! Backlog issues (no sprint) are checked too, so Critical work left out of
//! the sprint surfaces next to the gaps inside it.

use serde::{Serialize, Serializer};

use crate::config::Config;
use crate::types::{Issue, Person, Priority, Status};

/// A fraction that may have no denominator. Serialized as a number or `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Share {
  NotApplicable,
  Value(f64),
}

impl Share {
  pub fn of(part: usize, whole: usize) -> Self {
    if whole == 0 {
      Self::NotApplicable
    } else {
      Self::Value(((part as f64 / whole as f64) * 1000.0).round() / 1000.0)
    }
  }

  pub fn value(self) -> Option<f64> {
    match self {
      Self::NotApplicable => None,
      Self::Value(v) => Some(v),
    }
  }
}

impl Serialize for Share {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::NotApplicable => serializer.serialize_str("N/A"),
      Self::Value(v) => serializer.serialize_f64(*v),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityCoverage {
  pub priority: Priority,
  pub total: usize,
  pub in_progress: usize,
  pub completed: usize,
  pub not_started: usize,
  /// (in_progress + completed) / total.
  pub coverage: Share,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusLevel {
  High,
  Medium,
  Low,
  NotApplicable,
}

/// Is active and pending effort weighted toward Critical and Major work?
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityFocus {
  pub score: Share,
  pub level: FocusLevel,
  /// In-progress + not-started issues at Critical or Major.
  pub high_priority_open: usize,
  /// All in-progress + not-started issues.
  pub open: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncoveredIssue {
  pub rank: usize,
  pub key: String,
  pub title: String,
  pub priority: Priority,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee: Option<Person>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticalCoverage {
  /// At least as many Critical issues in the sprint as left in the backlog.
  Good,
  NeedsAttention,
}

/// Unresolved Critical / Major work outside any sprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacklogGaps {
  pub critical: usize,
  pub major: usize,
  pub critical_coverage: CriticalCoverage,
  /// Most urgent first, same ranking as `uncovered`.
  pub items: Vec<UncoveredIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityReport {
  /// One row per priority level, Critical first.
  pub coverage: Vec<PriorityCoverage>,
  pub focus: PriorityFocus,
  /// Critical / Major issues still in ToDo, most urgent first.
  pub uncovered: Vec<UncoveredIssue>,
  /// Critical issues exist but none is in progress or done.
  pub critical_idle: bool,
  pub backlog: BacklogGaps,
}

impl PriorityReport {
  pub fn row(&self, priority: Priority) -> Option<&PriorityCoverage> {
    self.coverage.iter().find(|r| r.priority == priority)
  }
}

/// Cross-tabulate a sprint's issues by priority and status, and compare its
/// Critical load against the unresolved backlog.
pub fn gaps(issues: &[&Issue], backlog: &[&Issue], config: &Config) -> PriorityReport {
  let coverage: Vec<PriorityCoverage> = Priority::ALL
    .iter()
    .map(|&priority| {
      let at_level = issues.iter().filter(|i| i.priority == priority);
      let (mut total, mut in_progress, mut completed, mut not_started) = (0, 0, 0, 0);
      for issue in at_level {
        total += 1;
        if issue.status.is_resolved() {
          completed += 1;
        } else if issue.status.is_in_progress() {
          in_progress += 1;
        } else {
          not_started += 1;
        }
      }
      PriorityCoverage {
        priority,
        total,
        in_progress,
        completed,
        not_started,
        coverage: Share::of(in_progress + completed, total),
      }
    })
    .collect();

  let open = issues.iter().filter(|i| !i.status.is_resolved()).count();
  let high_priority_open = issues
    .iter()
    .filter(|i| !i.status.is_resolved() && i.priority.is_high())
    .count();
  let score = Share::of(high_priority_open, open);
  let level = match score {
    Share::NotApplicable => FocusLevel::NotApplicable,
    Share::Value(v) if v >= config.focus_high_share => FocusLevel::High,
    Share::Value(v) if v >= config.focus_medium_share => FocusLevel::Medium,
    Share::Value(_) => FocusLevel::Low,
  };

  let uncovered = rank(issues, |i| i.priority.is_high() && i.status == Status::ToDo);

  let critical_idle = coverage
    .iter()
    .find(|r| r.priority == Priority::Critical)
    .map(|r| r.total > 0 && r.in_progress + r.completed == 0)
    .unwrap_or(false);

  let items = rank(backlog, |i| i.priority.is_high() && !i.status.is_resolved());
  let backlog_critical = items
    .iter()
    .filter(|i| i.priority == Priority::Critical)
    .count();
  let in_sprint_critical = coverage
    .iter()
    .find(|r| r.priority == Priority::Critical)
    .map(|r| r.total)
    .unwrap_or(0);
  let backlog = BacklogGaps {
    critical: backlog_critical,
    major: items.len() - backlog_critical,
    critical_coverage: if in_sprint_critical >= backlog_critical {
      CriticalCoverage::Good
    } else {
      CriticalCoverage::NeedsAttention
    },
    items,
  };

  tracing::debug!(
    issues = issues.len(),
    uncovered = uncovered.len(),
    critical_idle,
    backlog_critical = backlog.critical,
    "analyzed priority gaps"
  );

  PriorityReport {
    coverage,
    focus: PriorityFocus {
      score,
      level,
      high_priority_open,
      open,
    },
    uncovered,
    critical_idle,
    backlog,
  }
}

/// Issues matching `keep`: Critical before Major, then oldest first (undated
/// last), then input order.
fn rank<F>(issues: &[&Issue], keep: F) -> Vec<UncoveredIssue>
where
  F: Fn(&Issue) -> bool,
{
  let mut pending: Vec<(usize, &Issue)> = issues
    .iter()
    .enumerate()
    .filter(|(_, i)| keep(i))
    .map(|(idx, i)| (idx, *i))
    .collect();

  pending.sort_by(|(ia, a), (ib, b)| {
    b.priority
      .cmp(&a.priority)
      .then_with(|| match (a.created, b.created) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
      })
      .then_with(|| ia.cmp(ib))
  });

  pending
    .into_iter()
    .enumerate()
    .map(|(rank, (_, issue))| UncoveredIssue {
      rank: rank + 1,
      key: issue.key.clone(),
      title: issue.title.clone(),
      priority: issue.priority,
      assignee: issue.assignee.clone(),
      created: issue.created.map(|t| t.to_rfc3339()),
      updated: issue.updated.map(|t| t.to_rfc3339()),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  fn refs(issues: &[Issue]) -> Vec<&Issue> {
    issues.iter().collect()
  }

  #[test]
  fn empty_level_reports_not_applicable() {
    let issues = vec![Issue::new("A-1", Priority::Major, Status::Done)];
    let report = gaps(&refs(&issues), &[], &Config::default());
    let minor = report.row(Priority::Minor).unwrap();
    assert_eq!(minor.total, 0);
    assert_eq!(minor.coverage, Share::NotApplicable);
    assert_eq!(serde_json::to_value(minor.coverage).unwrap(), "N/A");
    assert_eq!(report.row(Priority::Major).unwrap().coverage, Share::Value(1.0));
  }

  #[test]
  fn all_levels_present_critical_first() {
    let report = gaps(&[], &[], &Config::default());
    let order: Vec<Priority> = report.coverage.iter().map(|r| r.priority).collect();
    assert_eq!(order, Priority::ALL.to_vec());
    assert_eq!(report.focus.level, FocusLevel::NotApplicable);
  }

  #[test]
  fn coverage_counts_active_and_done() {
    let issues = vec![
      Issue::new("N-1", Priority::Normal, Status::Done),
      Issue::new("N-2", Priority::Normal, Status::Review),
      Issue::new("N-3", Priority::Normal, Status::ToDo),
      Issue::new("N-4", Priority::Normal, Status::ToDo),
    ];
    let report = gaps(&refs(&issues), &[], &Config::default());
    assert_eq!(report.row(Priority::Normal).unwrap().coverage, Share::Value(0.5));
  }

  #[test]
  fn focus_score_ignores_completed_work() {
    let issues = vec![
      Issue::new("C-1", Priority::Critical, Status::InProgress),
      Issue::new("M-1", Priority::Minor, Status::ToDo),
      // Done work is not pending effort.
      Issue::new("M-2", Priority::Minor, Status::Done),
      Issue::new("M-3", Priority::Minor, Status::Done),
    ];
    let report = gaps(&refs(&issues), &[], &Config::default());
    assert_eq!(report.focus.open, 2);
    assert_eq!(report.focus.high_priority_open, 1);
    assert_eq!(report.focus.score, Share::Value(0.5));
    assert_eq!(report.focus.level, FocusLevel::Medium);
  }

  #[test]
  fn uncovered_ranked_by_priority_then_age() {
    let day = |d| Utc.with_ymd_and_hms(2025, 2, d, 0, 0, 0).unwrap();
    let issues = vec![
      Issue::new("M-new", Priority::Major, Status::ToDo).created_at(day(10)),
      Issue::new("M-undated", Priority::Major, Status::ToDo),
      Issue::new("M-old", Priority::Major, Status::ToDo).created_at(day(1)),
      Issue::new("C-1", Priority::Critical, Status::ToDo).created_at(day(20)),
      Issue::new("C-2", Priority::Critical, Status::InProgress),
      Issue::new("N-1", Priority::Normal, Status::ToDo),
    ];
    let report = gaps(&refs(&issues), &[], &Config::default());
    let keys: Vec<&str> = report.uncovered.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(keys, vec!["C-1", "M-old", "M-new", "M-undated"]);
    assert_eq!(report.uncovered[0].rank, 1);
    assert!(!report.critical_idle);
  }

  #[test]
  fn critical_idle_when_no_critical_work_started() {
    let issues = vec![
      Issue::new("C-1", Priority::Critical, Status::ToDo),
      Issue::new("C-2", Priority::Critical, Status::ToDo),
    ];
    let report = gaps(&refs(&issues), &[], &Config::default());
    assert!(report.critical_idle);
    assert_eq!(report.focus.level, FocusLevel::High);
  }

  #[test]
  fn backlog_critical_outnumbering_sprint_needs_attention() {
    let day = |d| Utc.with_ymd_and_hms(2025, 2, d, 0, 0, 0).unwrap();
    let sprint = vec![Issue::new("C-1", Priority::Critical, Status::InProgress)];
    let backlog = vec![
      Issue::new("B-major", Priority::Major, Status::ToDo),
      Issue::new("B-new", Priority::Critical, Status::ToDo).created_at(day(9)),
      Issue::new("B-old", Priority::Critical, Status::ToDo).created_at(day(2)),
      // Resolved and low-priority backlog work is ignored.
      Issue::new("B-done", Priority::Critical, Status::Done),
      Issue::new("B-minor", Priority::Minor, Status::ToDo),
    ];
    let report = gaps(&refs(&sprint), &refs(&backlog), &Config::default());
    assert_eq!(report.backlog.critical, 2);
    assert_eq!(report.backlog.major, 1);
    assert_eq!(report.backlog.critical_coverage, CriticalCoverage::NeedsAttention);
    let keys: Vec<&str> = report.backlog.items.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(keys, vec!["B-old", "B-new", "B-major"]);
  }

  #[test]
  fn empty_backlog_is_good_coverage() {
    let report = gaps(&[], &[], &Config::default());
    assert_eq!(report.backlog.critical, 0);
    assert!(report.backlog.items.is_empty());
    assert_eq!(report.backlog.critical_coverage, CriticalCoverage::Good);
  }

  #[test]
  fn ranked_issues_carry_last_update() {
    let mut issue = Issue::new("M-1", Priority::Major, Status::ToDo);
    issue.updated = Some(Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap());
    let report = gaps(&refs(&[issue]), &[], &Config::default());
    assert_eq!(
      report.uncovered[0].updated.as_deref(),
      Some("2025-02-03T12:00:00+00:00")
    );
  }
}
