//! Workload distribution: per-assignee load bands and WIP-limit violations.
//!
//! Unassigned issues are tallied in their own bucket; they never count toward
//! anyone's band or WIP check.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::config::Config;
use crate::error::EngineError;
use crate::health::RiskLevel;
use crate::metrics::round1;
use crate::types::{Issue, Person, Priority};

/// Load band by total issue count (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadBand {
  /// 0-4 issues.
  Light,
  /// 5-8 issues.
  Normal,
  /// 9-12 issues.
  High,
  /// 13 or more.
  Overloaded,
}

impl LoadBand {
  pub fn for_count(total: usize) -> Self {
    match total {
      0..=4 => Self::Light,
      5..=8 => Self::Normal,
      9..=12 => Self::High,
      _ => Self::Overloaded,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Balance {
  Balanced,
  Unbalanced,
}

/// Raw per-assignee counts before classification.
///
/// Built by [`distribute`] from issues, or supplied directly by callers holding
/// pre-aggregated counts; either way [`AssigneeTally::evaluate`] checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssigneeTally {
  pub assignee: Person,
  pub total: usize,
  pub in_progress: usize,
  pub completed: usize,
  pub not_started: usize,
  pub story_points: Option<f64>,
  pub by_priority: BTreeMap<Priority, usize>,
}

impl AssigneeTally {
  pub fn new(assignee: Person) -> Self {
    Self {
      assignee,
      total: 0,
      in_progress: 0,
      completed: 0,
      not_started: 0,
      story_points: None,
      by_priority: BTreeMap::new(),
    }
  }

  fn record(&mut self, issue: &Issue) {
    self.total += 1;
    if issue.status.is_resolved() {
      self.completed += 1;
    } else if issue.status.is_in_progress() {
      self.in_progress += 1;
    } else {
      self.not_started += 1;
    }
    if let Some(sp) = issue.story_points {
      *self.story_points.get_or_insert(0.0) += sp;
    }
    *self.by_priority.entry(issue.priority).or_insert(0) += 1;
  }

  fn high_priority(&self) -> usize {
    self
      .by_priority
      .iter()
      .filter(|(p, _)| p.is_high())
      .map(|(_, n)| *n)
      .sum()
  }

  /// Classify the tally. Counts that break the status partition are rejected.
  pub fn evaluate(self, config: &Config) -> Result<AssigneeLoad, EngineError> {
    let field = format!("workload.{}", self.assignee.id);
    if self.in_progress > self.total {
      return Err(EngineError::input(
        &field,
        &format!(
          "in_progress ({}) exceeds total ({})",
          self.in_progress, self.total
        ),
      ));
    }
    if self.completed + self.in_progress + self.not_started != self.total {
      return Err(EngineError::input(
        &field,
        &format!(
          "completed + in_progress + not_started ({}) must equal total ({})",
          self.completed + self.in_progress + self.not_started,
          self.total
        ),
      ));
    }
    let by_priority_total: usize = self.by_priority.values().sum();
    if by_priority_total > self.total {
      return Err(EngineError::input(
        &field,
        "priority breakdown exceeds total",
      ));
    }

    let high = self.high_priority();
    Ok(AssigneeLoad {
      band: LoadBand::for_count(self.total),
      wip_violation: self.in_progress > config.wip_limit as usize,
      context_switching: self.total > 0
        && high as f64 > self.total as f64 * config.context_switch_share,
      assignee: self.assignee,
      total: self.total,
      in_progress: self.in_progress,
      completed: self.completed,
      not_started: self.not_started,
      story_points: self.story_points,
      by_priority: self.by_priority,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeLoad {
  pub assignee: Person,
  pub total: usize,
  pub in_progress: usize,
  pub completed: usize,
  pub not_started: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub story_points: Option<f64>,
  pub by_priority: BTreeMap<Priority, usize>,
  pub band: LoadBand,
  pub wip_violation: bool,
  /// Critical + Major issues dominate this assignee's load.
  pub context_switching: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WipViolation {
  pub assignee: Person,
  pub in_progress: usize,
  pub limit: u32,
  pub excess: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedBucket {
  pub count: usize,
  pub in_progress: usize,
  pub high_priority: usize,
  /// Unassigned count exceeds the configured threshold.
  pub bottleneck: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
  pub assignees: usize,
  /// Mean issues per assignee, one decimal.
  pub mean: f64,
  pub max: usize,
  pub min: usize,
  pub spread: usize,
  pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadReport {
  /// Descending total load, ties by assignee id.
  pub loads: Vec<AssigneeLoad>,
  pub violations: Vec<WipViolation>,
  pub unassigned: UnassignedBucket,
  pub statistics: DistributionStats,
  pub capacity_risk: RiskLevel,
}

/// Distribute a sprint's issues across assignees.
pub fn distribute<'a, I>(issues: I, config: &Config) -> Result<WorkloadReport, EngineError>
where
  I: IntoIterator<Item = &'a Issue>,
{
  let mut tallies: HashMap<&str, AssigneeTally> = HashMap::new();
  let mut unassigned = UnassignedBucket {
    count: 0,
    in_progress: 0,
    high_priority: 0,
    bottleneck: false,
  };

  for issue in issues {
    match &issue.assignee {
      Some(person) => tallies
        .entry(person.id.as_str())
        .or_insert_with(|| AssigneeTally::new(person.clone()))
        .record(issue),
      None => {
        unassigned.count += 1;
        if issue.status.is_in_progress() {
          unassigned.in_progress += 1;
        }
        if issue.priority.is_high() {
          unassigned.high_priority += 1;
        }
      }
    }
  }
  unassigned.bottleneck = unassigned.count > config.unassigned_threshold as usize;

  summarize(tallies.into_values().collect(), unassigned, config)
}

/// Classify pre-built tallies and derive team-level statistics.
pub fn summarize(
  tallies: Vec<AssigneeTally>,
  unassigned: UnassignedBucket,
  config: &Config,
) -> Result<WorkloadReport, EngineError> {
  let mut loads = tallies
    .into_iter()
    .map(|t| t.evaluate(config))
    .collect::<Result<Vec<_>, EngineError>>()?;
  loads.sort_by(|a, b| {
    b.total
      .cmp(&a.total)
      .then_with(|| a.assignee.cmp(&b.assignee))
  });

  let violations: Vec<WipViolation> = loads
    .iter()
    .filter(|l| l.wip_violation)
    .map(|l| WipViolation {
      assignee: l.assignee.clone(),
      in_progress: l.in_progress,
      limit: config.wip_limit,
      excess: l.in_progress - config.wip_limit as usize,
    })
    .collect();

  let statistics = statistics(&loads, config);

  let capacity_risk = if loads.iter().any(|l| l.band == LoadBand::Overloaded) {
    RiskLevel::High
  } else if !violations.is_empty() || loads.iter().any(|l| l.band == LoadBand::High) {
    RiskLevel::Medium
  } else {
    RiskLevel::Low
  };

  tracing::debug!(
    assignees = loads.len(),
    violations = violations.len(),
    unassigned = unassigned.count,
    "distributed workload"
  );

  Ok(WorkloadReport {
    loads,
    violations,
    unassigned,
    statistics,
    capacity_risk,
  })
}

fn statistics(loads: &[AssigneeLoad], config: &Config) -> DistributionStats {
  let max = loads.iter().map(|l| l.total).max().unwrap_or(0);
  let min = loads.iter().map(|l| l.total).min().unwrap_or(0);
  let mean = if loads.is_empty() {
    0.0
  } else {
    round1(loads.iter().map(|l| l.total).sum::<usize>() as f64 / loads.len() as f64)
  };
  let spread = max - min;
  DistributionStats {
    assignees: loads.len(),
    mean,
    max,
    min,
    spread,
    balance: if spread > config.balance_spread as usize {
      Balance::Unbalanced
    } else {
      Balance::Balanced
    },
  }
}
