//! Recommendation synthesis: map analyzer outputs to ordered, templated findings.
//!
//! All judgment happens in the analyzers. This module only decides which
//! findings apply, attaches the triggering values, and fills fixed templates.

use serde::Serialize;

use crate::config::Config;
use crate::finding_id;
use crate::health::{HealthAssessment, RiskLevel, Verdict};
use crate::priority::{FocusLevel, PriorityReport};
use crate::trend::{Direction, TrendReport};
use crate::types::Priority;
use crate::workload::{Balance, LoadBand, WorkloadReport};

/// Declaration order is report order: Critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
  Critical,
  Warning,
  Info,
}

/// Declaration order breaks ties between findings of equal severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
  Overcommitted,
  CriticalIdle,
  UncoveredCritical,
  Overloaded,
  AtRisk,
  VelocityDown,
  WipViolation,
  UnassignedBottleneck,
  UncoveredMajor,
  CriticalInBacklog,
  LowFocus,
  UnbalancedDistribution,
  Undercommitted,
  ContextSwitching,
  VelocityTrend,
  OnTrack,
  Completed,
  Healthy,
}

impl FindingKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Overcommitted => "overcommitted",
      Self::CriticalIdle => "critical_idle",
      Self::UncoveredCritical => "uncovered_critical",
      Self::Overloaded => "overloaded",
      Self::AtRisk => "at_risk",
      Self::VelocityDown => "velocity_down",
      Self::WipViolation => "wip_violation",
      Self::UnassignedBottleneck => "unassigned_bottleneck",
      Self::UncoveredMajor => "uncovered_major",
      Self::CriticalInBacklog => "critical_in_backlog",
      Self::LowFocus => "low_focus",
      Self::UnbalancedDistribution => "unbalanced_distribution",
      Self::Undercommitted => "undercommitted",
      Self::ContextSwitching => "context_switching",
      Self::VelocityTrend => "velocity_trend",
      Self::OnTrack => "on_track",
      Self::Completed => "completed",
      Self::Healthy => "healthy",
    }
  }
}

/// The values that triggered a finding, checkable without parsing the message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Condition {
  CompletionBelow {
    completion_pct: f64,
    threshold_pct: f64,
    risk: RiskLevel,
    remaining_fraction: f64,
  },
  CompletionAtLeast {
    completion_pct: f64,
    threshold_pct: f64,
  },
  CommittedBelowBaseline {
    committed: usize,
    baseline_committed: f64,
    ratio: f64,
  },
  TrendDirection {
    direction: Direction,
    pp_deltas: Vec<f64>,
    tolerance_pp: f64,
  },
  LoadBandReached {
    assignee: String,
    total: usize,
    band: LoadBand,
  },
  WipExceeded {
    assignee: String,
    in_progress: usize,
    limit: u32,
    excess: usize,
  },
  UnassignedAbove {
    count: usize,
    threshold: u32,
  },
  SpreadAbove {
    spread: usize,
    threshold: u32,
  },
  HighPriorityShareAbove {
    assignee: String,
    high_priority: usize,
    total: usize,
    threshold: f64,
  },
  UncoveredHighPriority {
    key: String,
    priority: Priority,
    rank: usize,
  },
  CriticalNotStarted {
    critical_total: usize,
  },
  CriticalInBacklog {
    backlog_critical: usize,
    sprint_critical: usize,
  },
  FocusBelow {
    score: f64,
    threshold: f64,
  },
  NoRisks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
  pub id: String,
  pub severity: Severity,
  pub kind: FindingKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub subject: Option<String>,
  pub condition: Condition,
  pub message: String,
}

/// Analyzer outputs for one sprint. Absent parts contribute no findings.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
  pub sprint_id: &'a str,
  pub health: Option<&'a HealthAssessment>,
  pub trend: Option<&'a TrendReport>,
  pub workload: Option<&'a WorkloadReport>,
  pub priority: Option<&'a PriorityReport>,
}

struct Builder<'a> {
  sprint_id: &'a str,
  findings: Vec<Finding>,
}

impl Builder<'_> {
  fn push(
    &mut self,
    severity: Severity,
    kind: FindingKind,
    subject: Option<&str>,
    condition: Condition,
    message: String,
  ) {
    self.findings.push(Finding {
      id: finding_id::compute(self.sprint_id, kind.as_str(), subject),
      severity,
      kind,
      subject: subject.map(str::to_string),
      condition,
      message,
    });
  }
}

/// Build the ordered finding list: severity, then kind, then each analyzer's own order.
pub fn synthesize(input: &SynthesisInput<'_>, config: &Config) -> Vec<Finding> {
  let mut b = Builder {
    sprint_id: input.sprint_id,
    findings: Vec::new(),
  };

  if let Some(health) = input.health {
    health_findings(&mut b, health, config);
  }
  if let Some(trend) = input.trend {
    trend_findings(&mut b, trend, config);
  }
  if let Some(workload) = input.workload {
    workload_findings(&mut b, workload, config);
  }
  if let Some(priority) = input.priority {
    priority_findings(&mut b, priority, config);
  }

  if b.findings.iter().all(|f| f.severity == Severity::Info) {
    b.push(
      Severity::Info,
      FindingKind::Healthy,
      None,
      Condition::NoRisks,
      "No major risks identified; maintain the current approach".into(),
    );
  }

  // Stable sort keeps each analyzer's ranking within a kind.
  b.findings.sort_by_key(|f| (f.severity, f.kind));
  b.findings
}

fn health_findings(b: &mut Builder<'_>, health: &HealthAssessment, config: &Config) {
  let pct = health.completion_pct;
  let remaining_pct = (health.remaining_fraction * 100.0).round();
  match health.verdict {
    Verdict::Overcommitted => {
      let severity = if health.risk_level == RiskLevel::High {
        Severity::Critical
      } else {
        Severity::Warning
      };
      b.push(
        severity,
        FindingKind::Overcommitted,
        None,
        Condition::CompletionBelow {
          completion_pct: pct,
          threshold_pct: config.overcommitted_rate * 100.0,
          risk: health.risk_level,
          remaining_fraction: health.remaining_fraction,
        },
        format!(
          "Sprint is overcommitted: {}% complete with {}% of the sprint remaining; move lower-priority work out of the sprint",
          pct, remaining_pct
        ),
      );
    }
    Verdict::AtRisk => b.push(
      Severity::Warning,
      FindingKind::AtRisk,
      None,
      Condition::CompletionBelow {
        completion_pct: pct,
        threshold_pct: config.on_track_rate * 100.0,
        risk: health.risk_level,
        remaining_fraction: health.remaining_fraction,
      },
      format!(
        "Sprint delivery is at risk: {}% complete; remove blockers and defer new work",
        pct
      ),
    ),
    Verdict::Undercommitted => {}
    Verdict::OnTrack => b.push(
      Severity::Info,
      FindingKind::OnTrack,
      None,
      Condition::CompletionAtLeast {
        completion_pct: pct,
        threshold_pct: config.on_track_rate * 100.0,
      },
      format!("Sprint is on track at {}% complete", pct),
    ),
    Verdict::Completed => b.push(
      Severity::Info,
      FindingKind::Completed,
      None,
      Condition::CompletionAtLeast {
        completion_pct: pct,
        threshold_pct: 100.0,
      },
      "Sprint closed with every committed issue done".into(),
    ),
  }

  if health.undercommitted {
    let baseline = health.baseline_committed.unwrap_or(0.0);
    b.push(
      Severity::Info,
      FindingKind::Undercommitted,
      None,
      Condition::CommittedBelowBaseline {
        committed: health.committed,
        baseline_committed: baseline,
        ratio: config.undercommit_ratio,
      },
      format!(
        "Sprint commits {} issues against a historical mean of {}; there is room to pull in more work",
        health.committed, baseline
      ),
    );
  }
}

fn trend_findings(b: &mut Builder<'_>, trend: &TrendReport, config: &Config) {
  let condition = Condition::TrendDirection {
    direction: trend.direction,
    pp_deltas: trend.deltas.iter().map(|d| d.pp_delta).collect(),
    tolerance_pp: config.trend_tolerance_pp,
  };
  let n = trend.sprints_analyzed;
  match trend.direction {
    Direction::Down => b.push(
      Severity::Warning,
      FindingKind::VelocityDown,
      None,
      condition,
      format!(
        "Completion rate is declining across the last {} sprints; investigate blockers or capacity",
        n
      ),
    ),
    Direction::Up => b.push(
      Severity::Info,
      FindingKind::VelocityTrend,
      None,
      condition,
      format!("Completion rate is improving across the last {} sprints", n),
    ),
    Direction::Flat => b.push(
      Severity::Info,
      FindingKind::VelocityTrend,
      None,
      condition,
      format!("Completion rate is stable across the last {} sprints", n),
    ),
    Direction::Mixed => b.push(
      Severity::Info,
      FindingKind::VelocityTrend,
      None,
      condition,
      format!("Completion rate swings across the last {} sprints", n),
    ),
    Direction::Unknown => b.push(
      Severity::Info,
      FindingKind::VelocityTrend,
      None,
      condition,
      "Need at least two sprints for trend analysis".into(),
    ),
  }
}

fn workload_findings(b: &mut Builder<'_>, workload: &WorkloadReport, config: &Config) {
  for load in &workload.loads {
    if load.band == LoadBand::Overloaded {
      b.push(
        Severity::Critical,
        FindingKind::Overloaded,
        Some(&load.assignee.id),
        Condition::LoadBandReached {
          assignee: load.assignee.id.clone(),
          total: load.total,
          band: load.band,
        },
        format!(
          "{} holds {} issues; redistribute work",
          load.assignee.display_name, load.total
        ),
      );
    }
    if load.context_switching {
      let high: usize = load
        .by_priority
        .iter()
        .filter(|(p, _)| p.is_high())
        .map(|(_, n)| *n)
        .sum();
      b.push(
        Severity::Info,
        FindingKind::ContextSwitching,
        Some(&load.assignee.id),
        Condition::HighPriorityShareAbove {
          assignee: load.assignee.id.clone(),
          high_priority: high,
          total: load.total,
          threshold: config.context_switch_share,
        },
        format!(
          "{} has {} of {} issues at Critical or Major priority; expect context switching",
          load.assignee.display_name, high, load.total
        ),
      );
    }
  }

  for v in &workload.violations {
    b.push(
      Severity::Warning,
      FindingKind::WipViolation,
      Some(&v.assignee.id),
      Condition::WipExceeded {
        assignee: v.assignee.id.clone(),
        in_progress: v.in_progress,
        limit: v.limit,
        excess: v.excess,
      },
      format!(
        "{} exceeds the WIP limit of {} by {}; finish current work before starting more",
        v.assignee.display_name, v.limit, v.excess
      ),
    );
  }

  if workload.unassigned.bottleneck {
    b.push(
      Severity::Warning,
      FindingKind::UnassignedBottleneck,
      None,
      Condition::UnassignedAbove {
        count: workload.unassigned.count,
        threshold: config.unassigned_threshold,
      },
      format!(
        "{} issues are unassigned; assign them to prevent a bottleneck",
        workload.unassigned.count
      ),
    );
  }

  if workload.statistics.balance == Balance::Unbalanced {
    b.push(
      Severity::Warning,
      FindingKind::UnbalancedDistribution,
      None,
      Condition::SpreadAbove {
        spread: workload.statistics.spread,
        threshold: config.balance_spread,
      },
      format!(
        "Issue counts per person range from {} to {}; rebalance the team's workload",
        workload.statistics.min, workload.statistics.max
      ),
    );
  }
}

fn priority_findings(b: &mut Builder<'_>, priority: &PriorityReport, config: &Config) {
  if priority.critical_idle {
    let critical_total = priority
      .row(Priority::Critical)
      .map(|r| r.total)
      .unwrap_or(0);
    b.push(
      Severity::Critical,
      FindingKind::CriticalIdle,
      None,
      Condition::CriticalNotStarted { critical_total },
      format!(
        "None of the {} critical issues is being worked on; start them immediately",
        critical_total
      ),
    );
  }

  for issue in &priority.uncovered {
    let (severity, kind) = match issue.priority {
      Priority::Critical => (Severity::Critical, FindingKind::UncoveredCritical),
      _ => (Severity::Warning, FindingKind::UncoveredMajor),
    };
    b.push(
      severity,
      kind,
      Some(&issue.key),
      Condition::UncoveredHighPriority {
        key: issue.key.clone(),
        priority: issue.priority,
        rank: issue.rank,
      },
      format!("{} is high priority and not started", issue.key),
    );
  }

  if priority.backlog.critical > 0 {
    let sprint_critical = priority
      .row(Priority::Critical)
      .map(|r| r.total)
      .unwrap_or(0);
    b.push(
      Severity::Warning,
      FindingKind::CriticalInBacklog,
      None,
      Condition::CriticalInBacklog {
        backlog_critical: priority.backlog.critical,
        sprint_critical,
      },
      format!(
        "{} critical items are in the backlog; consider adding them to the current or next sprint",
        priority.backlog.critical
      ),
    );
  }

  if priority.focus.level == FocusLevel::Low {
    let score = priority.focus.score.value().unwrap_or(0.0);
    b.push(
      Severity::Warning,
      FindingKind::LowFocus,
      None,
      Condition::FocusBelow {
        score,
        threshold: config.focus_medium_share,
      },
      format!(
        "Only {}% of open work is Critical or Major; increase focus on high-priority items",
        (score * 1000.0).round() / 10.0
      ),
    );
  }
}
