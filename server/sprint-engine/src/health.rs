//! Sprint health classification: threshold rules over one sprint's metrics.
//!
//! Pure function of (metrics, sprint, now, baseline, config). The evaluation
//! instant is always passed in so identical inputs give identical verdicts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::metrics::{round1, SprintMetrics};
use crate::types::{Sprint, SprintState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
  OnTrack,
  AtRisk,
  Overcommitted,
  /// Closed sprint with every committed issue done.
  Completed,
  /// Committed far below the team's historical norm.
  Undercommitted,
}

impl Verdict {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::OnTrack => "ON_TRACK",
      Self::AtRisk => "AT_RISK",
      Self::Overcommitted => "OVERCOMMITTED",
      Self::Completed => "COMPLETED",
      Self::Undercommitted => "UNDERCOMMITTED",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "LOW",
      Self::Medium => "MEDIUM",
      Self::High => "HIGH",
    }
  }
}

/// Historical commitment norm derived from earlier sprints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
  pub mean_committed: f64,
  pub sprints: usize,
}

impl Baseline {
  /// Mean committed count over `history`; `None` when there is no history.
  pub fn from_history<'a, I>(history: I) -> Option<Self>
  where
    I: IntoIterator<Item = &'a SprintMetrics>,
  {
    let (sum, n) = history
      .into_iter()
      .fold((0usize, 0usize), |(sum, n), m| (sum + m.committed, n + 1));
    if n == 0 {
      return None;
    }
    Some(Self {
      mean_committed: sum as f64 / n as f64,
      sprints: n,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthAssessment {
  pub verdict: Verdict,
  pub risk_level: RiskLevel,
  pub committed: usize,
  pub completion_pct: f64,
  /// Share of the sprint's duration still ahead, two decimals.
  pub remaining_fraction: f64,
  /// Risk was raised to HIGH because the sprint is nearly over.
  pub escalated: bool,
  /// Closed sprint: risk describes the final snapshot only.
  pub informational: bool,
  /// Committed count is far below the historical baseline. Never set on an
  /// OVERCOMMITTED sprint.
  pub undercommitted: bool,
  /// Historical mean committed count, when a baseline was supplied.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub baseline_committed: Option<f64>,
}

/// Classify one sprint.
///
/// A Future sprint has no completion evidence yet, so it is never judged on
/// its completion rate: it is ON_TRACK / LOW unless undercommitted.
/// Undercommitment only replaces an ON_TRACK verdict; an AT_RISK sprint keeps
/// its verdict and carries the `undercommitted` flag instead.
pub fn classify(
  metrics: &SprintMetrics,
  sprint: &Sprint,
  now: DateTime<Utc>,
  baseline: Option<&Baseline>,
  config: &Config,
) -> HealthAssessment {
  let remaining = match sprint.state {
    SprintState::Future => 1.0,
    SprintState::Active => sprint.remaining_fraction(now),
    SprintState::Closed => 0.0,
  };
  let closed = sprint.state == SprintState::Closed;
  let rate = metrics.completion_rate;

  let undercommitted = baseline
    .filter(|b| b.mean_committed > 0.0)
    .map(|b| (metrics.committed as f64) < b.mean_committed * config.undercommit_ratio)
    .unwrap_or(false);

  let on_track = if undercommitted {
    (Verdict::Undercommitted, RiskLevel::Low)
  } else {
    (Verdict::OnTrack, RiskLevel::Low)
  };

  let mut escalated = false;
  let (verdict, risk_level) = if metrics.committed == 0 || sprint.state == SprintState::Future {
    // No work committed or not started yet: never overcommitted.
    on_track
  } else if closed && metrics.completed == metrics.committed {
    (Verdict::Completed, RiskLevel::Low)
  } else if rate >= config.on_track_rate {
    on_track
  } else if rate >= config.overcommitted_rate {
    (Verdict::AtRisk, RiskLevel::Medium)
  } else {
    let late = sprint.state == SprintState::Active
      && remaining < config.escalation_remaining_fraction
      && rate < config.escalation_rate;
    escalated = late;
    (
      Verdict::Overcommitted,
      if late { RiskLevel::High } else { RiskLevel::Medium },
    )
  };
  let undercommitted = undercommitted && verdict != Verdict::Overcommitted;

  tracing::debug!(
    sprint = %sprint.id,
    verdict = verdict.as_str(),
    risk = risk_level.as_str(),
    remaining,
    "classified sprint health"
  );

  HealthAssessment {
    verdict,
    risk_level,
    committed: metrics.committed,
    completion_pct: round1(rate * 100.0),
    remaining_fraction: (remaining * 100.0).round() / 100.0,
    escalated,
    informational: closed,
    undercommitted,
    baseline_committed: baseline.map(|b| round1(b.mean_committed)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn sprint(state: SprintState) -> Sprint {
    Sprint {
      id: "s1".into(),
      name: "Sprint 1".into(),
      start: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
      end: Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap(),
      state,
      board_id: None,
    }
  }

  fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, 0, 0, 0).unwrap()
  }

  fn metrics(committed: usize, completed: usize) -> SprintMetrics {
    SprintMetrics::from_counts(committed, completed, 0, committed - completed).unwrap()
  }

  #[test]
  fn overcommitted_mid_sprint_is_medium_risk() {
    let m = SprintMetrics::from_counts(45, 25, 14, 6).unwrap();
    let h = classify(&m, &sprint(SprintState::Active), day(5), None, &Config::default());
    assert_eq!(h.completion_pct, 55.6);
    assert_eq!(h.verdict, Verdict::Overcommitted);
    assert_eq!(h.risk_level, RiskLevel::Medium);
    assert!(!h.escalated);
  }

  #[test]
  fn overcommitted_late_in_sprint_escalates() {
    let m = metrics(10, 4);
    // One day of ten left.
    let h = classify(&m, &sprint(SprintState::Active), day(10), None, &Config::default());
    assert_eq!(h.verdict, Verdict::Overcommitted);
    assert_eq!(h.risk_level, RiskLevel::High);
    assert!(h.escalated);
  }

  #[test]
  fn closed_sprint_never_escalates() {
    let m = metrics(10, 4);
    let h = classify(&m, &sprint(SprintState::Closed), day(20), None, &Config::default());
    assert_eq!(h.verdict, Verdict::Overcommitted);
    assert_eq!(h.risk_level, RiskLevel::Medium);
    assert!(h.informational);
    assert!(!h.escalated);
  }

  #[test]
  fn rate_bands() {
    let config = Config::default();
    let s = sprint(SprintState::Active);
    let on_track = classify(&metrics(20, 17), &s, day(5), None, &config);
    assert_eq!(on_track.verdict, Verdict::OnTrack);
    assert_eq!(on_track.risk_level, RiskLevel::Low);

    let at_risk = classify(&metrics(20, 14), &s, day(5), None, &config);
    assert_eq!(at_risk.verdict, Verdict::AtRisk);
    assert_eq!(at_risk.risk_level, RiskLevel::Medium);
  }

  #[test]
  fn completed_requires_closed_and_full_rate() {
    let config = Config::default();
    let done = classify(&metrics(8, 8), &sprint(SprintState::Closed), day(20), None, &config);
    assert_eq!(done.verdict, Verdict::Completed);

    let active = classify(&metrics(8, 8), &sprint(SprintState::Active), day(5), None, &config);
    assert_eq!(active.verdict, Verdict::OnTrack);
  }

  #[test]
  fn empty_sprint_is_not_overcommitted() {
    let m = metrics(0, 0);
    let h = classify(&m, &sprint(SprintState::Active), day(10), None, &Config::default());
    assert_eq!(h.completion_pct, 0.0);
    assert_ne!(h.verdict, Verdict::Overcommitted);
  }

  #[test]
  fn undercommitted_only_with_baseline() {
    let config = Config::default();
    let s = sprint(SprintState::Active);
    let m = metrics(4, 4);
    let history = [metrics(12, 10), metrics(10, 9)];
    let baseline = Baseline::from_history(&history).unwrap();
    assert_eq!(baseline.mean_committed, 11.0);

    let with = classify(&m, &s, day(5), Some(&baseline), &config);
    assert_eq!(with.verdict, Verdict::Undercommitted);
    assert!(with.undercommitted);

    let without = classify(&m, &s, day(5), None, &config);
    assert_eq!(without.verdict, Verdict::OnTrack);
  }

  #[test]
  fn overcommitment_wins_over_undercommitment() {
    let baseline = Baseline {
      mean_committed: 20.0,
      sprints: 3,
    };
    let h = classify(
      &metrics(4, 1),
      &sprint(SprintState::Active),
      day(5),
      Some(&baseline),
      &Config::default(),
    );
    assert_eq!(h.verdict, Verdict::Overcommitted);
    assert!(!h.undercommitted);
  }

  #[test]
  fn at_risk_survives_undercommitment() {
    let baseline = Baseline {
      mean_committed: 30.0,
      sprints: 3,
    };
    // 7 of 10 done: AT_RISK, and 10 < 15 is a light commitment.
    let h = classify(
      &metrics(10, 7),
      &sprint(SprintState::Active),
      day(5),
      Some(&baseline),
      &Config::default(),
    );
    assert_eq!(h.verdict, Verdict::AtRisk);
    assert_eq!(h.risk_level, RiskLevel::Medium);
    assert!(h.undercommitted);
  }

  #[test]
  fn future_sprint_is_not_judged_on_completion() {
    let m = metrics(12, 0);
    let h = classify(&m, &sprint(SprintState::Future), day(1), None, &Config::default());
    assert_eq!(h.verdict, Verdict::OnTrack);
    assert_eq!(h.risk_level, RiskLevel::Low);
    assert_eq!(h.remaining_fraction, 1.0);
  }

  #[test]
  fn no_history_means_no_baseline() {
    assert!(Baseline::from_history(&[] as &[SprintMetrics]).is_none());
  }

  #[test]
  fn classify_is_deterministic() {
    let m = SprintMetrics::from_counts(45, 25, 14, 6).unwrap();
    let s = sprint(SprintState::Active);
    let a = classify(&m, &s, day(7), None, &Config::default());
    let b = classify(&m, &s, day(7), None, &Config::default());
    assert_eq!(a, b);
  }
}
