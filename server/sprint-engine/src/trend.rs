//! Velocity trend across an ordered sequence of sprints.
//!
//! Completion rate and committed count are reported as separate deltas: a
//! team taking on less work and a team finishing less work are different
//! signals.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::error::EngineError;
use crate::metrics::{round1, SprintMetrics, Velocity};
use crate::types::Sprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
  Up,
  Down,
  /// Every change is within the noise tolerance.
  Flat,
  /// Significant rises and falls both occur.
  Mixed,
  /// Fewer than two sprints.
  Unknown,
}

impl Direction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Up => "UP",
      Self::Down => "DOWN",
      Self::Flat => "FLAT",
      Self::Mixed => "MIXED",
      Self::Unknown => "UNKNOWN",
    }
  }
}

/// One sprint's position and metrics in a trend sequence.
#[derive(Debug, Clone)]
pub struct TrendPoint {
  pub sprint_id: String,
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
  pub metrics: SprintMetrics,
}

impl TrendPoint {
  pub fn new(sprint: &Sprint, metrics: SprintMetrics) -> Self {
    Self {
      sprint_id: sprint.id.clone(),
      start: sprint.start,
      end: sprint.end,
      metrics,
    }
  }
}

/// Change between two consecutive sprints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDelta {
  pub from_sprint: String,
  pub to_sprint: String,
  /// Completion-rate change as a fraction, three decimals.
  pub rate_delta: f64,
  /// Completion-rate change in percentage points, from the one-decimal percentages.
  pub pp_delta: f64,
  pub committed_delta: i64,
  pub completed_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintVelocity {
  pub sprint_id: String,
  pub committed: usize,
  pub completion_pct: f64,
  pub velocity: Velocity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
  pub direction: Direction,
  pub sprints_analyzed: usize,
  pub deltas: Vec<PairDelta>,
  pub sprints: Vec<SprintVelocity>,
  /// Mean completed issues per sprint, one decimal.
  pub average_velocity: f64,
  /// Mean completed points over sprints that track points.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub average_point_velocity: Option<f64>,
}

/// Analyze a chronologically ordered sequence of sprints.
///
/// The order is trusted, never re-sorted: a sprint starting before its
/// predecessor, a repeated sprint, or two sprints with identical start and end
/// are rejected.
pub fn trend(points: &[TrendPoint], config: &Config) -> Result<TrendReport, EngineError> {
  check_order(points)?;

  let deltas: Vec<PairDelta> = points
    .windows(2)
    .map(|pair| {
      let (a, b) = (&pair[0].metrics, &pair[1].metrics);
      PairDelta {
        from_sprint: pair[0].sprint_id.clone(),
        to_sprint: pair[1].sprint_id.clone(),
        rate_delta: ((b.completion_rate - a.completion_rate) * 1000.0).round() / 1000.0,
        pp_delta: round1(b.completion_pct - a.completion_pct),
        committed_delta: b.committed as i64 - a.committed as i64,
        completed_delta: b.completed as i64 - a.completed as i64,
      }
    })
    .collect();

  let direction = if points.len() < 2 {
    Direction::Unknown
  } else {
    direction_of(&deltas, config.trend_tolerance_pp)
  };

  let sprints: Vec<SprintVelocity> = points
    .iter()
    .map(|p| SprintVelocity {
      sprint_id: p.sprint_id.clone(),
      committed: p.metrics.committed,
      completion_pct: p.metrics.completion_pct,
      velocity: p.metrics.velocity(),
    })
    .collect();

  let average_velocity = if sprints.is_empty() {
    0.0
  } else {
    round1(sprints.iter().map(|s| s.velocity.issues as f64).sum::<f64>() / sprints.len() as f64)
  };
  let point_velocities: Vec<f64> = sprints.iter().filter_map(|s| s.velocity.points).collect();
  let average_point_velocity = if point_velocities.is_empty() {
    None
  } else {
    Some(round1(
      point_velocities.iter().sum::<f64>() / point_velocities.len() as f64,
    ))
  };

  tracing::debug!(
    sprints = points.len(),
    direction = direction.as_str(),
    "computed velocity trend"
  );

  Ok(TrendReport {
    direction,
    sprints_analyzed: points.len(),
    deltas,
    sprints,
    average_velocity,
    average_point_velocity,
  })
}

fn check_order(points: &[TrendPoint]) -> Result<(), EngineError> {
  let mut seen = HashSet::new();
  for (i, p) in points.iter().enumerate() {
    if !seen.insert(p.sprint_id.as_str()) {
      return Err(EngineError::input(
        &format!("history[{}]", i),
        &format!("sprint {} appears more than once", p.sprint_id),
      ));
    }
  }

  for (i, pair) in points.windows(2).enumerate() {
    let (prev, cur) = (&pair[0], &pair[1]);
    let field = format!("history[{}]", i + 1);
    if (cur.start, cur.end) == (prev.start, prev.end) {
      return Err(EngineError::input(
        &field,
        &format!(
          "sprints {} and {} share the same position; order is ambiguous",
          prev.sprint_id, cur.sprint_id
        ),
      ));
    }
    if (cur.start, cur.end) < (prev.start, prev.end) {
      return Err(EngineError::input(
        &field,
        &format!(
          "sprint {} precedes {}; history must be chronological",
          cur.sprint_id, prev.sprint_id
        ),
      ));
    }
  }
  Ok(())
}

/// Classify percentage-point deltas.
///
/// UP needs at least one rise and no fall beyond `tolerance`; DOWN mirrors it.
/// Small moves both ways, or no movement at all, are FLAT. Falls and rises
/// both beyond `tolerance` are MIXED.
fn direction_of(deltas: &[PairDelta], tolerance: f64) -> Direction {
  let big_rise = deltas.iter().any(|d| d.pp_delta > tolerance);
  let big_fall = deltas.iter().any(|d| d.pp_delta < -tolerance);
  let up = !big_fall && deltas.iter().any(|d| d.pp_delta > 0.0);
  let down = !big_rise && deltas.iter().any(|d| d.pp_delta < 0.0);
  match (up, down) {
    (true, false) => Direction::Up,
    (false, true) => Direction::Down,
    _ if big_rise && big_fall => Direction::Mixed,
    _ => Direction::Flat,
  }
}
