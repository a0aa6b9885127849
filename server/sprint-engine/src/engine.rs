//! Core engine: validates a request and runs every analyzer over one sprint.

use crate::config::{Config, ConfigOverrides};
use crate::error::EngineError;
use crate::health::{self, Baseline};
use crate::metrics::{self, SprintMetrics};
use crate::normalize::{self, Snapshot};
use crate::priority;
use crate::recommend::{self, SynthesisInput};
use crate::trend::{self, TrendPoint};
use crate::types::*;
use crate::workload;

/// The sprint analytics engine. Holds only configuration, so one instance can
/// serve any number of requests, from any number of threads.
#[derive(Debug, Clone)]
pub struct Engine {
  config: Config,
}

impl Engine {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Analyze the request's target sprint.
  ///
  /// Fields present in the request's `options` override the engine's config
  /// for this call only; everything else keeps the engine's values.
  pub fn analyze(&self, raw: &AnalysisRequest) -> Result<SprintReport, EngineError> {
    let merged;
    let config = match &raw.options {
      Some(options) => {
        merged = options.apply_to(&self.config);
        &merged
      }
      None => &self.config,
    };
    config.validate()?;

    let snapshot = normalize::normalize(raw)?;
    let sprint = snapshot.sprint(&raw.sprint_id).ok_or_else(|| {
      EngineError::input(
        "sprint_id",
        &format!("unknown sprint {}", raw.sprint_id),
      )
    })?;

    let issues = metrics::scope(&snapshot.issues, &sprint.id);
    let backlog: Vec<&Issue> = snapshot
      .issues
      .iter()
      .filter(|i| i.sprint_id.is_none())
      .collect();
    let sprint_metrics = metrics::aggregate(issues.iter().copied());

    let history = history_points(&snapshot, &raw.history, sprint)?;
    let baseline = Baseline::from_history(history.iter().map(|p| &p.metrics));

    let mut points = history;
    points.push(TrendPoint::new(sprint, sprint_metrics.clone()));

    let health = health::classify(
      &sprint_metrics,
      sprint,
      snapshot.now,
      baseline.as_ref(),
      config,
    );
    let trend = trend::trend(&points, config)?;
    let workload = workload::distribute(issues.iter().copied(), config)?;
    let priority = priority::gaps(&issues, &backlog, config);

    let findings = recommend::synthesize(
      &SynthesisInput {
        sprint_id: &sprint.id,
        health: Some(&health),
        trend: Some(&trend),
        workload: Some(&workload),
        priority: Some(&priority),
      },
      config,
    );

    tracing::debug!(
      sprint = %sprint.id,
      issues = issues.len(),
      history = points.len() - 1,
      findings = findings.len(),
      "analyzed sprint"
    );

    Ok(SprintReport {
      sprint: SprintInfo::from(sprint),
      metrics: sprint_metrics,
      health,
      trend,
      workload,
      priority,
      findings,
    })
  }
}

/// Metrics for each history sprint, in the caller's order.
///
/// A trailing entry naming the target sprint is dropped so callers may pass
/// either the earlier sprints alone or the full sequence ending at the target.
/// An earlier sprint may not sit behind a later one in the lifecycle (a
/// FUTURE sprint cannot precede an ACTIVE one).
fn history_points(
  snapshot: &Snapshot,
  history: &[String],
  target_sprint: &Sprint,
) -> Result<Vec<TrendPoint>, EngineError> {
  let target = target_sprint.id.as_str();
  let earlier = match history.split_last() {
    Some((last, rest)) if last == target => rest,
    _ => history,
  };

  earlier
    .iter()
    .enumerate()
    .map(|(i, id)| {
      let sprint = snapshot.sprint(id).ok_or_else(|| {
        EngineError::input(&format!("history[{}]", i), &format!("unknown sprint {}", id))
      })?;
      if sprint.id == target {
        return Err(EngineError::input(
          &format!("history[{}]", i),
          &format!("target sprint {} must come last", id),
        ));
      }
      let next = match earlier.get(i + 1) {
        Some(next_id) => snapshot.sprint(next_id),
        None => Some(target_sprint),
      };
      if let Some(next) = next.filter(|n| sprint.state < n.state) {
        return Err(EngineError::input(
          &format!("history[{}]", i),
          &format!(
            "sprint {} is {:?} but precedes {} which is {:?}",
            sprint.id, sprint.state, next.id, next.state
          ),
        ));
      }
      let m: SprintMetrics = metrics::aggregate(metrics::scope(&snapshot.issues, id));
      Ok(TrendPoint::new(sprint, m))
    })
    .collect()
}
