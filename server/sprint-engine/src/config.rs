//! Engine configuration with sane defaults.
//!
//! Every field can be overridden per request through the `options` object;
//! omitted fields keep the engine's configured values.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tunable thresholds for sprint classification.
///
/// Rates are fractions (0..1); trend tolerance is in percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Completion rate at or above which a sprint is ON_TRACK.
  pub on_track_rate: f64,
  /// Completion rate below which a sprint is OVERCOMMITTED (AT_RISK in between).
  pub overcommitted_rate: f64,
  /// Remaining share of sprint duration below which risk may escalate.
  pub escalation_remaining_fraction: f64,
  /// Completion rate below which a late active sprint escalates to HIGH risk.
  pub escalation_rate: f64,
  /// Committed count below this share of the historical mean is UNDERCOMMITTED.
  pub undercommit_ratio: f64,
  /// Completion-rate changes within this many percentage points are noise.
  pub trend_tolerance_pp: f64,
  /// Max concurrently in-progress issues per assignee.
  pub wip_limit: u32,
  /// Unassigned issue count above which the bucket is a bottleneck.
  pub unassigned_threshold: u32,
  /// Spread (max - min issues per assignee) above which distribution is UNBALANCED.
  pub balance_spread: u32,
  /// Share of Critical + Major issues above which an assignee is context switching.
  pub context_switch_share: f64,
  /// Priority focus share for a HIGH focus level.
  pub focus_high_share: f64,
  /// Priority focus share for a MEDIUM focus level.
  pub focus_medium_share: f64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      on_track_rate: 0.85,
      overcommitted_rate: 0.60,
      escalation_remaining_fraction: 0.20,
      escalation_rate: 0.60,
      undercommit_ratio: 0.50,
      trend_tolerance_pp: 5.0,
      wip_limit: 2,
      unassigned_threshold: 2,
      balance_spread: 8,
      context_switch_share: 0.70,
      focus_high_share: 0.60,
      focus_medium_share: 0.40,
    }
  }
}

impl Config {
  /// Reject threshold combinations that cannot classify consistently.
  pub fn validate(&self) -> Result<(), EngineError> {
    let fractions = [
      ("on_track_rate", self.on_track_rate),
      ("overcommitted_rate", self.overcommitted_rate),
      ("escalation_remaining_fraction", self.escalation_remaining_fraction),
      ("escalation_rate", self.escalation_rate),
      ("undercommit_ratio", self.undercommit_ratio),
      ("context_switch_share", self.context_switch_share),
      ("focus_high_share", self.focus_high_share),
      ("focus_medium_share", self.focus_medium_share),
    ];
    for (field, value) in fractions {
      if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::input(
          &format!("options.{}", field),
          "must be within 0..1",
        ));
      }
    }
    if self.overcommitted_rate > self.on_track_rate {
      return Err(EngineError::input(
        "options.overcommitted_rate",
        "must not exceed on_track_rate",
      ));
    }
    if self.focus_medium_share > self.focus_high_share {
      return Err(EngineError::input(
        "options.focus_medium_share",
        "must not exceed focus_high_share",
      ));
    }
    if !self.trend_tolerance_pp.is_finite() || self.trend_tolerance_pp < 0.0 {
      return Err(EngineError::input(
        "options.trend_tolerance_pp",
        "must be a non-negative number",
      ));
    }
    Ok(())
  }
}

/// Per-request overrides. Only the fields present in the request replace the
/// engine's values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
  pub on_track_rate: Option<f64>,
  pub overcommitted_rate: Option<f64>,
  pub escalation_remaining_fraction: Option<f64>,
  pub escalation_rate: Option<f64>,
  pub undercommit_ratio: Option<f64>,
  pub trend_tolerance_pp: Option<f64>,
  pub wip_limit: Option<u32>,
  pub unassigned_threshold: Option<u32>,
  pub balance_spread: Option<u32>,
  pub context_switch_share: Option<f64>,
  pub focus_high_share: Option<f64>,
  pub focus_medium_share: Option<f64>,
}

impl ConfigOverrides {
  /// Layer these overrides on top of `base`.
  pub fn apply_to(&self, base: &Config) -> Config {
    Config {
      on_track_rate: self.on_track_rate.unwrap_or(base.on_track_rate),
      overcommitted_rate: self.overcommitted_rate.unwrap_or(base.overcommitted_rate),
      escalation_remaining_fraction: self
        .escalation_remaining_fraction
        .unwrap_or(base.escalation_remaining_fraction),
      escalation_rate: self.escalation_rate.unwrap_or(base.escalation_rate),
      undercommit_ratio: self.undercommit_ratio.unwrap_or(base.undercommit_ratio),
      trend_tolerance_pp: self.trend_tolerance_pp.unwrap_or(base.trend_tolerance_pp),
      wip_limit: self.wip_limit.unwrap_or(base.wip_limit),
      unassigned_threshold: self.unassigned_threshold.unwrap_or(base.unassigned_threshold),
      balance_spread: self.balance_spread.unwrap_or(base.balance_spread),
      context_switch_share: self.context_switch_share.unwrap_or(base.context_switch_share),
      focus_high_share: self.focus_high_share.unwrap_or(base.focus_high_share),
      focus_medium_share: self.focus_medium_share.unwrap_or(base.focus_medium_share),
    }
  }
}
