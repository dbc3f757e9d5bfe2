//! Per-set and per-session strength metrics

use crate::models::SetRecord;

/// Rep count at which Brzycki's denominator reaches zero
const BRZYCKI_REP_LIMIT: u32 = 37;

/// Multiplier used once reps reach the formula's limit
const HIGH_REP_CAP: f64 = 1.5;

/// Estimated one-rep max (Brzycki).
///
/// `reps <= 1` returns the weight itself; `reps >= 37` is capped at 1.5x
/// instead of dividing by zero or a negative number.
pub fn estimate_one_rep_max(weight: f64, reps: u32) -> f64 {
  match reps {
    0 | 1 => weight,
    r if r >= BRZYCKI_REP_LIMIT => weight * HIGH_REP_CAP,
    r => weight * 36.0 / (37.0 - r as f64),
  }
}

pub fn set_e1rm(set: &SetRecord) -> f64 {
  estimate_one_rep_max(set.normalized_weight_kg(), set.actual_reps)
}

/// Sum of reps x weight (kg)
pub fn session_volume(sets: &[SetRecord]) -> f64 {
  sets
    .iter()
    .map(|s| s.actual_reps as f64 * s.normalized_weight_kg())
    .sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().sum::<f64>() / values.len() as f64)
  }
}

/// Percent change from `previous` to `current`; 0 when there is no baseline
pub fn percent_change(previous: f64, current: f64) -> f64 {
  if previous.abs() < f64::EPSILON {
    0.0
  } else {
    (current - previous) / previous * 100.0
  }
}

/// Percent change of the recent half's mean over the earlier half's mean.
///
/// `values` must already be in time order. The recent half is the last
/// `n / 2` values, so an odd middle value lands in the earlier half.
pub fn percent_change_between_halves(values: &[f64]) -> f64 {
  if values.len() < 2 {
    return 0.0;
  }
  let split = values.len() - values.len() / 2;
  let (earlier, recent) = values.split_at(split);
  match (mean(earlier), mean(recent)) {
    (Some(e), Some(r)) => percent_change(e, r),
    _ => 0.0,
  }
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}
