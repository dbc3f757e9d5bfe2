use serde::{Deserialize, Serialize};

use super::metrics::round_to;

pub const MAX_FATIGUE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueInputs {
  pub avg_rpe: f64,
  pub avg_recovery: f64,
  pub volume_change_pct: f64,
  /// Number of sets at or above the high-fatigue RPE threshold
  pub high_rpe_set_count: u32,
}

/// Composite 0-10 fatigue estimate, rounded to one decimal
pub fn fatigue_score(inputs: &FatigueInputs) -> f64 {
  let rpe = ((inputs.avg_rpe - 7.0) * 0.75).min(3.0);
  let recovery = ((10.0 - inputs.avg_recovery) * 0.3).min(3.0);
  let volume = ((inputs.volume_change_pct - 10.0).max(0.0) * 0.1).min(2.0);
  let high_rpe = (inputs.high_rpe_set_count as f64 * 0.2).min(2.0);

  let total = (rpe + recovery + volume + high_rpe).clamp(0.0, MAX_FATIGUE);
  round_to(total, 1)
}
