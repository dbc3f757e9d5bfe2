use serde::{Deserialize, Serialize};

use crate::models::{PerformanceStatus, Trend};

/// Fatigue at or above this is treated as overreaching
pub const HIGH_FATIGUE: f64 = 7.0;

/// Minimum weeks before a flat window counts as a plateau
pub const PLATEAU_MIN_WEEKS: u32 = 3;

/// e1RM change (%) inside which strength is considered flat
pub const PLATEAU_E1RM_BAND_PCT: f64 = 2.0;

/// e1RM drop (%) that counts as regression on its own
pub const REGRESSION_E1RM_PCT: f64 = -5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusInputs {
  pub fatigue_score: f64,
  pub weight_trend: Trend,
  pub volume_trend: Trend,
  pub weeks_analyzed: u32,
  pub e1rm_change_pct: f64,
}

/// Priority-ordered classification; the first matching rule wins
pub fn classify_status(inputs: &StatusInputs) -> PerformanceStatus {
  let StatusInputs {
    fatigue_score,
    weight_trend,
    volume_trend,
    weeks_analyzed,
    e1rm_change_pct,
  } = *inputs;

  if fatigue_score >= HIGH_FATIGUE
    && (weight_trend == Trend::Decreasing || volume_trend == Trend::Decreasing)
  {
    PerformanceStatus::Overtrained
  } else if weeks_analyzed >= PLATEAU_MIN_WEEKS
    && e1rm_change_pct.abs() < PLATEAU_E1RM_BAND_PCT
    && weight_trend == Trend::Stable
    && volume_trend == Trend::Stable
  {
    PerformanceStatus::Plateaued
  } else if weight_trend == Trend::Increasing
    || (volume_trend == Trend::Increasing && e1rm_change_pct > 0.0)
  {
    PerformanceStatus::Progressing
  } else if weight_trend == Trend::Decreasing || e1rm_change_pct < REGRESSION_E1RM_PCT {
    PerformanceStatus::Regressing
  } else {
    PerformanceStatus::Maintaining
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::metrics::percent_change_between_halves;

  fn inputs() -> StatusInputs {
    StatusInputs {
      fatigue_score: 2.0,
      weight_trend: Trend::Stable,
      volume_trend: Trend::Stable,
      weeks_analyzed: 4,
      e1rm_change_pct: 0.0,
    }
  }

  #[test]
  fn test_flat_window_is_plateaued() {
    // e1RM [100, 100, 101, 99] over four weeks
    let status = classify_status(&StatusInputs {
      fatigue_score: 1.3,
      e1rm_change_pct: percent_change_between_halves(&[100.0, 100.0, 101.0, 99.0]),
      ..inputs()
    });
    assert_eq!(status, PerformanceStatus::Plateaued);
  }

  #[test]
  fn test_overtrained_beats_plateaued() {
    // Arrange: satisfies both overtrained (fatigue + decreasing) and, apart from
    // the decreasing trend, every plateau condition
    let both = StatusInputs {
      fatigue_score: 8.0,
      volume_trend: Trend::Decreasing,
      ..inputs()
    };

    // Act + Assert
    assert_eq!(classify_status(&both), PerformanceStatus::Overtrained);
  }

  #[test]
  fn test_high_fatigue_alone_is_not_overtrained() {
    let status = classify_status(&StatusInputs {
      fatigue_score: 9.0,
      ..inputs()
    });
    assert_eq!(status, PerformanceStatus::Plateaued);
  }

  #[test]
  fn test_too_few_weeks_is_not_plateau() {
    let status = classify_status(&StatusInputs {
      weeks_analyzed: 2,
      ..inputs()
    });
    assert_eq!(status, PerformanceStatus::Maintaining);
  }

  #[test]
  fn test_progressing_rules() {
    let by_weight = StatusInputs {
      weight_trend: Trend::Increasing,
      ..inputs()
    };
    assert_eq!(classify_status(&by_weight), PerformanceStatus::Progressing);

    let by_volume = StatusInputs {
      volume_trend: Trend::Increasing,
      e1rm_change_pct: 0.5,
      ..inputs()
    };
    assert_eq!(classify_status(&by_volume), PerformanceStatus::Progressing);

    let volume_without_strength = StatusInputs {
      volume_trend: Trend::Increasing,
      e1rm_change_pct: -0.5,
      ..inputs()
    };
    assert_eq!(
      classify_status(&volume_without_strength),
      PerformanceStatus::Maintaining
    );
  }

  #[test]
  fn test_regressing_rules() {
    let by_weight = StatusInputs {
      weight_trend: Trend::Decreasing,
      ..inputs()
    };
    assert_eq!(classify_status(&by_weight), PerformanceStatus::Regressing);

    let by_e1rm = StatusInputs {
      volume_trend: Trend::Volatile,
      e1rm_change_pct: -6.0,
      ..inputs()
    };
    assert_eq!(classify_status(&by_e1rm), PerformanceStatus::Regressing);
  }

  #[test]
  fn test_classification_is_deterministic() {
    let window = StatusInputs {
      fatigue_score: 5.5,
      weight_trend: Trend::Volatile,
      volume_trend: Trend::Increasing,
      weeks_analyzed: 6,
      e1rm_change_pct: 1.2,
    };
    let first = classify_status(&window);
    for _ in 0..50 {
      assert_eq!(classify_status(&window), first);
    }
  }
}
