use serde::{Deserialize, Serialize};

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionMode {
  Aggressive,
  #[default]
  Moderate,
  Conservative,
}

text_enum!(ProgressionMode, "progression mode" {
  Aggressive => "aggressive",
  Moderate => "moderate",
  Conservative => "conservative",
});

/// The four numeric settings that a mode dictates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeDefaults {
  pub weight_increment_pct: f64,
  pub volume_increment_sets: u32,
  pub rpe_target_min: f64,
  pub rpe_target_max: f64,
}

impl ProgressionMode {
  pub fn defaults(&self) -> ModeDefaults {
    match self {
      Self::Aggressive => ModeDefaults {
        weight_increment_pct: 5.0,
        volume_increment_sets: 2,
        rpe_target_min: 8.0,
        rpe_target_max: 10.0,
      },
      Self::Moderate => ModeDefaults {
        weight_increment_pct: 2.5,
        volume_increment_sets: 1,
        rpe_target_min: 7.0,
        rpe_target_max: 9.0,
      },
      Self::Conservative => ModeDefaults {
        weight_increment_pct: 1.0,
        volume_increment_sets: 0,
        rpe_target_min: 6.0,
        rpe_target_max: 8.0,
      },
    }
  }
}

/// Per-user progression policy. One active record per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSettings {
  pub user_id: String,
  pub mode: ProgressionMode,
  pub auto_adjust_enabled: bool,
  pub auto_deload_enabled: bool,
  pub auto_swap_enabled: bool,
  pub weight_increment_pct: f64,
  pub volume_increment_sets: u32,
  pub rpe_target_min: f64,
  pub rpe_target_max: f64,
  pub plateau_detection_weeks: u32,
  pub deload_frequency_weeks: u32,
  /// Average recovery at or below this is called out as a concern
  pub recovery_threshold: f64,
  /// Sets at or above this RPE count as high-intensity
  pub high_fatigue_rpe_threshold: f64,
  /// Expected sessions per week, used for completion rate
  pub target_sessions_per_week: u32,
}

impl ProgressionSettings {
  pub fn for_user(user_id: &str) -> Self {
    Self::with_mode(user_id, ProgressionMode::default())
  }

  pub fn with_mode(user_id: &str, mode: ProgressionMode) -> Self {
    let d = mode.defaults();
    Self {
      user_id: user_id.to_string(),
      mode,
      auto_adjust_enabled: true,
      auto_deload_enabled: true,
      auto_swap_enabled: false,
      weight_increment_pct: d.weight_increment_pct,
      volume_increment_sets: d.volume_increment_sets,
      rpe_target_min: d.rpe_target_min,
      rpe_target_max: d.rpe_target_max,
      plateau_detection_weeks: 3,
      deload_frequency_weeks: 4,
      recovery_threshold: 5.0,
      high_fatigue_rpe_threshold: 9.0,
      target_sessions_per_week: 2,
    }
  }

  /// Switch mode, replacing all mode-derived values in a single assignment
  pub fn set_mode(&mut self, mode: ProgressionMode) {
    let ModeDefaults {
      weight_increment_pct,
      volume_increment_sets,
      rpe_target_min,
      rpe_target_max,
    } = mode.defaults();

    (
      self.mode,
      self.weight_increment_pct,
      self.volume_increment_sets,
      self.rpe_target_min,
      self.rpe_target_max,
    ) = (
      mode,
      weight_increment_pct,
      volume_increment_sets,
      rpe_target_min,
      rpe_target_max,
    );
  }
}
