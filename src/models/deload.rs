use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeloadType {
  VolumeReduction,
  IntensityReduction,
  FullRest,
  ActiveRecovery,
}

text_enum!(DeloadType, "deload type" {
  VolumeReduction => "volume_reduction",
  IntensityReduction => "intensity_reduction",
  FullRest => "full_rest",
  ActiveRecovery => "active_recovery",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeloadStatus {
  Scheduled,
  Active,
  Completed,
  Skipped,
}

text_enum!(DeloadStatus, "deload status" {
  Scheduled => "scheduled",
  Active => "active",
  Completed => "completed",
  Skipped => "skipped",
});

impl DeloadStatus {
  pub fn can_transition_to(&self, next: DeloadStatus) -> bool {
    matches!(
      (self, next),
      (Self::Scheduled, Self::Active)
        | (Self::Scheduled, Self::Skipped)
        | (Self::Active, Self::Completed)
        | (Self::Active, Self::Skipped)
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeloadReason {
  PlannedPeriodization,
  FatigueDetected,
  PlateauRecovery,
  InjuryPrevention,
  UserRequested,
}

text_enum!(DeloadReason, "deload reason" {
  PlannedPeriodization => "planned_periodization",
  FatigueDetected => "fatigue_detected",
  PlateauRecovery => "plateau_recovery",
  InjuryPrevention => "injury_prevention",
  UserRequested => "user_requested",
});

/// A temporary load-reduction window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeloadWindow {
  pub id: Option<i64>,
  pub user_id: String,
  pub plan_id: Option<String>,
  /// 1-based week index counted from the day the window was scheduled
  pub scheduled_week: u32,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub deload_type: DeloadType,
  pub reduction_pct: f64,
  pub status: DeloadStatus,
  pub reason: DeloadReason,
}

impl DeloadWindow {
  /// Active only while today falls inside the window; a stale status alone never counts
  pub fn is_active_on(&self, today: NaiveDate) -> bool {
    self.status == DeloadStatus::Active && self.start_date <= today && today <= self.end_date
  }
}

/// Load reductions to apply to a workout while a deload is running
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DeloadAdjustment {
  pub is_deload: bool,
  pub volume_reduction_pct: f64,
  pub intensity_reduction_pct: f64,
}
