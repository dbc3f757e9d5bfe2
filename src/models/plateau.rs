use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateauScope {
  Exercise,
  MuscleGroup,
  Overall,
}

text_enum!(PlateauScope, "plateau scope" {
  Exercise => "exercise",
  MuscleGroup => "muscle_group",
  Overall => "overall",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateauMetric {
  Weight,
  Volume,
  E1rm,
  Overall,
}

text_enum!(PlateauMetric, "plateau metric" {
  Weight => "weight",
  Volume => "volume",
  E1rm => "e1rm",
  Overall => "overall",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
  Deload,
  IncreaseVolume,
  DecreaseVolume,
  SwapExercise,
  ChangeRepRange,
  RestWeek,
}

text_enum!(RecommendedAction, "recommended action" {
  Deload => "deload",
  IncreaseVolume => "increase_volume",
  DecreaseVolume => "decrease_volume",
  SwapExercise => "swap_exercise",
  ChangeRepRange => "change_rep_range",
  RestWeek => "rest_week",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
  #[default]
  Pending,
  Applied,
  Dismissed,
  Completed,
}

text_enum!(ActionStatus, "action status" {
  Pending => "pending",
  Applied => "applied",
  Dismissed => "dismissed",
  Completed => "completed",
});

impl ActionStatus {
  /// Transitions only move forward; dismissed and completed are terminal
  pub fn can_transition_to(&self, next: ActionStatus) -> bool {
    matches!(
      (self, next),
      (Self::Pending, Self::Applied)
        | (Self::Pending, Self::Dismissed)
        | (Self::Applied, Self::Completed)
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDetails {
  pub reason: String,
  pub recommendation: String,
  pub expected_outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauRecord {
  /// Assigned by the store on append
  pub id: Option<i64>,
  pub user_id: String,
  /// None for overall-training plateaus
  pub exercise_id: Option<String>,
  pub exercise_name: Option<String>,
  pub detected_at: DateTime<Utc>,
  pub scope: PlateauScope,
  pub weeks_without_progress: u32,
  pub metric: PlateauMetric,
  pub previous_value: f64,
  pub current_value: f64,
  pub recommended_action: RecommendedAction,
  pub action_details: ActionDetails,
  pub action_status: ActionStatus,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_action_status_only_moves_forward() {
    assert!(ActionStatus::Pending.can_transition_to(ActionStatus::Applied));
    assert!(ActionStatus::Pending.can_transition_to(ActionStatus::Dismissed));
    assert!(ActionStatus::Applied.can_transition_to(ActionStatus::Completed));

    assert!(!ActionStatus::Completed.can_transition_to(ActionStatus::Pending));
    assert!(!ActionStatus::Completed.can_transition_to(ActionStatus::Applied));
    assert!(!ActionStatus::Dismissed.can_transition_to(ActionStatus::Pending));
    assert!(!ActionStatus::Applied.can_transition_to(ActionStatus::Pending));
    assert!(!ActionStatus::Pending.can_transition_to(ActionStatus::Pending));
  }

  #[test]
  fn test_recommended_action_text() {
    assert_eq!(RecommendedAction::ChangeRepRange.to_string(), "change_rep_range");
    assert_eq!("rest_week".parse::<RecommendedAction>(), Ok(RecommendedAction::RestWeek));
  }
}
