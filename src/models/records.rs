use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;

/// Pounds to kilograms
pub const LBS_TO_KG: f64 = 0.453592;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
  #[default]
  Kg,
  Lbs,
}

text_enum!(WeightUnit, "weight unit" {
  Kg => "kg",
  Lbs => "lbs",
});

/// A single logged working set. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
  pub exercise_id: String,
  pub session_id: String,
  pub completed_at: DateTime<Utc>,
  pub actual_reps: u32,
  /// Stored weight, canonical kilograms unless `original_weight` says otherwise
  pub actual_weight: f64,
  pub actual_rpe: Option<f64>,
  pub weight_unit: WeightUnit,
  /// Weight as the user entered it, before any unit conversion
  pub original_weight: Option<f64>,
}

impl SetRecord {
  /// Weight in kilograms for cross-session comparison.
  ///
  /// A pounds entry that kept its original value is converted from that value;
  /// everything else is taken as already canonical.
  pub fn normalized_weight_kg(&self) -> f64 {
    match (self.weight_unit, self.original_weight) {
      (WeightUnit::Lbs, Some(original)) => original * LBS_TO_KG,
      _ => self.actual_weight,
    }
  }

  /// Zero-rep or zero-weight rows are logging mistakes, not training data
  pub fn is_valid(&self) -> bool {
    self.actual_reps > 0 && self.normalized_weight_kg() > 0.0
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  Planned,
  InProgress,
  #[default]
  Completed,
  Skipped,
}

text_enum!(SessionStatus, "session status" {
  Planned => "planned",
  InProgress => "in_progress",
  Completed => "completed",
  Skipped => "skipped",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
  pub id: String,
  pub user_id: String,
  pub plan_id: Option<String>,
  pub completed_at: DateTime<Utc>,
  /// Session-level RPE (1-10)
  pub session_rpe: Option<f64>,
  /// Recovery score (1-10)
  pub recovery_score: Option<f64>,
  pub status: SessionStatus,
}

/// Inclusive time range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl DateRange {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end }
  }

  /// The `weeks` weeks leading up to `end`. Saturates at the earliest
  /// representable instant.
  pub fn weeks_before(end: DateTime<Utc>, weeks: u32) -> Self {
    Self::reaching_back(end, Duration::weeks(i64::from(weeks)))
  }

  pub fn days_before(end: DateTime<Utc>, days: u32) -> Self {
    Self::reaching_back(end, Duration::days(i64::from(days)))
  }

  fn reaching_back(end: DateTime<Utc>, span: Duration) -> Self {
    Self {
      start: end.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC),
      end,
    }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    at >= self.start && at <= self.end
  }
}

/// An exercise the user is currently training
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRef {
  pub id: String,
  pub name: String,
}
