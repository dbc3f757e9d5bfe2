use serde::{Deserialize, Serialize};

use super::text_enum;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseInfo {
  pub id: String,
  pub name: String,
  pub muscle_groups: Vec<String>,
  pub movement_pattern: Option<String>,
  pub equipment: Vec<String>,
}

/// Why a substitute is being looked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapContext {
  Plateau,
  InjuryPrevention,
  Variety,
}

text_enum!(SwapContext, "swap context" {
  Plateau => "plateau",
  InjuryPrevention => "injury_prevention",
  Variety => "variety",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAlternative {
  pub exercise_id: String,
  pub name: String,
  /// Shared muscle groups, 0-100
  pub overlap_score: f64,
  /// Movement pattern similarity, 0-100
  pub similarity_score: f64,
  /// Negative is easier, positive is harder
  pub difficulty_difference: i32,
  pub equipment_compatible: bool,
  pub recommended_for: Vec<SwapContext>,
}
