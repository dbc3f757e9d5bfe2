//! Insight reports shared by the remote service and the local fallback.
//!
//! Field names follow the remote service's JSON so either side can fill them.

use serde::{Deserialize, Serialize};

use super::analytics::PerformanceStatus;
use super::settings::ProgressionSettings;
use super::text_enum;

/// Which provider produced a report. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
  Remote,
  #[default]
  Local,
}

text_enum!(InsightSource, "insight source" {
  Remote => "remote",
  Local => "local",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightMetrics {
  #[serde(rename = "estimatedOneRM")]
  pub estimated_one_rm: f64,
  pub volume_change: f64,
  #[serde(rename = "avgRPE")]
  pub avg_rpe: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightTrend {
  #[serde(rename = "oneRMChange")]
  pub one_rm_change: f64,
  #[serde(rename = "recentAvg1RM")]
  pub recent_avg_1rm: f64,
  #[serde(rename = "oldAvg1RM")]
  pub early_avg_1rm: f64,
}

/// Coarse per-exercise status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseInsight {
  pub exercise_name: String,
  pub performance_status: PerformanceStatus,
  pub recommendation: String,
  pub metrics: InsightMetrics,
  pub record_count: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trend: Option<InsightTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateauAlert {
  pub exercise_name: String,
  pub weeks_without_progress: u32,
  #[serde(rename = "currentAvg1RM")]
  pub current_avg_1rm: f64,
  pub improvement_percent: f64,
  pub recommended_action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
  #[serde(alias = "increase_intensity")]
  IncreaseWeight,
  Deload,
  #[serde(alias = "change_strategy")]
  ChangeExercise,
  Maintain,
}

text_enum!(SuggestionType, "suggestion type" {
  IncreaseWeight => "increase_weight",
  Deload => "deload",
  ChangeExercise => "change_exercise",
  Maintain => "maintain",
});

/// Lightweight suggestion, one per exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSuggestion {
  pub exercise_id: String,
  pub exercise_name: String,
  pub recommendation_type: SuggestionType,
  pub suggested_weight_change: Option<f64>,
  pub suggested_rep_change: Option<i32>,
  #[serde(default)]
  pub suggested_set_change: Option<i32>,
  pub reasoning: String,
  /// 0.0-1.0
  pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
  pub source: InsightSource,
  pub insights: Vec<ExerciseInsight>,
  /// Only known when the report was built locally
  pub settings: Option<ProgressionSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauReport {
  pub source: InsightSource,
  pub plateaus: Vec<PlateauAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
  pub source: InsightSource,
  pub recommendations: Vec<ProgressionSuggestion>,
}
