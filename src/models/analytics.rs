use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::records::ExerciseRef;
use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
  Increasing,
  #[default]
  Stable,
  Decreasing,
  Volatile,
}

text_enum!(Trend, "trend" {
  Increasing => "increasing",
  Stable => "stable",
  Decreasing => "decreasing",
  Volatile => "volatile",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
  Progressing,
  #[default]
  Maintaining,
  Regressing,
  Plateaued,
  Overtrained,
}

text_enum!(PerformanceStatus, "performance status" {
  Progressing => "progressing",
  Maintaining => "maintaining",
  Regressing => "regressing",
  Plateaued => "plateaued",
  Overtrained => "overtrained",
});

/// Derived snapshot of one exercise over an analysis window.
///
/// Recomputable from the raw logs at any time; stored copies are history only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceWindow {
  pub window_start: DateTime<Utc>,
  pub window_end: DateTime<Utc>,
  pub weeks_analyzed: u32,

  // Volume
  pub total_volume: f64,
  pub avg_volume_per_session: f64,
  pub volume_trend: Trend,
  /// Second half of the window vs the first half
  pub volume_change_pct: f64,

  // Intensity
  pub avg_rpe: f64,
  pub avg_weight: f64,
  pub max_weight: f64,
  pub weight_trend: Trend,

  // Strength
  pub estimated_1rm: f64,
  pub e1rm_change_pct: f64,

  // Adherence
  pub sessions_completed: u32,
  pub sessions_skipped: u32,
  pub completion_rate: f64,

  // Recovery
  pub avg_recovery_score: f64,
  pub high_rpe_frequency: u32,
  pub fatigue_score: f64,

  pub performance_status: PerformanceStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceInsights {
  pub summary: String,
  pub strengths: Vec<String>,
  pub concerns: Vec<String>,
  pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseAnalytics {
  pub user_id: String,
  pub exercise: ExerciseRef,
  pub analyzed_at: DateTime<Utc>,
  pub window: PerformanceWindow,
  pub insights: PerformanceInsights,
}

/// Result of analyzing one exercise. Missing history is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AnalysisOutcome {
  Analyzed(ExerciseAnalytics),
  NoData { exercise: ExerciseRef },
}

impl AnalysisOutcome {
  pub fn analytics(&self) -> Option<&ExerciseAnalytics> {
    match self {
      Self::Analyzed(a) => Some(a),
      Self::NoData { .. } => None,
    }
  }

  pub fn into_analytics(self) -> Option<ExerciseAnalytics> {
    match self {
      Self::Analyzed(a) => Some(a),
      Self::NoData { .. } => None,
    }
  }
}
