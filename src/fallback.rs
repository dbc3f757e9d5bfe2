//! Local Fallback Analyzer
//!
//! A coarse re-derivation of exercise status straight from raw set logs. It
//! needs nothing but local history, so insights stay available when the
//! remote analysis service is unreachable. Thresholds are looser than the
//! main classifier on purpose.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::aggregate::sort_by_completion;
use crate::analysis::metrics::{mean, percent_change, round_to, session_volume, set_e1rm};
use crate::models::{
  ExerciseInsight, ExerciseRef, InsightMetrics, InsightTrend, PerformanceStatus, PlateauAlert,
  ProgressionMode, ProgressionSuggestion, SetRecord, SuggestionType,
};

/// Sessions at or below this count are split at the midpoint
const MIDPOINT_SPLIT_MAX_SESSIONS: usize = 5;

/// Bounds of the per-end window used for longer histories
const MIN_END_WINDOW: usize = 3;
const MAX_END_WINDOW: usize = 5;

/// A plateau alert needs at least this many sessions in the lookback
const MIN_PLATEAU_SESSIONS: usize = 3;

/// First-third to last-third e1RM gain (%) below which an exercise has stalled
const PLATEAU_IMPROVEMENT_PCT: f64 = 1.0;

/// Extra reps suggested when an exercise has stalled
const STALL_REP_INCREASE: i32 = 2;

/// ---------------------------------------------------------------------------
/// Session Summaries
/// ---------------------------------------------------------------------------

/// One exercise's work in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id: String,
  pub completed_at: DateTime<Utc>,
  /// e1RM of the session's best set
  pub top_e1rm: f64,
  pub volume: f64,
  pub avg_rpe: Option<f64>,
}

/// Group valid sets by exercise, then by session, oldest session first
pub fn summarize_by_exercise(sets: &[SetRecord]) -> BTreeMap<String, Vec<SessionSummary>> {
  let mut grouped: BTreeMap<&str, HashMap<&str, Vec<SetRecord>>> = BTreeMap::new();
  for set in sets.iter().filter(|s| s.is_valid()) {
    grouped
      .entry(set.exercise_id.as_str())
      .or_default()
      .entry(set.session_id.as_str())
      .or_default()
      .push(set.clone());
  }

  grouped
    .into_iter()
    .map(|(exercise_id, sessions)| {
      let mut summaries: Vec<SessionSummary> = sessions
        .into_iter()
        .filter_map(|(session_id, sets)| summarize_session(session_id, &sets))
        .collect();
      sort_by_completion(&mut summaries, |s| s.completed_at);
      (exercise_id.to_string(), summaries)
    })
    .collect()
}

fn summarize_session(session_id: &str, sets: &[SetRecord]) -> Option<SessionSummary> {
  let completed_at = sets.iter().map(|s| s.completed_at).max()?;
  let top_e1rm = sets.iter().map(set_e1rm).fold(0.0, f64::max);
  let rpes: Vec<f64> = sets.iter().filter_map(|s| s.actual_rpe).collect();

  Some(SessionSummary {
    session_id: session_id.to_string(),
    completed_at,
    top_e1rm,
    volume: session_volume(sets),
    avg_rpe: mean(&rpes),
  })
}

/// ---------------------------------------------------------------------------
/// Early / Recent Split
/// ---------------------------------------------------------------------------

/// Split a time-ordered history into (early, recent).
///
/// Up to five sessions split at the midpoint with the odd one out going to
/// the recent side. Longer histories compare equal windows of
/// `clamp(n / 2, 3, 5)` sessions taken from each end.
pub fn split_early_recent<T>(items: &[T]) -> (&[T], &[T]) {
  let n = items.len();
  if n <= MIDPOINT_SPLIT_MAX_SESSIONS {
    items.split_at(n / 2)
  } else {
    let window = (n / 2).clamp(MIN_END_WINDOW, MAX_END_WINDOW);
    (&items[..window], &items[n - window..])
  }
}

/// ---------------------------------------------------------------------------
/// Classification
/// ---------------------------------------------------------------------------

/// Progress and regression thresholds (e1RM %), scaled by mode.
/// Volume thresholds are double these.
fn thresholds(mode: ProgressionMode) -> (f64, f64) {
  match mode {
    ProgressionMode::Aggressive => (3.0, -2.0),
    ProgressionMode::Moderate => (2.0, -1.0),
    ProgressionMode::Conservative => (1.0, -0.5),
  }
}

/// Load step (kg) suggested for a progressing exercise
fn weight_step_kg(mode: ProgressionMode) -> f64 {
  match mode {
    ProgressionMode::Aggressive => 5.0,
    ProgressionMode::Moderate => 2.5,
    ProgressionMode::Conservative => 1.25,
  }
}

pub fn classify_change(one_rm_change: f64, volume_change: f64, mode: ProgressionMode) -> PerformanceStatus {
  let (progress, regress) = thresholds(mode);

  if one_rm_change > progress || volume_change > progress * 2.0 {
    PerformanceStatus::Progressing
  } else if one_rm_change < regress && volume_change < regress * 2.0 {
    PerformanceStatus::Regressing
  } else if one_rm_change.abs() < 1.0 && volume_change.abs() < 2.0 {
    PerformanceStatus::Plateaued
  } else {
    PerformanceStatus::Maintaining
  }
}

fn status_message(status: PerformanceStatus, mode: ProgressionMode) -> String {
  match status {
    PerformanceStatus::Progressing => format!(
      "Excellent progress. Consider adding {}kg or {} reps.",
      weight_step_kg(mode),
      STALL_REP_INCREASE
    ),
    PerformanceStatus::Regressing | PerformanceStatus::Overtrained => {
      "Performance is declining. Reduce volume, check form, or take a deload week.".to_string()
    }
    PerformanceStatus::Plateaued => {
      "Progress has stalled. Try new rep ranges, more volume, or a variation.".to_string()
    }
    PerformanceStatus::Maintaining => {
      "Performance is stable. Stay consistent or nudge intensity up.".to_string()
    }
  }
}

/// Coarse status for one exercise from its session history
pub fn analyze_locally(
  exercise_name: &str,
  sessions: &[SessionSummary],
  mode: ProgressionMode,
) -> ExerciseInsight {
  let record_count = sessions.len() as u32;

  if sessions.len() < 2 {
    let only = sessions.first();
    return ExerciseInsight {
      exercise_name: exercise_name.to_string(),
      performance_status: PerformanceStatus::Maintaining,
      recommendation: "Need more data to analyze progress.".to_string(),
      metrics: InsightMetrics {
        estimated_one_rm: only.map(|s| s.top_e1rm).unwrap_or(0.0),
        volume_change: 0.0,
        avg_rpe: only.and_then(|s| s.avg_rpe).unwrap_or(0.0),
      },
      record_count,
      trend: None,
    };
  }

  let (early, recent) = split_early_recent(sessions);
  let avg = |part: &[SessionSummary], f: fn(&SessionSummary) -> f64| {
    mean(&part.iter().map(f).collect::<Vec<_>>()).unwrap_or(0.0)
  };

  let early_1rm = avg(early, |s| s.top_e1rm);
  let recent_1rm = avg(recent, |s| s.top_e1rm);
  let one_rm_change = percent_change(early_1rm, recent_1rm);
  let volume_change = percent_change(avg(early, |s| s.volume), avg(recent, |s| s.volume));

  let recent_rpes: Vec<f64> = recent.iter().filter_map(|s| s.avg_rpe).collect();
  let status = classify_change(one_rm_change, volume_change, mode);

  ExerciseInsight {
    exercise_name: exercise_name.to_string(),
    performance_status: status,
    recommendation: status_message(status, mode),
    metrics: InsightMetrics {
      estimated_one_rm: round_to(recent_1rm, 1),
      volume_change: round_to(volume_change, 1),
      avg_rpe: round_to(mean(&recent_rpes).unwrap_or(0.0), 1),
    },
    record_count,
    trend: Some(InsightTrend {
      one_rm_change: round_to(one_rm_change, 1),
      recent_avg_1rm: round_to(recent_1rm, 1),
      early_avg_1rm: round_to(early_1rm, 1),
    }),
  }
}

/// ---------------------------------------------------------------------------
/// Plateau Alerts
/// ---------------------------------------------------------------------------

/// Movement-specific advice for breaking a stall
pub fn plateau_advice(exercise_name: &str) -> &'static str {
  let name = exercise_name.to_lowercase();

  if name.contains("squat") {
    "Try front squats or pause squats, or squat 2-3 times per week."
  } else if name.contains("bench") {
    "Try incline or close-grip bench, or add triceps accessory work."
  } else if name.contains("deadlift") {
    "Try deficit or Romanian deadlifts, or work on grip strength."
  } else if name.contains("press") || name.contains("shoulder") {
    "Try different pressing angles, press more often, or add rear delt work."
  } else if name.contains("row") || name.contains("pull") {
    "Try different grip widths or cable variations, or train it more often."
  } else {
    "Try a different rep range (5-8 or 12-15), add volume, or switch to a variation."
  }
}

/// Compare the first and last thirds of the lookback; under 1% gain is a stall
pub fn detect_local_plateau(
  exercise_name: &str,
  sessions: &[SessionSummary],
  plateau_weeks: u32,
  now: DateTime<Utc>,
) -> Option<PlateauAlert> {
  let cutoff = now
    .checked_sub_signed(Duration::weeks(i64::from(plateau_weeks)))
    .unwrap_or(DateTime::<Utc>::MIN_UTC);
  let recent: Vec<&SessionSummary> = sessions.iter().filter(|s| s.completed_at >= cutoff).collect();
  if recent.len() < MIN_PLATEAU_SESSIONS {
    return None;
  }

  let third = recent.len().div_ceil(3);
  let first = &recent[..third];
  let last = &recent[recent.len() - third..];

  let first_avg = mean(&first.iter().map(|s| s.top_e1rm).collect::<Vec<_>>()).unwrap_or(0.0);
  let last_avg = mean(&last.iter().map(|s| s.top_e1rm).collect::<Vec<_>>()).unwrap_or(0.0);
  let improvement = percent_change(first_avg, last_avg);

  if improvement >= PLATEAU_IMPROVEMENT_PCT {
    return None;
  }

  let span = last[last.len() - 1].completed_at - first[0].completed_at;
  Some(PlateauAlert {
    exercise_name: exercise_name.to_string(),
    weeks_without_progress: span.num_weeks().max(0) as u32,
    current_avg_1rm: round_to(last_avg, 1),
    improvement_percent: round_to(improvement, 1),
    recommended_action: plateau_advice(exercise_name).to_string(),
  })
}

/// ---------------------------------------------------------------------------
/// Suggestions
/// ---------------------------------------------------------------------------

/// More sessions behind an insight, more confidence in acting on it
pub fn confidence_for_records(record_count: u32) -> f64 {
  match record_count {
    10.. => 0.9,
    7..=9 => 0.8,
    5..=6 => 0.7,
    3..=4 => 0.6,
    _ => 0.5,
  }
}

pub fn suggest_locally(
  exercise: &ExerciseRef,
  insight: &ExerciseInsight,
  mode: ProgressionMode,
) -> ProgressionSuggestion {
  let step = weight_step_kg(mode);

  let (recommendation_type, weight, reps, reasoning) = match insight.performance_status {
    PerformanceStatus::Progressing => (
      SuggestionType::IncreaseWeight,
      Some(step),
      None,
      "Consistent progress. Time to raise the challenge.",
    ),
    PerformanceStatus::Plateaued => (
      SuggestionType::ChangeExercise,
      None,
      Some(STALL_REP_INCREASE),
      "Progress has stalled. Add reps before adding weight, or rotate the variation.",
    ),
    PerformanceStatus::Regressing | PerformanceStatus::Overtrained => (
      SuggestionType::Deload,
      Some(-step),
      None,
      "Performance is declining. Reduce load and focus on recovery.",
    ),
    PerformanceStatus::Maintaining => (
      SuggestionType::Maintain,
      None,
      None,
      "Performance is stable. Continue, or add a little volume.",
    ),
  };

  ProgressionSuggestion {
    exercise_id: exercise.id.clone(),
    exercise_name: exercise.name.clone(),
    recommendation_type,
    suggested_weight_change: weight,
    suggested_rep_change: reps,
    suggested_set_change: None,
    reasoning: reasoning.to_string(),
    confidence_score: confidence_for_records(insight.record_count),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::WeightUnit;

  fn summary(days_ago: i64, e1rm: f64, volume: f64) -> SessionSummary {
    SessionSummary {
      session_id: format!("s{}", days_ago),
      completed_at: Utc::now() - Duration::days(days_ago),
      top_e1rm: e1rm,
      volume,
      avg_rpe: Some(8.0),
    }
  }

  fn set(exercise: &str, session: &str, days_ago: i64, reps: u32, weight: f64) -> SetRecord {
    SetRecord {
      exercise_id: exercise.to_string(),
      session_id: session.to_string(),
      completed_at: Utc::now() - Duration::days(days_ago),
      actual_reps: reps,
      actual_weight: weight,
      actual_rpe: Some(8.0),
      weight_unit: WeightUnit::Kg,
      original_weight: None,
    }
  }

  #[test]
  fn test_split_policy() {
    let five = [1, 2, 3, 4, 5];
    assert_eq!(split_early_recent(&five), (&[1, 2][..], &[3, 4, 5][..]));

    let two = [1, 2];
    assert_eq!(split_early_recent(&two), (&[1][..], &[2][..]));

    let six = [1, 2, 3, 4, 5, 6];
    assert_eq!(split_early_recent(&six), (&[1, 2, 3][..], &[4, 5, 6][..]));

    let twelve: Vec<i32> = (1..=12).collect();
    let (early, recent) = split_early_recent(&twelve);
    assert_eq!(early, &[1, 2, 3, 4, 5]);
    assert_eq!(recent, &[8, 9, 10, 11, 12]);
  }

  #[test]
  fn test_summaries_are_sorted_and_skip_bad_sets() {
    let sets = vec![
      set("bench", "late", 1, 5, 100.0),
      set("bench", "early", 10, 5, 90.0),
      set("bench", "early", 10, 0, 90.0),
      set("squat", "late", 1, 5, 140.0),
    ];

    let grouped = summarize_by_exercise(&sets);

    let bench = &grouped["bench"];
    assert_eq!(bench.len(), 2);
    assert_eq!(bench[0].session_id, "early");
    assert_eq!(bench[0].volume, 450.0);
    assert_eq!(grouped["squat"].len(), 1);
  }

  #[test]
  fn test_classification_thresholds() {
    let m = ProgressionMode::Moderate;
    assert_eq!(classify_change(2.5, 0.0, m), PerformanceStatus::Progressing);
    assert_eq!(classify_change(0.0, 4.5, m), PerformanceStatus::Progressing);
    assert_eq!(classify_change(-1.5, -2.5, m), PerformanceStatus::Regressing);
    assert_eq!(classify_change(0.5, -1.0, m), PerformanceStatus::Plateaued);
    assert_eq!(classify_change(-1.5, 0.0, m), PerformanceStatus::Maintaining);

    // Conservative counts smaller gains as progress
    assert_eq!(
      classify_change(1.5, 0.0, ProgressionMode::Conservative),
      PerformanceStatus::Progressing
    );
  }

  #[test]
  fn test_single_session_needs_more_data() {
    let insight = analyze_locally("Bench", &[summary(1, 100.0, 1500.0)], ProgressionMode::Moderate);

    assert_eq!(insight.performance_status, PerformanceStatus::Maintaining);
    assert_eq!(insight.recommendation, "Need more data to analyze progress.");
    assert_eq!(insight.metrics.estimated_one_rm, 100.0);
    assert!(insight.trend.is_none());
  }

  #[test]
  fn test_rising_history_is_progressing() {
    let sessions = vec![
      summary(21, 100.0, 1500.0),
      summary(14, 102.0, 1500.0),
      summary(7, 105.0, 1550.0),
      summary(1, 107.0, 1600.0),
    ];

    let insight = analyze_locally("Bench", &sessions, ProgressionMode::Moderate);

    assert_eq!(insight.performance_status, PerformanceStatus::Progressing);
    let trend = insight.trend.expect("trend");
    assert_eq!(trend.early_avg_1rm, 101.0);
    assert_eq!(trend.recent_avg_1rm, 106.0);
    assert_eq!(insight.record_count, 4);
  }

  #[test]
  fn test_local_plateau_alert() {
    let now = Utc::now();
    let flat = vec![
      summary(20, 100.0, 1500.0),
      summary(13, 100.5, 1500.0),
      summary(6, 100.0, 1500.0),
    ];

    let alert = detect_local_plateau("Barbell Back Squat", &flat, 3, now).expect("stalled");

    assert_eq!(alert.weeks_without_progress, 2);
    assert!(alert.recommended_action.contains("front squats"));
    assert_eq!(alert.improvement_percent, 0.0);

    let climbing = vec![
      summary(20, 100.0, 1500.0),
      summary(13, 103.0, 1500.0),
      summary(6, 106.0, 1500.0),
    ];
    assert!(detect_local_plateau("Squat", &climbing, 3, now).is_none());

    // Too few sessions inside the lookback
    assert!(detect_local_plateau("Squat", &flat[1..], 3, now).is_none());
  }

  #[test]
  fn test_suggestions_follow_status() {
    let exercise = ExerciseRef {
      id: "bench".to_string(),
      name: "Bench Press".to_string(),
    };
    let mut insight = analyze_locally("Bench Press", &[], ProgressionMode::Moderate);
    insight.record_count = 7;

    insight.performance_status = PerformanceStatus::Regressing;
    let deload = suggest_locally(&exercise, &insight, ProgressionMode::Moderate);
    assert_eq!(deload.recommendation_type, SuggestionType::Deload);
    assert_eq!(deload.suggested_weight_change, Some(-2.5));
    assert_eq!(deload.confidence_score, 0.8);

    insight.performance_status = PerformanceStatus::Plateaued;
    let change = suggest_locally(&exercise, &insight, ProgressionMode::Moderate);
    assert_eq!(change.recommendation_type, SuggestionType::ChangeExercise);
    assert_eq!(change.suggested_rep_change, Some(2));
  }

  #[test]
  fn test_confidence_by_record_count() {
    assert_eq!(confidence_for_records(12), 0.9);
    assert_eq!(confidence_for_records(7), 0.8);
    assert_eq!(confidence_for_records(5), 0.7);
    assert_eq!(confidence_for_records(3), 0.6);
    assert_eq!(confidence_for_records(1), 0.5);
  }
}
