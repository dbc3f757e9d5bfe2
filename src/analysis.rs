//! Deterministic analysis layer for strength training logs
//!
//! Raw set logs are bucketed per session, reduced to volume / intensity /
//! strength series, classified into trends, scored for fatigue and finally
//! mapped to a performance status. Every function here is pure: the caller
//! passes in the window and the clock, so the same logs always produce the
//! same window.

pub mod aggregate;
pub mod fatigue;
pub mod insights;
pub mod metrics;
pub mod status;
pub mod trend;

use chrono::{DateTime, Utc};

use crate::models::{
  AnalysisOutcome, DateRange, ExerciseAnalytics, ExerciseRef, PerformanceWindow,
  ProgressionSettings, SessionRecord, SetRecord,
};

use aggregate::{aggregate_sessions, sort_by_completion, SessionBucket};
use fatigue::{fatigue_score, FatigueInputs};
use insights::generate_insights;
use metrics::{mean, percent_change_between_halves, session_volume, set_e1rm};
use status::{classify_status, StatusInputs};
use trend::classify_trend;

/// RPE assumed when no set in the window logged one
pub const DEFAULT_RPE: f64 = 7.0;

/// Recovery score assumed when no session in the window logged one
pub const DEFAULT_RECOVERY: f64 = 7.0;

/// ---------------------------------------------------------------------------
/// Analysis Request
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
  pub user_id: &'a str,
  pub exercise: &'a ExerciseRef,
  pub range: DateRange,
  /// Length of `range` in weeks
  pub weeks: u32,
  pub analyzed_at: DateTime<Utc>,
}

/// Analyze one exercise from its raw logs.
///
/// No usable sessions in the window yields `AnalysisOutcome::NoData`.
pub fn analyze_exercise(
  request: &AnalysisRequest<'_>,
  sets: &[SetRecord],
  sessions: &[SessionRecord],
  settings: &ProgressionSettings,
) -> AnalysisOutcome {
  let buckets = aggregate_sessions(sets, sessions, &request.range);

  match build_window(&buckets, &request.range, request.weeks, settings) {
    Some(window) => {
      let insights = generate_insights(&window, settings);
      AnalysisOutcome::Analyzed(ExerciseAnalytics {
        user_id: request.user_id.to_string(),
        exercise: request.exercise.clone(),
        analyzed_at: request.analyzed_at,
        window,
        insights,
      })
    }
    None => AnalysisOutcome::NoData {
      exercise: request.exercise.clone(),
    },
  }
}

/// ---------------------------------------------------------------------------
/// Performance Window
/// ---------------------------------------------------------------------------

/// Reduce session buckets to a performance window. `None` when empty.
pub fn build_window(
  buckets: &[SessionBucket],
  range: &DateRange,
  weeks: u32,
  settings: &ProgressionSettings,
) -> Option<PerformanceWindow> {
  if buckets.is_empty() {
    return None;
  }

  // Everything below splits or regresses over time order
  let mut ordered: Vec<&SessionBucket> = buckets.iter().collect();
  sort_by_completion(&mut ordered, |b| b.completed_at);

  let sets: Vec<&SetRecord> = ordered.iter().flat_map(|b| b.sets.iter()).collect();

  // Volume
  let volumes: Vec<f64> = ordered.iter().map(|b| session_volume(&b.sets)).collect();
  let total_volume: f64 = volumes.iter().sum();
  let avg_volume_per_session = total_volume / volumes.len() as f64;
  let volume_trend = classify_trend(&volumes);
  let volume_change_pct = percent_change_between_halves(&volumes);

  // Intensity
  let weights: Vec<f64> = sets.iter().map(|s| s.normalized_weight_kg()).collect();
  let avg_weight = mean(&weights).unwrap_or(0.0);
  let max_weight = weights.iter().copied().fold(0.0, f64::max);
  let weight_trend = classify_trend(&weekly_max_weights(&ordered, range, weeks));

  let rpes: Vec<f64> = sets.iter().filter_map(|s| s.actual_rpe).collect();
  let avg_rpe = mean(&rpes).unwrap_or(DEFAULT_RPE);
  let high_rpe_frequency = rpes
    .iter()
    .filter(|r| **r >= settings.high_fatigue_rpe_threshold)
    .count() as u32;

  // Strength
  let e1rms: Vec<f64> = sets.iter().map(|s| set_e1rm(s)).collect();
  let estimated_1rm = e1rms.last().copied().unwrap_or(0.0);
  let e1rm_change_pct = percent_change_between_halves(&e1rms);

  // Adherence
  let sessions_completed = ordered.len() as u32;
  let expected = weeks * settings.target_sessions_per_week;
  let completion_rate = if expected == 0 {
    100.0
  } else {
    (sessions_completed as f64 / expected as f64 * 100.0).clamp(0.0, 100.0)
  };
  let sessions_skipped = expected.saturating_sub(sessions_completed);

  // Recovery
  let recoveries: Vec<f64> = ordered.iter().filter_map(|b| b.recovery_score).collect();
  let avg_recovery_score = mean(&recoveries).unwrap_or(DEFAULT_RECOVERY);

  let fatigue_score = fatigue_score(&FatigueInputs {
    avg_rpe,
    avg_recovery: avg_recovery_score,
    volume_change_pct,
    high_rpe_set_count: high_rpe_frequency,
  });

  let performance_status = classify_status(&StatusInputs {
    fatigue_score,
    weight_trend,
    volume_trend,
    weeks_analyzed: weeks,
    e1rm_change_pct,
  });

  Some(PerformanceWindow {
    window_start: range.start,
    window_end: range.end,
    weeks_analyzed: weeks,
    total_volume,
    avg_volume_per_session,
    volume_trend,
    volume_change_pct,
    avg_rpe,
    avg_weight,
    max_weight,
    weight_trend,
    estimated_1rm,
    e1rm_change_pct,
    sessions_completed,
    sessions_skipped,
    completion_rate,
    avg_recovery_score,
    high_rpe_frequency,
    fatigue_score,
    performance_status,
  })
}

/// Heaviest set per calendar week of the window, skipping weeks with no training
fn weekly_max_weights(ordered: &[&SessionBucket], range: &DateRange, weeks: u32) -> Vec<f64> {
  if weeks == 0 {
    return Vec::new();
  }
  let mut per_week: Vec<Option<f64>> = vec![None; weeks as usize];

  for bucket in ordered {
    let offset_days = (bucket.completed_at - range.start).num_days().max(0);
    let week = ((offset_days / 7) as usize).min(weeks as usize - 1);
    let heaviest = bucket
      .sets
      .iter()
      .map(|s| s.normalized_weight_kg())
      .fold(0.0, f64::max);
    per_week[week] = Some(per_week[week].map_or(heaviest, |w: f64| w.max(heaviest)));
  }

  per_week.into_iter().flatten().collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{PerformanceStatus, SessionStatus, Trend, WeightUnit};
  use chrono::Duration;

  fn exercise() -> ExerciseRef {
    ExerciseRef {
      id: "bench".to_string(),
      name: "Bench Press".to_string(),
    }
  }

  /// One session per (days_ago, weight) with three sets of `reps`
  fn weekly_logs(
    now: DateTime<Utc>,
    plan: &[(i64, f64)],
    reps: u32,
    rpe: f64,
    recovery: Option<f64>,
  ) -> (Vec<SetRecord>, Vec<SessionRecord>) {
    let mut sets = Vec::new();
    let mut sessions = Vec::new();
    for (i, (days_ago, weight)) in plan.iter().enumerate() {
      let id = format!("s{}", i);
      let at = now - Duration::days(*days_ago);
      for n in 0..3 {
        sets.push(SetRecord {
          exercise_id: "bench".to_string(),
          session_id: id.clone(),
          completed_at: at + Duration::minutes(n * 4),
          actual_reps: reps,
          actual_weight: *weight,
          actual_rpe: Some(rpe),
          weight_unit: WeightUnit::Kg,
          original_weight: None,
        });
      }
      sessions.push(SessionRecord {
        id,
        user_id: "u1".to_string(),
        plan_id: None,
        completed_at: at + Duration::minutes(10),
        session_rpe: Some(rpe),
        recovery_score: recovery,
        status: SessionStatus::Completed,
      });
    }
    (sets, sessions)
  }

  fn weekly_settings() -> ProgressionSettings {
    let mut settings = ProgressionSettings::for_user("u1");
    settings.target_sessions_per_week = 1;
    settings
  }

  #[test]
  fn test_flat_month_is_plateaued() {
    // Arrange: four weekly sessions at a constant load
    let now = Utc::now();
    let ex = exercise();
    let (sets, sessions) = weekly_logs(
      now,
      &[(27, 85.0), (20, 85.0), (13, 85.0), (6, 85.0)],
      5,
      7.5,
      Some(7.0),
    );
    let request = AnalysisRequest {
      user_id: "u1",
      exercise: &ex,
      range: DateRange::weeks_before(now, 4),
      weeks: 4,
      analyzed_at: now,
    };

    // Act
    let outcome = analyze_exercise(&request, &sets, &sessions, &weekly_settings());

    // Assert
    let analytics = outcome.analytics().expect("expected analytics");
    let w = &analytics.window;
    assert_eq!(w.weight_trend, Trend::Stable);
    assert_eq!(w.volume_trend, Trend::Stable);
    assert!(w.e1rm_change_pct.abs() < 2.0);
    assert!(w.fatigue_score < 7.0, "fatigue {}", w.fatigue_score);
    assert_eq!(w.completion_rate, 100.0);
    assert_eq!(w.performance_status, PerformanceStatus::Plateaued);
  }

  #[test]
  fn test_rising_load_is_progressing() {
    let now = Utc::now();
    let ex = exercise();
    let (sets, sessions) = weekly_logs(
      now,
      &[(27, 80.0), (20, 82.5), (13, 85.0), (6, 87.5)],
      8,
      7.0,
      None,
    );
    let request = AnalysisRequest {
      user_id: "u1",
      exercise: &ex,
      range: DateRange::weeks_before(now, 4),
      weeks: 4,
      analyzed_at: now,
    };

    let outcome = analyze_exercise(&request, &sets, &sessions, &weekly_settings());

    let w = &outcome.analytics().expect("expected analytics").window;
    assert_eq!(w.weight_trend, Trend::Increasing);
    assert_eq!(w.performance_status, PerformanceStatus::Progressing);
    assert_eq!(w.max_weight, 87.5);
    assert_eq!(w.avg_rpe, 7.0);
    assert_eq!(w.avg_recovery_score, DEFAULT_RECOVERY);
    assert!(w.e1rm_change_pct > 0.0);
  }

  #[test]
  fn test_no_sessions_is_no_data() {
    let now = Utc::now();
    let ex = exercise();
    let request = AnalysisRequest {
      user_id: "u1",
      exercise: &ex,
      range: DateRange::weeks_before(now, 4),
      weeks: 4,
      analyzed_at: now,
    };

    let outcome = analyze_exercise(&request, &[], &[], &weekly_settings());

    assert_eq!(outcome, AnalysisOutcome::NoData { exercise: ex.clone() });
  }

  #[test]
  fn test_completion_rate_is_capped() {
    // Two sessions a week against a one-per-week target
    let now = Utc::now();
    let (sets, sessions) = weekly_logs(
      now,
      &[(20, 80.0), (17, 80.0), (13, 80.0), (10, 80.0), (6, 80.0), (3, 80.0)],
      5,
      7.0,
      None,
    );
    let buckets = aggregate_sessions(&sets, &sessions, &DateRange::weeks_before(now, 3));

    let w = build_window(&buckets, &DateRange::weeks_before(now, 3), 3, &weekly_settings())
      .expect("window");

    assert_eq!(w.sessions_completed, 6);
    assert_eq!(w.completion_rate, 100.0);
    assert_eq!(w.sessions_skipped, 0);
  }

  #[test]
  fn test_missed_sessions_lower_completion() {
    let now = Utc::now();
    let (sets, sessions) = weekly_logs(now, &[(20, 80.0), (6, 80.0)], 5, 7.0, None);
    let range = DateRange::weeks_before(now, 4);
    let buckets = aggregate_sessions(&sets, &sessions, &range);

    // Default target is two sessions a week -> 8 expected
    let w = build_window(&buckets, &range, 4, &ProgressionSettings::for_user("u1")).expect("window");

    assert_eq!(w.completion_rate, 25.0);
    assert_eq!(w.sessions_skipped, 6);
  }

  #[test]
  fn test_window_is_order_independent() {
    let now = Utc::now();
    let (sets, sessions) = weekly_logs(
      now,
      &[(27, 80.0), (20, 82.5), (13, 85.0), (6, 87.5)],
      8,
      7.0,
      None,
    );
    let range = DateRange::weeks_before(now, 4);
    let mut buckets = aggregate_sessions(&sets, &sessions, &range);
    let forward = build_window(&buckets, &range, 4, &weekly_settings());

    buckets.reverse();
    let reversed = build_window(&buckets, &range, 4, &weekly_settings());

    assert_eq!(forward, reversed);
  }

  #[test]
  fn test_high_rpe_sets_are_counted() {
    let now = Utc::now();
    let (sets, sessions) = weekly_logs(now, &[(13, 100.0), (6, 100.0)], 3, 9.5, Some(5.0));
    let range = DateRange::weeks_before(now, 2);
    let buckets = aggregate_sessions(&sets, &sessions, &range);

    let w = build_window(&buckets, &range, 2, &weekly_settings()).expect("window");

    assert_eq!(w.high_rpe_frequency, 6);
    // 1.875 rpe + 1.5 recovery + 1.2 high-rpe
    assert!((w.fatigue_score - 4.6).abs() < 0.051, "fatigue {}", w.fatigue_score);
  }
}
