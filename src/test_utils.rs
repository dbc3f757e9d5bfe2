//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Training log seeding
//! - Mock data factories
//! - Helper assertions

use crate::models::{
  ExerciseAnalytics, ExerciseInfo, ExerciseRef, PerformanceInsights, PerformanceStatus,
  PerformanceWindow, SessionRecord, SessionStatus, SetRecord, Trend, WeightUnit,
};
use crate::config::EngineConfig;
use crate::db::AppState;
use crate::store::SqliteStore;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Engine state over a fresh in-memory database, local analysis only
pub async fn setup_test_state() -> AppState {
  AppState::new(setup_test_db().await, EngineConfig::default())
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed one completed session per entry of `weights`, oldest first, spaced
/// `spacing_days` apart and ending yesterday. Each session logs three sets of
/// `reps` at that weight.
/// Returns the session IDs
pub async fn seed_training_history(
  store: &SqliteStore,
  user_id: &str,
  exercise_id: &str,
  weights: &[f64],
  reps: u32,
  spacing_days: i64,
) -> Vec<String> {
  let mut ids = Vec::new();
  let count = weights.len() as i64;

  for (i, weight) in weights.iter().enumerate() {
    let days_ago = 1 + (count - 1 - i as i64) * spacing_days;
    let session_id = format!("{}-{}-{}", user_id, exercise_id, i);
    let mut session = mock_session(&session_id, user_id, days_ago);
    session.session_rpe = Some(7.5);
    session.recovery_score = Some(7.0);
    store
      .insert_session(&session)
      .await
      .expect("Failed to insert test session");

    for _ in 0..3 {
      store
        .insert_set(&mock_set(exercise_id, &session_id, days_ago, reps, *weight))
        .await
        .expect("Failed to insert test set");
    }
    ids.push(session_id);
  }

  ids
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_session(id: &str, user_id: &str, days_ago: i64) -> SessionRecord {
  SessionRecord {
    id: id.to_string(),
    user_id: user_id.to_string(),
    plan_id: None,
    completed_at: datetime_days_ago(days_ago),
    session_rpe: None,
    recovery_score: None,
    status: SessionStatus::Completed,
  }
}

/// A kilogram set at RPE 7.5
pub fn mock_set(exercise_id: &str, session_id: &str, days_ago: i64, reps: u32, weight: f64) -> SetRecord {
  SetRecord {
    exercise_id: exercise_id.to_string(),
    session_id: session_id.to_string(),
    completed_at: datetime_days_ago(days_ago),
    actual_reps: reps,
    actual_weight: weight,
    actual_rpe: Some(7.5),
    weight_unit: WeightUnit::Kg,
    original_weight: None,
  }
}

pub fn mock_exercise(id: &str, name: &str) -> ExerciseInfo {
  ExerciseInfo {
    id: id.to_string(),
    name: name.to_string(),
    muscle_groups: vec!["chest".to_string()],
    movement_pattern: Some("push".to_string()),
    equipment: vec!["barbell".to_string()],
  }
}

/// A four-week window with flat numbers and the given status
pub fn mock_window(status: PerformanceStatus) -> PerformanceWindow {
  let now = Utc::now();
  PerformanceWindow {
    window_start: now - Duration::weeks(4),
    window_end: now,
    weeks_analyzed: 4,
    total_volume: 8000.0,
    avg_volume_per_session: 1000.0,
    volume_trend: Trend::Stable,
    volume_change_pct: 0.0,
    avg_rpe: 7.5,
    avg_weight: 85.0,
    max_weight: 85.0,
    weight_trend: Trend::Stable,
    estimated_1rm: 100.0,
    e1rm_change_pct: 0.0,
    sessions_completed: 8,
    sessions_skipped: 0,
    completion_rate: 100.0,
    avg_recovery_score: 7.0,
    high_rpe_frequency: 0,
    fatigue_score: 1.3,
    performance_status: status,
  }
}

/// Analytics for user `u1` recorded at `analyzed_at`
pub fn mock_analytics(exercise_id: &str, analyzed_at: DateTime<Utc>) -> ExerciseAnalytics {
  let mut window = mock_window(PerformanceStatus::Maintaining);
  window.window_end = analyzed_at;
  window.window_start = analyzed_at - Duration::weeks(4);
  ExerciseAnalytics {
    user_id: "u1".to_string(),
    exercise: ExerciseRef {
      id: exercise_id.to_string(),
      name: exercise_id.to_string(),
    },
    analyzed_at,
    window,
    insights: PerformanceInsights::default(),
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Create a DateTime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('set_logs', 'progression_settings', 'deload_windows')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 3, "Expected 3 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_history_spaces_sessions() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    let ids = seed_training_history(&store, "u1", "bench", &[80.0, 82.5, 85.0], 5, 3).await;
    assert_eq!(ids.len(), 3);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM set_logs")
      .fetch_one(&pool)
      .await
      .expect("Failed to count sets");
    assert_eq!(count, 9);

    // Oldest session is (n - 1) * spacing + 1 days back
    let oldest: DateTime<Utc> = sqlx::query_scalar("SELECT MIN(completed_at) FROM workout_sessions")
      .fetch_one(&pool)
      .await
      .expect("Failed to read oldest session");
    let age = (Utc::now() - oldest).num_days();
    assert!((6..=8).contains(&age), "Expected ~7 days, got {}", age);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_datetime_helpers_produce_correct_dates() {
    let now = Utc::now();
    let past = datetime_days_ago(7);

    let diff = now - past;
    assert!(diff.num_days() >= 6 && diff.num_days() <= 8,
            "Expected ~7 days difference, got {}", diff.num_days());
  }
}
