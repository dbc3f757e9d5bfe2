//! Storage collaborators
//!
//! The engine reads raw logs, settings and the exercise catalog through the
//! traits below and appends analysis history through `AnalyticsStore`.
//! `SqliteStore` implements all of them on one connection pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::models::{
  ActionStatus, AdjustmentRecommendation, DateRange, ExerciseAlternative, ExerciseAnalytics,
  ExerciseInfo, ExercisePrescription, ExerciseRef, LastPerformance, PerformanceInsights,
  PerformanceWindow, PlateauRecord, ProgressionSettings, RecommendationEvent, SessionRecord,
  SetRecord, SwapContext,
};

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Invalid stored value: {0}")]
  Decode(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid status transition: {0}")]
  InvalidTransition(String),
}

impl From<sqlx::Error> for StoreError {
  fn from(e: sqlx::Error) -> Self {
    StoreError::Database(e.to_string())
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(e: serde_json::Error) -> Self {
    StoreError::Decode(e.to_string())
  }
}

/// Read a text column into one of the closed enums
pub(crate) fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, StoreError>
where
  T: std::str::FromStr<Err = String>,
{
  let raw: String = row.try_get(column)?;
  raw.parse().map_err(StoreError::Decode)
}

/// ---------------------------------------------------------------------------
/// Collaborator Traits
/// ---------------------------------------------------------------------------

/// Raw training logs
#[async_trait]
pub trait LogStore: Send + Sync {
  /// Sets of one exercise, oldest first
  async fn query_sets(
    &self,
    user_id: &str,
    exercise_id: &str,
    range: &DateRange,
  ) -> Result<Vec<SetRecord>, StoreError>;

  /// Sets of every exercise, oldest first
  async fn query_user_sets(&self, user_id: &str, range: &DateRange) -> Result<Vec<SetRecord>, StoreError>;

  async fn query_sessions(&self, user_id: &str, range: &DateRange) -> Result<Vec<SessionRecord>, StoreError>;

  /// Exercises the user has logged, optionally limited to one plan
  async fn tracked_exercises(&self, user_id: &str, plan_id: Option<&str>) -> Result<Vec<ExerciseRef>, StoreError>;

  async fn session_prescriptions(&self, session_id: &str) -> Result<Vec<ExercisePrescription>, StoreError>;

  async fn last_performance(&self, user_id: &str, exercise_id: &str) -> Result<Option<LastPerformance>, StoreError>;
}

#[async_trait]
pub trait ExerciseCatalog: Send + Sync {
  async fn resolve(&self, exercise_id: &str) -> Result<Option<ExerciseInfo>, StoreError>;

  /// Substitutes applicable to `context`, best overlap first
  async fn alternatives(
    &self,
    exercise_id: &str,
    context: SwapContext,
  ) -> Result<Vec<ExerciseAlternative>, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
  async fn get_settings(&self, user_id: &str) -> Result<Option<ProgressionSettings>, StoreError>;
  async fn put_settings(&self, settings: &ProgressionSettings) -> Result<(), StoreError>;
}

/// Append-only analysis history
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
  async fn append_analytics(&self, analytics: &ExerciseAnalytics) -> Result<i64, StoreError>;

  /// Most recent analytics recorded at or before `before`
  async fn latest_analytics(
    &self,
    user_id: &str,
    exercise_id: &str,
    before: DateTime<Utc>,
  ) -> Result<Option<ExerciseAnalytics>, StoreError>;

  async fn append_plateau(&self, plateau: &PlateauRecord) -> Result<i64, StoreError>;

  async fn plateaus(&self, user_id: &str, status: Option<ActionStatus>) -> Result<Vec<PlateauRecord>, StoreError>;

  async fn update_plateau_status(&self, id: i64, next: ActionStatus) -> Result<PlateauRecord, StoreError>;
}

/// Accept/dismiss feedback from whoever displays recommendations
#[async_trait]
pub trait RecommendationConsumer: Send + Sync {
  async fn record_event(
    &self,
    user_id: &str,
    recommendation: &AdjustmentRecommendation,
    event: RecommendationEvent,
  ) -> Result<(), StoreError>;
}

/// ---------------------------------------------------------------------------
/// SQLite Implementation
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO workout_sessions (id, user_id, plan_id, completed_at, session_rpe, recovery_score, status)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.plan_id)
    .bind(session.completed_at)
    .bind(session.session_rpe)
    .bind(session.recovery_score)
    .bind(session.status.as_str())
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  pub async fn insert_set(&self, set: &SetRecord) -> Result<i64, StoreError> {
    let result = sqlx::query(
      r#"
      INSERT INTO set_logs (
        session_id, exercise_id, completed_at, actual_reps,
        actual_weight, actual_rpe, weight_unit, original_weight
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      "#,
    )
    .bind(&set.session_id)
    .bind(&set.exercise_id)
    .bind(set.completed_at)
    .bind(set.actual_reps as i64)
    .bind(set.actual_weight)
    .bind(set.actual_rpe)
    .bind(set.weight_unit.as_str())
    .bind(set.original_weight)
    .execute(&self.pool)
    .await?;
    Ok(result.last_insert_rowid())
  }

  pub async fn upsert_exercise(&self, exercise: &ExerciseInfo) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO exercises (id, name, muscle_groups, movement_pattern, equipment)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        muscle_groups = excluded.muscle_groups,
        movement_pattern = excluded.movement_pattern,
        equipment = excluded.equipment
      "#,
    )
    .bind(&exercise.id)
    .bind(&exercise.name)
    .bind(serde_json::to_string(&exercise.muscle_groups)?)
    .bind(&exercise.movement_pattern)
    .bind(serde_json::to_string(&exercise.equipment)?)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  pub async fn insert_alternative(
    &self,
    exercise_id: &str,
    alternative: &ExerciseAlternative,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT OR REPLACE INTO exercise_alternatives (
        exercise_id, alternative_id, muscle_group_overlap, movement_pattern_similarity,
        difficulty_difference, equipment_compatible, recommended_for
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      "#,
    )
    .bind(exercise_id)
    .bind(&alternative.exercise_id)
    .bind(alternative.overlap_score)
    .bind(alternative.similarity_score)
    .bind(alternative.difficulty_difference as i64)
    .bind(alternative.equipment_compatible)
    .bind(serde_json::to_string(&alternative.recommended_for)?)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  pub async fn insert_prescription(
    &self,
    session_id: &str,
    position: u32,
    prescription: &ExercisePrescription,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT OR REPLACE INTO session_prescriptions (
        session_id, exercise_id, position, target_sets, target_reps, rest_seconds
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
    )
    .bind(session_id)
    .bind(&prescription.exercise_id)
    .bind(position as i64)
    .bind(prescription.target_sets as i64)
    .bind(prescription.target_reps.to_string())
    .bind(prescription.rest_seconds as i64)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

fn row_to_set(row: &SqliteRow) -> Result<SetRecord, StoreError> {
  Ok(SetRecord {
    exercise_id: row.try_get("exercise_id")?,
    session_id: row.try_get("session_id")?,
    completed_at: row.try_get("completed_at")?,
    actual_reps: row.try_get::<i64, _>("actual_reps")?.max(0) as u32,
    actual_weight: row.try_get("actual_weight")?,
    actual_rpe: row.try_get("actual_rpe")?,
    weight_unit: parse_column(row, "weight_unit")?,
    original_weight: row.try_get("original_weight")?,
  })
}

fn row_to_session(row: &SqliteRow) -> Result<SessionRecord, StoreError> {
  Ok(SessionRecord {
    id: row.try_get("id")?,
    user_id: row.try_get("user_id")?,
    plan_id: row.try_get("plan_id")?,
    completed_at: row.try_get("completed_at")?,
    session_rpe: row.try_get("session_rpe")?,
    recovery_score: row.try_get("recovery_score")?,
    status: parse_column(row, "status")?,
  })
}

fn row_to_settings(row: &SqliteRow) -> Result<ProgressionSettings, StoreError> {
  Ok(ProgressionSettings {
    user_id: row.try_get("user_id")?,
    mode: parse_column(row, "mode")?,
    auto_adjust_enabled: row.try_get("auto_adjust_enabled")?,
    auto_deload_enabled: row.try_get("auto_deload_enabled")?,
    auto_swap_enabled: row.try_get("auto_swap_enabled")?,
    weight_increment_pct: row.try_get("weight_increment_pct")?,
    volume_increment_sets: row.try_get::<i64, _>("volume_increment_sets")? as u32,
    rpe_target_min: row.try_get("rpe_target_min")?,
    rpe_target_max: row.try_get("rpe_target_max")?,
    plateau_detection_weeks: row.try_get::<i64, _>("plateau_detection_weeks")? as u32,
    deload_frequency_weeks: row.try_get::<i64, _>("deload_frequency_weeks")? as u32,
    recovery_threshold: row.try_get("recovery_threshold")?,
    high_fatigue_rpe_threshold: row.try_get("high_fatigue_rpe_threshold")?,
    target_sessions_per_week: row.try_get::<i64, _>("target_sessions_per_week")? as u32,
  })
}

fn row_to_plateau(row: &SqliteRow) -> Result<PlateauRecord, StoreError> {
  let details: String = row.try_get("action_details_json")?;
  Ok(PlateauRecord {
    id: Some(row.try_get("id")?),
    user_id: row.try_get("user_id")?,
    exercise_id: row.try_get("exercise_id")?,
    exercise_name: row.try_get("exercise_name")?,
    detected_at: row.try_get("detected_at")?,
    scope: parse_column(row, "scope")?,
    weeks_without_progress: row.try_get::<i64, _>("weeks_without_progress")? as u32,
    metric: parse_column(row, "metric")?,
    previous_value: row.try_get("previous_value")?,
    current_value: row.try_get("current_value")?,
    recommended_action: parse_column(row, "recommended_action")?,
    action_details: serde_json::from_str(&details)?,
    action_status: parse_column(row, "action_status")?,
  })
}

const SET_COLUMNS: &str = "l.exercise_id, l.session_id, l.completed_at, l.actual_reps, \
   l.actual_weight, l.actual_rpe, l.weight_unit, l.original_weight";

const PLATEAU_COLUMNS: &str = "id, user_id, exercise_id, exercise_name, detected_at, scope, \
   weeks_without_progress, metric, previous_value, current_value, recommended_action, \
   action_details_json, action_status";

#[async_trait]
impl LogStore for SqliteStore {
  async fn query_sets(
    &self,
    user_id: &str,
    exercise_id: &str,
    range: &DateRange,
  ) -> Result<Vec<SetRecord>, StoreError> {
    let rows = sqlx::query(&format!(
      r#"
      SELECT {SET_COLUMNS}
      FROM set_logs l
      JOIN workout_sessions s ON s.id = l.session_id
      WHERE s.user_id = ?1 AND l.exercise_id = ?2
        AND l.completed_at >= ?3 AND l.completed_at <= ?4
      ORDER BY l.completed_at ASC, l.id ASC
      "#
    ))
    .bind(user_id)
    .bind(exercise_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(&self.pool)
    .await?;

    rows.iter().map(row_to_set).collect()
  }

  async fn query_user_sets(&self, user_id: &str, range: &DateRange) -> Result<Vec<SetRecord>, StoreError> {
    let rows = sqlx::query(&format!(
      r#"
      SELECT {SET_COLUMNS}
      FROM set_logs l
      JOIN workout_sessions s ON s.id = l.session_id
      WHERE s.user_id = ?1 AND l.completed_at >= ?2 AND l.completed_at <= ?3
      ORDER BY l.completed_at ASC, l.id ASC
      "#
    ))
    .bind(user_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(&self.pool)
    .await?;

    rows.iter().map(row_to_set).collect()
  }

  async fn query_sessions(&self, user_id: &str, range: &DateRange) -> Result<Vec<SessionRecord>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT id, user_id, plan_id, completed_at, session_rpe, recovery_score, status
      FROM workout_sessions
      WHERE user_id = ?1 AND completed_at >= ?2 AND completed_at <= ?3
      ORDER BY completed_at ASC
      "#,
    )
    .bind(user_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(&self.pool)
    .await?;

    rows.iter().map(row_to_session).collect()
  }

  async fn tracked_exercises(&self, user_id: &str, plan_id: Option<&str>) -> Result<Vec<ExerciseRef>, StoreError> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
      r#"
      SELECT DISTINCT l.exercise_id, e.name
      FROM set_logs l
      JOIN workout_sessions s ON s.id = l.session_id
      LEFT JOIN exercises e ON e.id = l.exercise_id
      WHERE s.user_id = ?1 AND (?2 IS NULL OR s.plan_id = ?2)
      ORDER BY l.exercise_id
      "#,
    )
    .bind(user_id)
    .bind(plan_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, name)| ExerciseRef {
          name: name.unwrap_or_else(|| id.clone()),
          id,
        })
        .collect(),
    )
  }

  async fn session_prescriptions(&self, session_id: &str) -> Result<Vec<ExercisePrescription>, StoreError> {
    let rows: Vec<(String, Option<String>, i64, String, i64)> = sqlx::query_as(
      r#"
      SELECT p.exercise_id, e.name, p.target_sets, p.target_reps, p.rest_seconds
      FROM session_prescriptions p
      LEFT JOIN exercises e ON e.id = p.exercise_id
      WHERE p.session_id = ?1
      ORDER BY p.position ASC
      "#,
    )
    .bind(session_id)
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|(exercise_id, name, sets, reps, rest)| {
        Ok(ExercisePrescription {
          exercise_name: name.unwrap_or_else(|| exercise_id.clone()),
          exercise_id,
          target_sets: sets.max(0) as u32,
          target_reps: reps.parse().map_err(StoreError::Decode)?,
          rest_seconds: rest.max(0) as u32,
        })
      })
      .collect()
  }

  async fn last_performance(&self, user_id: &str, exercise_id: &str) -> Result<Option<LastPerformance>, StoreError> {
    let row = sqlx::query(&format!(
      r#"
      SELECT {SET_COLUMNS}
      FROM set_logs l
      JOIN workout_sessions s ON s.id = l.session_id
      WHERE s.user_id = ?1 AND l.exercise_id = ?2
        AND l.actual_reps > 0 AND l.actual_weight > 0
      ORDER BY l.completed_at DESC, l.id DESC
      LIMIT 1
      "#
    ))
    .bind(user_id)
    .bind(exercise_id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(|r| {
        let set = row_to_set(&r)?;
        Ok(LastPerformance {
          weight: set.normalized_weight_kg(),
          reps: set.actual_reps,
          rpe: set.actual_rpe.unwrap_or(crate::analysis::DEFAULT_RPE),
        })
      })
      .transpose()
  }
}

#[async_trait]
impl ExerciseCatalog for SqliteStore {
  async fn resolve(&self, exercise_id: &str) -> Result<Option<ExerciseInfo>, StoreError> {
    let row: Option<(String, String, String, Option<String>, String)> = sqlx::query_as(
      "SELECT id, name, muscle_groups, movement_pattern, equipment FROM exercises WHERE id = ?1",
    )
    .bind(exercise_id)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(|(id, name, muscles, movement_pattern, equipment)| {
        Ok(ExerciseInfo {
          id,
          name,
          muscle_groups: serde_json::from_str(&muscles)?,
          movement_pattern,
          equipment: serde_json::from_str(&equipment)?,
        })
      })
      .transpose()
  }

  async fn alternatives(
    &self,
    exercise_id: &str,
    context: SwapContext,
  ) -> Result<Vec<ExerciseAlternative>, StoreError> {
    let rows: Vec<(String, Option<String>, f64, f64, i64, bool, String)> = sqlx::query_as(
      r#"
      SELECT a.alternative_id, e.name, a.muscle_group_overlap, a.movement_pattern_similarity,
             a.difficulty_difference, a.equipment_compatible, a.recommended_for
      FROM exercise_alternatives a
      LEFT JOIN exercises e ON e.id = a.alternative_id
      WHERE a.exercise_id = ?1
      ORDER BY a.muscle_group_overlap DESC, a.movement_pattern_similarity DESC
      "#,
    )
    .bind(exercise_id)
    .fetch_all(&self.pool)
    .await?;

    let mut result = Vec::new();
    for (alt_id, name, overlap, similarity, difficulty, equipment_ok, contexts) in rows {
      let recommended_for: Vec<SwapContext> = serde_json::from_str(&contexts)?;
      if !recommended_for.contains(&context) {
        continue;
      }
      result.push(ExerciseAlternative {
        name: name.unwrap_or_else(|| alt_id.clone()),
        exercise_id: alt_id,
        overlap_score: overlap,
        similarity_score: similarity,
        difficulty_difference: difficulty as i32,
        equipment_compatible: equipment_ok,
        recommended_for,
      });
    }
    Ok(result)
  }
}

#[async_trait]
impl SettingsStore for SqliteStore {
  async fn get_settings(&self, user_id: &str) -> Result<Option<ProgressionSettings>, StoreError> {
    let row = sqlx::query(
      r#"
      SELECT user_id, mode, auto_adjust_enabled, auto_deload_enabled, auto_swap_enabled,
             weight_increment_pct, volume_increment_sets, rpe_target_min, rpe_target_max,
             plateau_detection_weeks, deload_frequency_weeks, recovery_threshold,
             high_fatigue_rpe_threshold, target_sessions_per_week
      FROM progression_settings
      WHERE user_id = ?1
      "#,
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;

    row.as_ref().map(row_to_settings).transpose()
  }

  async fn put_settings(&self, settings: &ProgressionSettings) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO progression_settings (
        user_id, mode, auto_adjust_enabled, auto_deload_enabled, auto_swap_enabled,
        weight_increment_pct, volume_increment_sets, rpe_target_min, rpe_target_max,
        plateau_detection_weeks, deload_frequency_weeks, recovery_threshold,
        high_fatigue_rpe_threshold, target_sessions_per_week, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, CURRENT_TIMESTAMP)
      ON CONFLICT(user_id) DO UPDATE SET
        mode = excluded.mode,
        auto_adjust_enabled = excluded.auto_adjust_enabled,
        auto_deload_enabled = excluded.auto_deload_enabled,
        auto_swap_enabled = excluded.auto_swap_enabled,
        weight_increment_pct = excluded.weight_increment_pct,
        volume_increment_sets = excluded.volume_increment_sets,
        rpe_target_min = excluded.rpe_target_min,
        rpe_target_max = excluded.rpe_target_max,
        plateau_detection_weeks = excluded.plateau_detection_weeks,
        deload_frequency_weeks = excluded.deload_frequency_weeks,
        recovery_threshold = excluded.recovery_threshold,
        high_fatigue_rpe_threshold = excluded.high_fatigue_rpe_threshold,
        target_sessions_per_week = excluded.target_sessions_per_week,
        updated_at = CURRENT_TIMESTAMP
      "#,
    )
    .bind(&settings.user_id)
    .bind(settings.mode.as_str())
    .bind(settings.auto_adjust_enabled)
    .bind(settings.auto_deload_enabled)
    .bind(settings.auto_swap_enabled)
    .bind(settings.weight_increment_pct)
    .bind(settings.volume_increment_sets as i64)
    .bind(settings.rpe_target_min)
    .bind(settings.rpe_target_max)
    .bind(settings.plateau_detection_weeks as i64)
    .bind(settings.deload_frequency_weeks as i64)
    .bind(settings.recovery_threshold)
    .bind(settings.high_fatigue_rpe_threshold)
    .bind(settings.target_sessions_per_week as i64)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl AnalyticsStore for SqliteStore {
  async fn append_analytics(&self, analytics: &ExerciseAnalytics) -> Result<i64, StoreError> {
    let result = sqlx::query(
      r#"
      INSERT INTO performance_analytics (
        user_id, exercise_id, exercise_name, analyzed_at,
        performance_status, fatigue_score, window_json, insights_json
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      "#,
    )
    .bind(&analytics.user_id)
    .bind(&analytics.exercise.id)
    .bind(&analytics.exercise.name)
    .bind(analytics.analyzed_at)
    .bind(analytics.window.performance_status.as_str())
    .bind(analytics.window.fatigue_score)
    .bind(serde_json::to_string(&analytics.window)?)
    .bind(serde_json::to_string(&analytics.insights)?)
    .execute(&self.pool)
    .await?;
    Ok(result.last_insert_rowid())
  }

  async fn latest_analytics(
    &self,
    user_id: &str,
    exercise_id: &str,
    before: DateTime<Utc>,
  ) -> Result<Option<ExerciseAnalytics>, StoreError> {
    let row: Option<(String, String, String, DateTime<Utc>, String, String)> = sqlx::query_as(
      r#"
      SELECT user_id, exercise_id, exercise_name, analyzed_at, window_json, insights_json
      FROM performance_analytics
      WHERE user_id = ?1 AND exercise_id = ?2 AND analyzed_at <= ?3
      ORDER BY analyzed_at DESC, id DESC
      LIMIT 1
      "#,
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(before)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(|(user_id, id, name, analyzed_at, window, insights)| {
        let window: PerformanceWindow = serde_json::from_str(&window)?;
        let insights: PerformanceInsights = serde_json::from_str(&insights)?;
        Ok(ExerciseAnalytics {
          user_id,
          exercise: ExerciseRef { id, name },
          analyzed_at,
          window,
          insights,
        })
      })
      .transpose()
  }

  async fn append_plateau(&self, plateau: &PlateauRecord) -> Result<i64, StoreError> {
    let result = sqlx::query(
      r#"
      INSERT INTO plateau_detections (
        user_id, exercise_id, exercise_name, detected_at, scope, weeks_without_progress,
        metric, previous_value, current_value, recommended_action, action_details_json,
        action_status
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
      "#,
    )
    .bind(&plateau.user_id)
    .bind(&plateau.exercise_id)
    .bind(&plateau.exercise_name)
    .bind(plateau.detected_at)
    .bind(plateau.scope.as_str())
    .bind(plateau.weeks_without_progress as i64)
    .bind(plateau.metric.as_str())
    .bind(plateau.previous_value)
    .bind(plateau.current_value)
    .bind(plateau.recommended_action.as_str())
    .bind(serde_json::to_string(&plateau.action_details)?)
    .bind(plateau.action_status.as_str())
    .execute(&self.pool)
    .await?;
    Ok(result.last_insert_rowid())
  }

  async fn plateaus(&self, user_id: &str, status: Option<ActionStatus>) -> Result<Vec<PlateauRecord>, StoreError> {
    let rows = sqlx::query(&format!(
      r#"
      SELECT {PLATEAU_COLUMNS}
      FROM plateau_detections
      WHERE user_id = ?1 AND (?2 IS NULL OR action_status = ?2)
      ORDER BY detected_at DESC, id DESC
      "#
    ))
    .bind(user_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&self.pool)
    .await?;

    rows.iter().map(row_to_plateau).collect()
  }

  async fn update_plateau_status(&self, id: i64, next: ActionStatus) -> Result<PlateauRecord, StoreError> {
    let row = sqlx::query(&format!("SELECT {PLATEAU_COLUMNS} FROM plateau_detections WHERE id = ?1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| StoreError::NotFound(format!("plateau {}", id)))?;
    let plateau = row_to_plateau(&row)?;

    if !plateau.action_status.can_transition_to(next) {
      return Err(StoreError::InvalidTransition(format!(
        "plateau {} cannot go from {} to {}",
        id, plateau.action_status, next
      )));
    }

    // Guard on the old status so a concurrent update cannot be overwritten
    let updated = sqlx::query(
      "UPDATE plateau_detections SET action_status = ?1 WHERE id = ?2 AND action_status = ?3",
    )
    .bind(next.as_str())
    .bind(id)
    .bind(plateau.action_status.as_str())
    .execute(&self.pool)
    .await?;

    if updated.rows_affected() == 0 {
      return Err(StoreError::InvalidTransition(format!(
        "plateau {} changed status concurrently",
        id
      )));
    }

    Ok(PlateauRecord {
      action_status: next,
      ..plateau
    })
  }
}

#[async_trait]
impl RecommendationConsumer for SqliteStore {
  async fn record_event(
    &self,
    user_id: &str,
    recommendation: &AdjustmentRecommendation,
    event: RecommendationEvent,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO recommendation_events (user_id, exercise_id, event, recommendation_json, recorded_at)
      VALUES (?1, ?2, ?3, ?4, ?5)
      "#,
    )
    .bind(user_id)
    .bind(&recommendation.exercise_id)
    .bind(event.as_str())
    .bind(serde_json::to_string(recommendation)?)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    tracing::info!(
      user_id,
      exercise_id = %recommendation.exercise_id,
      event = %event,
      "Recorded recommendation feedback"
    );
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
