use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use super::{load_settings, CommandError};
use crate::analysis::{analyze_exercise, AnalysisRequest};
use crate::db::AppState;
use crate::models::{
  AnalysisOutcome, AnalysisReport, DateRange, ExerciseRef, PlateauReport, ProgressionSettings,
  RecommendationReport, SessionRecord,
};
use crate::store::{AnalyticsStore, ExerciseCatalog, LogStore};

/// Window used when the caller does not pick one
pub const DEFAULT_ANALYSIS_WEEKS: u32 = 4;

/// Longest analysis window accepted, about ten years
pub const MAX_ANALYSIS_WEEKS: u32 = 520;

pub const MAX_LOOKBACK_DAYS: u32 = MAX_ANALYSIS_WEEKS * 7;

/// ---------------------------------------------------------------------------
/// Exercise Analysis Commands
/// ---------------------------------------------------------------------------

/// Analyze one exercise over the last `weeks` weeks and record the result
pub async fn analyze_exercise_performance(
  state: &AppState,
  user_id: &str,
  exercise_id: &str,
  weeks: u32,
) -> Result<AnalysisOutcome, CommandError> {
  let weeks = validate_weeks(weeks)?;
  let now = Utc::now();
  let range = DateRange::weeks_before(now, weeks);

  let exercise = ExerciseRef {
    id: exercise_id.to_string(),
    name: state
      .store
      .resolve(exercise_id)
      .await?
      .map(|info| info.name)
      .unwrap_or_else(|| exercise_id.to_string()),
  };
  let sessions = state.store.query_sessions(user_id, &range).await?;
  let settings = load_settings(state, user_id).await;

  analyze_one(state, user_id, &exercise, &sessions, &settings, range, weeks, now).await
}

/// Analyze every exercise the user has logged, optionally within one plan.
///
/// Settings are read once and shared by all exercises.
pub async fn analyze_all_exercises(
  state: &AppState,
  user_id: &str,
  plan_id: Option<&str>,
  weeks: u32,
) -> Result<Vec<AnalysisOutcome>, CommandError> {
  let weeks = validate_weeks(weeks)?;
  let now = Utc::now();
  let range = DateRange::weeks_before(now, weeks);

  let exercises = state.store.tracked_exercises(user_id, plan_id).await?;
  let sessions = state.store.query_sessions(user_id, &range).await?;
  let settings = load_settings(state, user_id).await;

  let outcomes = join_all(
    exercises
      .iter()
      .map(|exercise| analyze_one(state, user_id, exercise, &sessions, &settings, range, weeks, now)),
  )
  .await
  .into_iter()
  .collect::<Result<Vec<_>, _>>()?;

  info!(
    user_id,
    exercises = outcomes.len(),
    analyzed = outcomes.iter().filter(|o| o.analytics().is_some()).count(),
    "Analyzed tracked exercises"
  );

  Ok(outcomes)
}

#[allow(clippy::too_many_arguments)]
async fn analyze_one(
  state: &AppState,
  user_id: &str,
  exercise: &ExerciseRef,
  sessions: &[SessionRecord],
  settings: &ProgressionSettings,
  range: DateRange,
  weeks: u32,
  now: DateTime<Utc>,
) -> Result<AnalysisOutcome, CommandError> {
  let sets = state.store.query_sets(user_id, &exercise.id, &range).await?;
  let request = AnalysisRequest {
    user_id,
    exercise,
    range,
    weeks,
    analyzed_at: now,
  };
  let outcome = analyze_exercise(&request, &sets, sessions, settings);

  // History only; a failed append does not invalidate the analysis
  if let Some(analytics) = outcome.analytics() {
    if let Err(e) = state.store.append_analytics(analytics).await {
      warn!(user_id, exercise_id = %exercise.id, error = %e, "Failed to record analytics");
    }
  }

  Ok(outcome)
}

fn validate_weeks(weeks: u32) -> Result<u32, CommandError> {
  if weeks == 0 {
    return Err(CommandError::InvalidInput("weeks must be at least 1".into()));
  }
  if weeks > MAX_ANALYSIS_WEEKS {
    return Err(CommandError::InvalidInput(format!(
      "weeks must be at most {}, got {}",
      MAX_ANALYSIS_WEEKS, weeks
    )));
  }
  Ok(weeks)
}

/// ---------------------------------------------------------------------------
/// Insight Commands
/// ---------------------------------------------------------------------------

/// Per-exercise status from whichever insight provider is available
pub async fn get_progression_insights(
  state: &AppState,
  user_id: &str,
  lookback_days: Option<u32>,
) -> Result<AnalysisReport, CommandError> {
  let lookback_days = lookback_days.unwrap_or(state.config.lookback_days);
  if lookback_days == 0 || lookback_days > MAX_LOOKBACK_DAYS {
    return Err(CommandError::InvalidInput(format!(
      "lookback must be 1-{} days, got {}",
      MAX_LOOKBACK_DAYS, lookback_days
    )));
  }
  Ok(state.insights.analyze(user_id, lookback_days).await?)
}

pub async fn get_plateau_alerts(state: &AppState, user_id: &str) -> Result<PlateauReport, CommandError> {
  let weeks = load_settings(state, user_id).await.plateau_detection_weeks;
  Ok(state.insights.detect_plateaus(user_id, weeks).await?)
}

pub async fn get_progression_suggestions(
  state: &AppState,
  user_id: &str,
) -> Result<RecommendationReport, CommandError> {
  Ok(state.insights.recommend(user_id).await?)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
