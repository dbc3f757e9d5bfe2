use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::info;

use super::analysis::analyze_all_exercises;
use super::{load_settings, CommandError};
use crate::db::AppState;
use crate::deload::{plan_deload, schedule_deload};
use crate::models::{
  ActionStatus, AnalysisOutcome, DateRange, DeloadReason, DeloadWindow, ExerciseAlternative,
  ExerciseAnalytics, PlateauRecord, PlateauScope, ProgressionSettings, RecommendedAction,
  SwapContext,
};
use crate::plateau::{baseline_cutoff, detect_plateaus, PlateauCandidate, OVERALL_LOOKBACK_DAYS};
use crate::store::{AnalyticsStore, ExerciseCatalog, LogStore};

/// Outcome of one plateau scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateauScan {
  pub plateaus: Vec<PlateauRecord>,
  /// Substitutes for exercises flagged swap_exercise, keyed by exercise id
  pub alternatives: BTreeMap<String, Vec<ExerciseAlternative>>,
  /// Deload triggered by the scan, or the one already running
  pub deload: Option<DeloadWindow>,
}

/// ---------------------------------------------------------------------------
/// Plateau Detection Commands
/// ---------------------------------------------------------------------------

/// Analyze every tracked exercise, flag plateaus and record them.
///
/// With auto-deload on, a plateau that calls for a deload schedules one
/// starting this week.
pub async fn detect_training_plateaus(
  state: &AppState,
  user_id: &str,
  plan_id: Option<&str>,
  weeks: u32,
) -> Result<PlateauScan, CommandError> {
  let outcomes = analyze_all_exercises(state, user_id, plan_id, weeks).await?;
  let settings = load_settings(state, user_id).await;
  let now = Utc::now();

  let analyzed: Vec<&ExerciseAnalytics> = outcomes.iter().filter_map(AnalysisOutcome::analytics).collect();

  let cutoff = baseline_cutoff(&settings, now);
  let baselines = join_all(
    analyzed
      .iter()
      .map(|a| state.store.latest_analytics(user_id, &a.exercise.id, cutoff)),
  )
  .await
  .into_iter()
  .collect::<Result<Vec<_>, _>>()?;

  let candidates: Vec<PlateauCandidate<'_>> = analyzed
    .iter()
    .zip(&baselines)
    .map(|(analytics, baseline)| PlateauCandidate {
      analytics: *analytics,
      previous: baseline.as_ref().map(|b| &b.window),
    })
    .collect();

  let recent_range = DateRange::days_before(now, OVERALL_LOOKBACK_DAYS as u32);
  let recent_sessions = state.store.query_sessions(user_id, &recent_range).await?;

  let mut plateaus = detect_plateaus(
    user_id,
    &candidates,
    outcomes.len(),
    &recent_sessions,
    &settings,
    now,
  );
  for plateau in plateaus.iter_mut() {
    plateau.id = Some(state.store.append_plateau(plateau).await?);
  }

  info!(
    user_id,
    tracked = outcomes.len(),
    plateaus = plateaus.len(),
    "Plateau scan complete"
  );

  let mut alternatives = BTreeMap::new();
  for plateau in &plateaus {
    if plateau.recommended_action != RecommendedAction::SwapExercise {
      continue;
    }
    if let Some(exercise_id) = &plateau.exercise_id {
      let options = state.store.alternatives(exercise_id, SwapContext::Plateau).await?;
      alternatives.insert(exercise_id.clone(), options);
    }
  }

  let deload = trigger_deload(state, &settings, plan_id, &plateaus, now.date_naive()).await?;

  Ok(PlateauScan {
    plateaus,
    alternatives,
    deload,
  })
}

/// Overall plateaus needing a deload are fatigue driven; exercise plateaus
/// asking for one are plateau recovery
async fn trigger_deload(
  state: &AppState,
  settings: &ProgressionSettings,
  plan_id: Option<&str>,
  plateaus: &[PlateauRecord],
  today: NaiveDate,
) -> Result<Option<DeloadWindow>, CommandError> {
  if !settings.auto_deload_enabled {
    return Ok(None);
  }

  let wants_deload = |scope: PlateauScope| {
    plateaus
      .iter()
      .any(|p| p.scope == scope && p.recommended_action == RecommendedAction::Deload)
  };
  let reason = if wants_deload(PlateauScope::Overall) {
    DeloadReason::FatigueDetected
  } else if wants_deload(PlateauScope::Exercise) {
    DeloadReason::PlateauRecovery
  } else {
    return Ok(None);
  };

  let window = plan_deload(&settings.user_id, plan_id, reason, 0, today);
  Ok(Some(schedule_deload(&state.db, window, today).await?))
}

/// ---------------------------------------------------------------------------
/// Plateau History Commands
/// ---------------------------------------------------------------------------

pub async fn get_plateau_history(
  state: &AppState,
  user_id: &str,
  status: Option<ActionStatus>,
) -> Result<Vec<PlateauRecord>, CommandError> {
  Ok(state.store.plateaus(user_id, status).await?)
}

/// Move a plateau's action forward (applied, dismissed, completed)
pub async fn update_plateau_action(
  state: &AppState,
  plateau_id: i64,
  status: ActionStatus,
) -> Result<PlateauRecord, CommandError> {
  let updated = state.store.update_plateau_status(plateau_id, status).await?;
  info!(plateau_id, status = %status, "Plateau action updated");
  Ok(updated)
}

pub async fn get_exercise_alternatives(
  state: &AppState,
  exercise_id: &str,
  context: SwapContext,
) -> Result<Vec<ExerciseAlternative>, CommandError> {
  Ok(state.store.alternatives(exercise_id, context).await?)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
