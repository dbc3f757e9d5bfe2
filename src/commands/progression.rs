//! Commands for settings and the adjustment recommender

use tracing::{info, warn};

use super::analysis::{analyze_exercise_performance, DEFAULT_ANALYSIS_WEEKS};
use super::{load_settings, CommandError};
use crate::db::AppState;
use crate::models::{
    AdjustmentRecommendation, ExerciseAnalytics, LastPerformance, ProgressionMode,
    ProgressionSettings, RecommendationEvent, RepRange,
};
use crate::progression::{
    analyze_set_performance, generate_recommendations, RecommendationInput, SetFeedback,
};
use crate::store::{LogStore, RecommendationConsumer, SettingsStore};

/// Get a user's settings, defaults when none are stored
pub async fn get_progression_settings(
    state: &AppState,
    user_id: &str,
) -> Result<ProgressionSettings, CommandError> {
    Ok(load_settings(state, user_id).await)
}

/// Store settings. A failed write keeps the new values for this run only.
pub async fn update_progression_settings(
    state: &AppState,
    settings: ProgressionSettings,
) -> Result<ProgressionSettings, CommandError> {
    if settings.rpe_target_min > settings.rpe_target_max {
        return Err(CommandError::InvalidInput(format!(
            "RPE target {}-{} is inverted",
            settings.rpe_target_min, settings.rpe_target_max
        )));
    }

    if let Err(e) = state.store.put_settings(&settings).await {
        warn!(user_id = %settings.user_id, error = %e, "Failed to save progression settings");
    }
    Ok(settings)
}

/// Switch mode, resetting the mode-derived values together
pub async fn set_progression_mode(
    state: &AppState,
    user_id: &str,
    mode: ProgressionMode,
) -> Result<ProgressionSettings, CommandError> {
    let mut settings = load_settings(state, user_id).await;
    settings.set_mode(mode);
    info!(user_id, mode = %mode, "Progression mode changed");
    update_progression_settings(state, settings).await
}

/// Adjustments for each exercise prescribed in `session_id`.
///
/// Exercises with no analyzable history or no logged set are skipped.
pub async fn get_session_recommendations(
    state: &AppState,
    user_id: &str,
    session_id: &str,
) -> Result<Vec<AdjustmentRecommendation>, CommandError> {
    let settings = load_settings(state, user_id).await;
    if !settings.auto_adjust_enabled {
        return Ok(Vec::new());
    }

    let prescriptions = state.store.session_prescriptions(session_id).await?;

    let mut history: Vec<(ExerciseAnalytics, LastPerformance)> = Vec::new();
    for prescription in &prescriptions {
        let outcome = analyze_exercise_performance(
            state,
            user_id,
            &prescription.exercise_id,
            DEFAULT_ANALYSIS_WEEKS,
        )
        .await?;
        let last = state
            .store
            .last_performance(user_id, &prescription.exercise_id)
            .await?;
        if let (Some(analytics), Some(last)) = (outcome.into_analytics(), last) {
            history.push((analytics, last));
        }
    }

    let inputs: Vec<RecommendationInput<'_>> = prescriptions
        .iter()
        .filter_map(|prescription| {
            history
                .iter()
                .find(|(analytics, _)| analytics.exercise.id == prescription.exercise_id)
                .map(|(analytics, last)| RecommendationInput {
                    prescription,
                    window: &analytics.window,
                    last: *last,
                })
        })
        .collect();

    let recommendations = generate_recommendations(&inputs, &settings);
    info!(
        user_id,
        session_id,
        prescribed = prescriptions.len(),
        recommended = recommendations.len(),
        "Generated session recommendations"
    );

    Ok(recommendations)
}

/// Log that a recommendation was accepted or dismissed
pub async fn record_recommendation_feedback(
    state: &AppState,
    user_id: &str,
    recommendation: &AdjustmentRecommendation,
    event: RecommendationEvent,
) -> Result<(), CommandError> {
    state
        .store
        .record_event(user_id, recommendation, event)
        .await?;
    Ok(())
}

/// Immediate feedback on one logged set
pub async fn evaluate_set(
    state: &AppState,
    user_id: &str,
    reps: u32,
    weight: f64,
    rpe: f64,
    target_reps: RepRange,
) -> Result<SetFeedback, CommandError> {
    let settings = load_settings(state, user_id).await;
    Ok(analyze_set_performance(
        reps,
        weight,
        rpe,
        target_reps.min,
        target_reps.max,
        &settings,
    ))
}
