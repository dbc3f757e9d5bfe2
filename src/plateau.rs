//! Plateau Detection
//!
//! Scans analyzed exercises for stalled progress and picks one corrective
//! action per plateau. Key rules:
//! - Progressing exercises are never flagged
//! - Non-plateaued exercises are only flagged while e1RM is flat (< 2%)
//! - Actions are priority ordered: recovery first, then stimulus changes
//! - An overall plateau needs at least half of tracked exercises stalled

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::status::{HIGH_FATIGUE, PLATEAU_E1RM_BAND_PCT};
use crate::models::{
    ActionDetails, ActionStatus, ExerciseAnalytics, PerformanceStatus, PerformanceWindow,
    PlateauMetric, PlateauRecord, PlateauScope, ProgressionSettings, RecommendedAction,
    SessionRecord, Trend,
};

/// Days of sessions considered for the overall fatigue check
pub const OVERALL_LOOKBACK_DAYS: i64 = 14;

/// Share of tracked exercises that must be stalled for an overall plateau
pub const OVERALL_PLATEAU_SHARE: f64 = 0.5;

const OVERALL_DELOAD_FATIGUE: f64 = 7.0;
const OVERALL_DELOAD_RECOVERY: f64 = 5.0;
const MISSING_SESSION_FATIGUE: f64 = 0.0;
const MISSING_SESSION_RECOVERY: f64 = 7.0;

// ---------------------------------------------------------------------------
/// Per-Exercise Detection
// ---------------------------------------------------------------------------

/// Which series stalled, in priority order
pub fn select_plateau_metric(window: &PerformanceWindow) -> PlateauMetric {
    if window.weight_trend == Trend::Stable {
        PlateauMetric::Weight
    } else if window.volume_trend == Trend::Stable {
        PlateauMetric::Volume
    } else {
        PlateauMetric::E1rm
    }
}

pub fn metric_value(window: &PerformanceWindow, metric: PlateauMetric) -> f64 {
    match metric {
        PlateauMetric::Weight => window.max_weight,
        PlateauMetric::Volume => window.avg_volume_per_session,
        PlateauMetric::E1rm | PlateauMetric::Overall => window.estimated_1rm,
    }
}

/// First matching rule wins
pub fn determine_recommended_action(window: &PerformanceWindow) -> (RecommendedAction, ActionDetails) {
    let fatigue = window.fatigue_score;

    if fatigue >= HIGH_FATIGUE {
        (
            RecommendedAction::Deload,
            details(
                "Accumulated fatigue is high enough to mask progress",
                "Cut volume by 40% for one week",
                "Recovered performance and a rebound in strength",
            ),
        )
    } else if window.volume_trend == Trend::Decreasing && fatigue < 6.0 {
        (
            RecommendedAction::IncreaseVolume,
            details(
                "Training stimulus has been dropping",
                "Add 1-2 working sets to this exercise",
                "More stimulus to drive adaptation",
            ),
        )
    } else if window.volume_trend == Trend::Increasing
        && window.performance_status == PerformanceStatus::Plateaued
    {
        (
            RecommendedAction::SwapExercise,
            details(
                "More volume is no longer producing gains on this movement",
                "Swap to a close variation of this exercise",
                "A novel stimulus to restart progress",
            ),
        )
    } else if window.completion_rate < 70.0 {
        (
            RecommendedAction::RestWeek,
            details(
                "Training has been inconsistent",
                "Take an easy week, then rebuild a consistent schedule",
                "Consistent training needed for progress",
            ),
        )
    } else {
        (
            RecommendedAction::ChangeRepRange,
            details(
                "Adapted to the current rep range",
                "Move to a different rep range (e.g. 6-8 or 12-15)",
                "A new intensity zone to trigger adaptation",
            ),
        )
    }
}

/// Flag one analyzed exercise.
///
/// `previous` is the most recent stored window from at least two detection
/// periods ago; without one, the current value doubles as the baseline.
pub fn detect_exercise_plateau(
    analytics: &ExerciseAnalytics,
    previous: Option<&PerformanceWindow>,
    settings: &ProgressionSettings,
    detected_at: DateTime<Utc>,
) -> Option<PlateauRecord> {
    let window = &analytics.window;

    if window.performance_status == PerformanceStatus::Progressing {
        return None;
    }
    if window.performance_status != PerformanceStatus::Plateaued
        && window.e1rm_change_pct.abs() >= PLATEAU_E1RM_BAND_PCT
    {
        return None;
    }

    let metric = select_plateau_metric(window);
    let current_value = metric_value(window, metric);
    let previous_value = previous
        .map(|p| metric_value(p, metric))
        .unwrap_or(current_value);
    let (recommended_action, action_details) = determine_recommended_action(window);

    Some(PlateauRecord {
        id: None,
        user_id: analytics.user_id.clone(),
        exercise_id: Some(analytics.exercise.id.clone()),
        exercise_name: Some(analytics.exercise.name.clone()),
        detected_at,
        scope: PlateauScope::Exercise,
        weeks_without_progress: settings.plateau_detection_weeks,
        metric,
        previous_value,
        current_value,
        recommended_action,
        action_details,
        action_status: ActionStatus::Pending,
    })
}

/// Cutoff for the "previous value" lookup
pub fn baseline_cutoff(settings: &ProgressionSettings, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::weeks(2 * i64::from(settings.plateau_detection_weeks)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ---------------------------------------------------------------------------
/// Overall Training Plateau
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentLoad {
    pub avg_fatigue: f64,
    pub avg_recovery: f64,
    pub sessions: usize,
}

impl RecentLoad {
    pub fn needs_deload(&self) -> bool {
        self.avg_fatigue >= OVERALL_DELOAD_FATIGUE || self.avg_recovery <= OVERALL_DELOAD_RECOVERY
    }
}

/// Average session RPE and recovery over the last two weeks
pub fn recent_load(sessions: &[SessionRecord], now: DateTime<Utc>) -> RecentLoad {
    let since = now - Duration::days(OVERALL_LOOKBACK_DAYS);
    let recent: Vec<&SessionRecord> = sessions
        .iter()
        .filter(|s| s.completed_at >= since && s.completed_at <= now)
        .collect();

    if recent.is_empty() {
        return RecentLoad {
            avg_fatigue: MISSING_SESSION_FATIGUE,
            avg_recovery: MISSING_SESSION_RECOVERY,
            sessions: 0,
        };
    }

    let n = recent.len() as f64;
    let fatigue: f64 = recent
        .iter()
        .map(|s| s.session_rpe.unwrap_or(MISSING_SESSION_FATIGUE))
        .sum();
    let recovery: f64 = recent
        .iter()
        .map(|s| s.recovery_score.unwrap_or(MISSING_SESSION_RECOVERY))
        .sum();

    RecentLoad {
        avg_fatigue: fatigue / n,
        avg_recovery: recovery / n,
        sessions: recent.len(),
    }
}

/// Overall plateau once at least half of tracked exercises are stalled
pub fn detect_overall_plateau(
    user_id: &str,
    exercise_plateaus: &[PlateauRecord],
    tracked_exercises: usize,
    load: &RecentLoad,
    detected_at: DateTime<Utc>,
) -> Option<PlateauRecord> {
    if tracked_exercises == 0 || exercise_plateaus.is_empty() {
        return None;
    }
    let share = exercise_plateaus.len() as f64 / tracked_exercises as f64;
    if share < OVERALL_PLATEAU_SHARE {
        return None;
    }

    let avg_weeks = exercise_plateaus
        .iter()
        .map(|p| p.weeks_without_progress as f64)
        .sum::<f64>()
        / exercise_plateaus.len() as f64;

    let (recommended_action, action_details) = if load.needs_deload() {
        (
            RecommendedAction::Deload,
            details(
                "Most exercises have stalled and recent sessions show accumulated fatigue",
                "Take a full deload week (40-50% volume reduction)",
                "System-wide recovery before the next training block",
            ),
        )
    } else {
        (
            RecommendedAction::RestWeek,
            details(
                "Most exercises have stalled",
                "Consider a full rest week or active recovery",
                "Fresh start for a new training block",
            ),
        )
    };

    Some(PlateauRecord {
        id: None,
        user_id: user_id.to_string(),
        exercise_id: None,
        exercise_name: None,
        detected_at,
        scope: PlateauScope::Overall,
        weeks_without_progress: avg_weeks.round() as u32,
        metric: PlateauMetric::Overall,
        previous_value: 0.0,
        current_value: 0.0,
        recommended_action,
        action_details,
        action_status: ActionStatus::Pending,
    })
}

// ---------------------------------------------------------------------------
/// Full Scan
// ---------------------------------------------------------------------------

/// One analyzed exercise plus its stored baseline window, if any
pub struct PlateauCandidate<'a> {
    pub analytics: &'a ExerciseAnalytics,
    pub previous: Option<&'a PerformanceWindow>,
}

/// Per-exercise plateaus followed by the overall plateau, if any
pub fn detect_plateaus(
    user_id: &str,
    candidates: &[PlateauCandidate<'_>],
    tracked_exercises: usize,
    recent_sessions: &[SessionRecord],
    settings: &ProgressionSettings,
    now: DateTime<Utc>,
) -> Vec<PlateauRecord> {
    let mut plateaus: Vec<PlateauRecord> = candidates
        .iter()
        .filter_map(|c| detect_exercise_plateau(c.analytics, c.previous, settings, now))
        .collect();

    let load = recent_load(recent_sessions, now);
    if let Some(overall) = detect_overall_plateau(user_id, &plateaus, tracked_exercises, &load, now) {
        plateaus.push(overall);
    }

    plateaus
}

fn details(reason: &str, recommendation: &str, expected_outcome: &str) -> ActionDetails {
    ActionDetails {
        reason: reason.to_string(),
        recommendation: recommendation.to_string(),
        expected_outcome: expected_outcome.to_string(),
    }
}
