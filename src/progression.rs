//! Adjustment Recommender
//!
//! Turns an exercise's latest performance window plus its most recent working
//! set into concrete changes for the next session: load, sets and rest.
//!
//! Key principles:
//! - Every rule is parameterized by the user's progression mode
//! - Each dimension is decided independently, then merged into one suggestion
//! - Nothing is emitted unless at least one value actually changes
//! - Only aggressive users on a progressing exercise get auto-applied changes

use serde::{Deserialize, Serialize};

use crate::analysis::metrics::round_to;
use crate::analysis::status::HIGH_FATIGUE;
use crate::models::{
    AdjustmentRecommendation, ExercisePrescription, LastPerformance, PerformanceStatus,
    PerformanceWindow, ProgressionMode, ProgressionSettings, RepRange, Trend,
};

/// Load cut when the lifter falls well short of the rep target
const WEIGHT_CUT_PCT: f64 = 5.0;

/// Reps short of the target minimum before a cut is suggested
const MISSED_REPS_TOLERANCE: u32 = 2;

/// Longest rest extension suggested in one step
const MAX_REST_INCREASE_SECS: f64 = 60.0;

const STRENGTH_REST_SECS: u32 = 120;
const HYPERTROPHY_REST_SECS: u32 = 75;
const HYPERTROPHY_REST_CEILING_SECS: u32 = 90;

// ---------------------------------------------------------------------------
/// Adjustment: One decided dimension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment<T> {
    pub value: T,
    pub reason: String,
}

impl<T> Adjustment<T> {
    fn new(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
/// Weight
// ---------------------------------------------------------------------------

/// Next working weight from the last set's reps and RPE.
///
/// Hitting the top of the rep range easily, or landing inside both the rep
/// and RPE targets, earns the mode's increment. Missing the rep floor by more
/// than two reps costs 5%.
pub fn calculate_weight_adjustment(
    last: &LastPerformance,
    target_reps_min: u32,
    target_reps_max: u32,
    settings: &ProgressionSettings,
) -> Adjustment<f64> {
    let LastPerformance { weight, reps, rpe } = *last;
    let raised = round_to(weight * (1.0 + settings.weight_increment_pct / 100.0), 2);

    if reps >= target_reps_max && rpe < settings.rpe_target_min {
        Adjustment::new(
            raised,
            format!("Reached {} reps at RPE {}. Time to add weight.", reps, rpe),
        )
    } else if reps >= target_reps_min
        && rpe >= settings.rpe_target_min
        && rpe <= settings.rpe_target_max
    {
        Adjustment::new(
            raised,
            format!("Solid work at RPE {}. Ready for progressive overload.", rpe),
        )
    } else if reps + MISSED_REPS_TOLERANCE < target_reps_min {
        Adjustment::new(
            round_to(weight * (1.0 - WEIGHT_CUT_PCT / 100.0), 2),
            format!("Only {} reps completed. Lowering the load to rebuild volume.", reps),
        )
    } else if rpe > settings.rpe_target_max {
        Adjustment::new(
            weight,
            format!("RPE {} is above target. Holding weight while technique catches up.", rpe),
        )
    } else {
        Adjustment::new(weight, "Performance within target range. Holding weight.")
    }
}

// ---------------------------------------------------------------------------
/// Volume
// ---------------------------------------------------------------------------

/// Cut `sets` by a fraction, removing at least one set but never all of them
fn reduce_sets(sets: u32, fraction: f64) -> u32 {
    let reduction = ((sets as f64 * fraction).floor() as u32).max(1);
    sets.saturating_sub(reduction).max(1)
}

pub fn calculate_volume_adjustment(
    current_sets: u32,
    window: &PerformanceWindow,
    settings: &ProgressionSettings,
) -> Adjustment<u32> {
    let fatigue = window.fatigue_score;
    let status = window.performance_status;

    if fatigue >= HIGH_FATIGUE {
        Adjustment::new(
            reduce_sets(current_sets, 0.3),
            format!("Fatigue is high ({}/10). Trimming sets to recover.", fatigue),
        )
    } else if status == PerformanceStatus::Progressing
        && window.volume_trend == Trend::Increasing
        && fatigue < 5.0
    {
        Adjustment::new(
            current_sets + settings.volume_increment_sets,
            "Strong progress with good recovery. Adding volume.",
        )
    } else if status == PerformanceStatus::Plateaued && fatigue < 6.0 {
        Adjustment::new(current_sets + 1, "Progress has stalled. One more set may break it.")
    } else if matches!(
        status,
        PerformanceStatus::Overtrained | PerformanceStatus::Regressing
    ) {
        Adjustment::new(
            reduce_sets(current_sets, 0.4),
            "Performance is declining. Cutting volume to recover.",
        )
    } else {
        Adjustment::new(current_sets, "Performance steady. Holding volume.")
    }
}

// ---------------------------------------------------------------------------
/// Rest
// ---------------------------------------------------------------------------

pub fn calculate_rest_adjustment(
    current_rest_secs: u32,
    last_rpe: f64,
    target_reps: RepRange,
    fatigue_score: f64,
    settings: &ProgressionSettings,
) -> Adjustment<u32> {
    let avg_reps = target_reps.average();

    if fatigue_score >= HIGH_FATIGUE || last_rpe >= settings.high_fatigue_rpe_threshold {
        let increase = (current_rest_secs as f64 * 0.2).min(MAX_REST_INCREASE_SECS);
        Adjustment::new(
            (current_rest_secs as f64 + increase).round() as u32,
            "High fatigue or RPE. Longer rest between sets.",
        )
    } else if avg_reps <= 6.0 && current_rest_secs < STRENGTH_REST_SECS {
        Adjustment::new(
            STRENGTH_REST_SECS,
            "Strength rep range. Resting longer for full recovery.",
        )
    } else if avg_reps >= 12.0 && current_rest_secs > HYPERTROPHY_REST_CEILING_SECS {
        Adjustment::new(
            HYPERTROPHY_REST_SECS,
            "High rep range. Shorter rest keeps metabolic stress up.",
        )
    } else {
        Adjustment::new(current_rest_secs, "Rest suits the current rep range.")
    }
}

// ---------------------------------------------------------------------------
/// Confidence
// ---------------------------------------------------------------------------

/// 0-100; more history and cleaner trends mean more confidence
pub fn calculate_confidence(window: &PerformanceWindow) -> u8 {
    let mut confidence: u32 = 50;

    if window.sessions_completed >= 8 {
        confidence += 20;
    } else if window.sessions_completed >= 4 {
        confidence += 10;
    }

    if window.weight_trend == Trend::Increasing {
        confidence += 15;
    }
    if window.volume_trend == Trend::Stable {
        confidence += 10;
    }
    if window.volume_trend != Trend::Volatile {
        confidence += 10;
    }
    if window.completion_rate >= 80.0 {
        confidence += 15;
    }

    confidence.min(100) as u8
}

// ---------------------------------------------------------------------------
/// Recommendations
// ---------------------------------------------------------------------------

/// Everything needed to decide one exercise's adjustment
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub prescription: &'a ExercisePrescription,
    pub window: &'a PerformanceWindow,
    pub last: LastPerformance,
}

/// Merge the per-dimension decisions; `None` when nothing changes
pub fn recommend_adjustment(
    input: &RecommendationInput<'_>,
    settings: &ProgressionSettings,
) -> Option<AdjustmentRecommendation> {
    let RecommendationInput {
        prescription,
        window,
        last,
    } = *input;

    let weight = calculate_weight_adjustment(
        &last,
        prescription.target_reps.min,
        prescription.target_reps.max,
        settings,
    );
    let volume = calculate_volume_adjustment(prescription.target_sets, window, settings);
    let rest = calculate_rest_adjustment(
        prescription.rest_seconds,
        last.rpe,
        prescription.target_reps,
        window.fatigue_score,
        settings,
    );

    let weight_changed = (weight.value - last.weight).abs() > f64::EPSILON;
    let sets_changed = volume.value != prescription.target_sets;
    let rest_changed = rest.value != prescription.rest_seconds;

    if !(weight_changed || sets_changed || rest_changed) {
        return None;
    }

    let reason = [
        (weight_changed, weight.reason.as_str()),
        (sets_changed, volume.reason.as_str()),
        (rest_changed, rest.reason.as_str()),
    ]
    .iter()
    .filter(|(changed, _)| *changed)
    .map(|(_, reason)| *reason)
    .collect::<Vec<_>>()
    .join(" ");

    Some(AdjustmentRecommendation {
        exercise_id: prescription.exercise_id.clone(),
        exercise_name: prescription.exercise_name.clone(),
        current_weight: last.weight,
        recommended_weight: weight.value,
        current_sets: prescription.target_sets,
        recommended_sets: volume.value,
        current_reps: prescription.target_reps,
        recommended_reps: prescription.target_reps,
        current_rest_seconds: prescription.rest_seconds,
        recommended_rest_seconds: rest.value,
        reason,
        confidence: calculate_confidence(window),
        auto_apply: settings.mode == ProgressionMode::Aggressive
            && window.performance_status == PerformanceStatus::Progressing,
    })
}

/// Recommendations for every prescribed exercise with enough history.
/// Empty when the user has turned auto-adjust off.
pub fn generate_recommendations(
    inputs: &[RecommendationInput<'_>],
    settings: &ProgressionSettings,
) -> Vec<AdjustmentRecommendation> {
    if !settings.auto_adjust_enabled {
        tracing::debug!(user_id = %settings.user_id, "Auto-adjust disabled, skipping recommendations");
        return Vec::new();
    }

    inputs
        .iter()
        .filter_map(|input| recommend_adjustment(input, settings))
        .collect()
}

// ---------------------------------------------------------------------------
/// Set Feedback: Immediate response to a single logged set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetVerdict {
    Exceeded,   // Beat the rep range easily
    InZone,     // Reps and RPE on target
    TooHeavy,   // Short of the rep floor
    RpeHigh,    // Reps fine but grinding
    RoomToGrow, // Reps fine, RPE under target
    Solid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetFeedback {
    pub verdict: SetVerdict,
    pub message: String,
    pub should_adjust: bool,
    pub suggested_adjustment: Option<String>,
}

/// Classify one just-completed set against the rep and RPE targets
pub fn analyze_set_performance(
    reps: u32,
    weight: f64,
    rpe: f64,
    target_reps_min: u32,
    target_reps_max: u32,
    settings: &ProgressionSettings,
) -> SetFeedback {
    let in_rpe_band = rpe >= settings.rpe_target_min && rpe <= settings.rpe_target_max;

    let (verdict, message, suggested_adjustment) = if reps > target_reps_max
        && rpe < settings.rpe_target_min
    {
        (
            SetVerdict::Exceeded,
            "Great set. You may be ready for more weight.",
            Some(format!(
                "Consider adding {:.1}kg next set",
                weight * settings.weight_increment_pct / 100.0
            )),
        )
    } else if reps >= target_reps_min && reps <= target_reps_max && in_rpe_band {
        (SetVerdict::InZone, "Right in the target zone.", None)
    } else if reps < target_reps_min {
        (
            SetVerdict::TooHeavy,
            "Weight may be too heavy. Focus on form.",
            Some(format!(
                "Consider removing {:.1}kg",
                weight * WEIGHT_CUT_PCT / 100.0
            )),
        )
    } else if rpe > settings.rpe_target_max {
        (SetVerdict::RpeHigh, "Very intense. Watch your fatigue.", None)
    } else if rpe < settings.rpe_target_min {
        (
            SetVerdict::RoomToGrow,
            "Room to grow. Consider progressing.",
            Some("Ready for a more challenging load".to_string()),
        )
    } else {
        (SetVerdict::Solid, "Solid set.", None)
    };

    SetFeedback {
        verdict,
        message: message.to_string(),
        should_adjust: suggested_adjustment.is_some(),
        suggested_adjustment,
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::test_utils::mock_window;

    fn prescription(sets: u32, reps: RepRange, rest: u32) -> ExercisePrescription {
        ExercisePrescription {
            exercise_id: "bench".to_string(),
            exercise_name: "Bench Press".to_string(),
            target_sets: sets,
            target_reps: reps,
            rest_seconds: rest,
        }
    }

    fn last(weight: f64, reps: u32, rpe: f64) -> LastPerformance {
        LastPerformance { weight, reps, rpe }
    }

    #[test]
    fn test_in_zone_progression_raises_by_mode_increment() {
        // 87.5kg x 8 @ RPE 7, moderate mode (2.5%, RPE 7-9)
        let settings = ProgressionSettings::for_user("u1");

        let adjustment = calculate_weight_adjustment(&last(87.5, 8, 7.0), 8, 12, &settings);

        assert_approx_eq!(adjustment.value, 89.69, 0.001);
    }

    #[test]
    fn test_weight_rules_by_mode() {
        let aggressive = ProgressionSettings::with_mode("u1", ProgressionMode::Aggressive);
        let conservative = ProgressionSettings::with_mode("u1", ProgressionMode::Conservative);

        // Top of range at RPE 7 is below aggressive's 8 floor
        let up = calculate_weight_adjustment(&last(100.0, 12, 7.0), 8, 12, &aggressive);
        assert_approx_eq!(up.value, 105.0, 0.001);

        // RPE 7 is inside the conservative band
        let small = calculate_weight_adjustment(&last(100.0, 8, 7.0), 8, 12, &conservative);
        assert_approx_eq!(small.value, 101.0, 0.001);
    }

    #[test]
    fn test_missed_reps_cut_and_high_rpe_holds() {
        let settings = ProgressionSettings::for_user("u1");

        let cut = calculate_weight_adjustment(&last(100.0, 5, 9.5), 8, 12, &settings);
        assert_approx_eq!(cut.value, 95.0, 0.001);

        // Two short of the floor is tolerated
        let hold = calculate_weight_adjustment(&last(100.0, 6, 9.5), 8, 12, &settings);
        assert_eq!(hold.value, 100.0);
        assert!(hold.reason.contains("above target"));

        let default_hold = calculate_weight_adjustment(&last(100.0, 7, 6.0), 8, 12, &settings);
        assert_eq!(default_hold.value, 100.0);
    }

    #[test]
    fn test_volume_rules() {
        let settings = ProgressionSettings::for_user("u1");

        let mut tired = mock_window(PerformanceStatus::Maintaining);
        tired.fatigue_score = 7.5;
        assert_eq!(calculate_volume_adjustment(4, &tired, &settings).value, 3);
        assert_eq!(calculate_volume_adjustment(1, &tired, &settings).value, 1);

        let mut progressing = mock_window(PerformanceStatus::Progressing);
        progressing.volume_trend = Trend::Increasing;
        progressing.fatigue_score = 3.0;
        assert_eq!(calculate_volume_adjustment(3, &progressing, &settings).value, 4);

        let plateaued = mock_window(PerformanceStatus::Plateaued);
        assert_eq!(calculate_volume_adjustment(3, &plateaued, &settings).value, 4);

        let regressing = mock_window(PerformanceStatus::Regressing);
        assert_eq!(calculate_volume_adjustment(5, &regressing, &settings).value, 3);

        let steady = mock_window(PerformanceStatus::Maintaining);
        assert_eq!(calculate_volume_adjustment(3, &steady, &settings).value, 3);
    }

    #[test]
    fn test_rest_rules() {
        let settings = ProgressionSettings::for_user("u1");
        let hypertrophy = RepRange::new(12, 15);
        let strength = RepRange::new(3, 5);

        // +20%, capped at 60s
        assert_eq!(calculate_rest_adjustment(90, 9.5, hypertrophy, 2.0, &settings).value, 108);
        assert_eq!(calculate_rest_adjustment(400, 7.0, strength, 8.0, &settings).value, 460);

        assert_eq!(calculate_rest_adjustment(90, 7.0, strength, 2.0, &settings).value, 120);
        assert_eq!(calculate_rest_adjustment(120, 7.0, hypertrophy, 2.0, &settings).value, 75);
        assert_eq!(calculate_rest_adjustment(60, 7.0, hypertrophy, 2.0, &settings).value, 60);
    }

    #[test]
    fn test_confidence_scoring() {
        // 8 sessions, stable volume, full completion: 50 + 20 + 10 + 10 + 15
        let window = mock_window(PerformanceStatus::Maintaining);
        assert_eq!(calculate_confidence(&window), 100);

        let mut sparse = mock_window(PerformanceStatus::Maintaining);
        sparse.sessions_completed = 2;
        sparse.volume_trend = Trend::Volatile;
        sparse.completion_rate = 50.0;
        assert_eq!(calculate_confidence(&sparse), 50);

        let mut some = sparse.clone();
        some.sessions_completed = 5;
        some.weight_trend = Trend::Increasing;
        assert_eq!(calculate_confidence(&some), 75);
    }

    #[test]
    fn test_progressing_scenario_recommends_raise() {
        let settings = ProgressionSettings::for_user("u1");
        let mut window = mock_window(PerformanceStatus::Progressing);
        window.weight_trend = Trend::Increasing;
        let plan = prescription(3, RepRange::new(8, 12), 90);
        let input = RecommendationInput {
            prescription: &plan,
            window: &window,
            last: last(87.5, 8, 7.0),
        };

        let rec = recommend_adjustment(&input, &settings).expect("weight changes");

        assert_approx_eq!(rec.recommended_weight, 89.69, 0.001);
        assert_eq!(rec.recommended_sets, 3);
        assert_eq!(rec.recommended_rest_seconds, 90);
        assert!(rec.reason.contains("progressive overload"));
        assert_eq!(rec.confidence, 100);
        assert!(!rec.auto_apply);
    }

    #[test]
    fn test_auto_apply_only_for_aggressive_progressing() {
        let aggressive = ProgressionSettings::with_mode("u1", ProgressionMode::Aggressive);
        let plan = prescription(3, RepRange::new(8, 12), 90);
        let progressing = mock_window(PerformanceStatus::Progressing);
        let maintaining = mock_window(PerformanceStatus::Maintaining);

        let rec = |window: &PerformanceWindow| {
            recommend_adjustment(
                &RecommendationInput {
                    prescription: &plan,
                    window,
                    last: last(100.0, 12, 7.0),
                },
                &aggressive,
            )
            .expect("weight changes")
        };

        assert!(rec(&progressing).auto_apply);
        assert!(!rec(&maintaining).auto_apply);
    }

    #[test]
    fn test_nothing_changes_nothing_emitted() {
        let settings = ProgressionSettings::for_user("u1");
        let window = mock_window(PerformanceStatus::Maintaining);
        let plan = prescription(3, RepRange::new(8, 12), 90);
        let input = RecommendationInput {
            prescription: &plan,
            window: &window,
            last: last(100.0, 7, 6.5),
        };

        assert!(recommend_adjustment(&input, &settings).is_none());
    }

    #[test]
    fn test_auto_adjust_disabled_returns_empty() {
        let mut settings = ProgressionSettings::for_user("u1");
        let window = mock_window(PerformanceStatus::Progressing);
        let plan = prescription(3, RepRange::new(8, 12), 90);
        let inputs = [RecommendationInput {
            prescription: &plan,
            window: &window,
            last: last(87.5, 8, 7.0),
        }];

        assert_eq!(generate_recommendations(&inputs, &settings).len(), 1);

        settings.auto_adjust_enabled = false;
        assert!(generate_recommendations(&inputs, &settings).is_empty());
    }

    #[test]
    fn test_set_feedback() {
        let settings = ProgressionSettings::for_user("u1");

        let exceeded = analyze_set_performance(13, 100.0, 6.0, 8, 12, &settings);
        assert_eq!(exceeded.verdict, SetVerdict::Exceeded);
        assert_eq!(
            exceeded.suggested_adjustment.as_deref(),
            Some("Consider adding 2.5kg next set")
        );

        let zone = analyze_set_performance(10, 100.0, 8.0, 8, 12, &settings);
        assert_eq!(zone.verdict, SetVerdict::InZone);
        assert!(!zone.should_adjust);

        let heavy = analyze_set_performance(6, 100.0, 9.0, 8, 12, &settings);
        assert_eq!(heavy.verdict, SetVerdict::TooHeavy);
        assert!(heavy.should_adjust);

        assert_eq!(
            analyze_set_performance(10, 100.0, 9.5, 8, 12, &settings).verdict,
            SetVerdict::RpeHigh
        );
        assert_eq!(
            analyze_set_performance(10, 100.0, 6.0, 8, 12, &settings).verdict,
            SetVerdict::RoomToGrow
        );
    }
}
