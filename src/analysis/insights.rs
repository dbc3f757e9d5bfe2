//! Rule-based coaching text for a performance window

use crate::models::{PerformanceInsights, PerformanceStatus, PerformanceWindow, ProgressionSettings, Trend};

use super::status::HIGH_FATIGUE;

pub fn generate_insights(window: &PerformanceWindow, settings: &ProgressionSettings) -> PerformanceInsights {
  let mut out = PerformanceInsights::default();

  out.summary = match window.performance_status {
    PerformanceStatus::Progressing => {
      out.strengths.push("Strength is trending up session over session".to_string());
      "Solid progress. Strength is climbing consistently, keep the current plan going.".to_string()
    }
    PerformanceStatus::Maintaining => {
      out
        .recommendations
        .push("Add 2.5-5% load or 1-2 reps per set to restart progress".to_string());
      "Performance is holding steady. Progressive overload is needed to keep advancing.".to_string()
    }
    PerformanceStatus::Plateaued => {
      out
        .concerns
        .push(format!("No meaningful progress in {}+ weeks", window.weeks_analyzed));
      out
        .recommendations
        .push("Run a deload week, then start a new training block".to_string());
      out
        .recommendations
        .push("Rotate in a variation of this exercise".to_string());
      "Progress has stalled. The training stimulus needs to change.".to_string()
    }
    PerformanceStatus::Regressing => {
      out.concerns.push("Strength or volume is declining".to_string());
      out.recommendations.push("Take a deload week to recover".to_string());
      out.recommendations.push("Review sleep and nutrition".to_string());
      "Performance is slipping. More recovery or less training stress is needed.".to_string()
    }
    PerformanceStatus::Overtrained => {
      out
        .concerns
        .push("High fatigue alongside falling performance".to_string());
      out
        .recommendations
        .push("Take 3-7 days of full rest or active recovery".to_string());
      out
        .recommendations
        .push("Reassess weekly volume and intensity".to_string());
      "Fatigue is high and performance is dropping, a sign of overtraining. Recovery comes first.".to_string()
    }
  };

  if window.weight_trend == Trend::Increasing {
    out.strengths.push("Load progression is working".to_string());
  }

  if window.volume_trend == Trend::Increasing && window.fatigue_score < 6.0 {
    out.strengths.push("Volume is rising without excess fatigue".to_string());
  }

  if window.completion_rate >= 80.0 {
    out.strengths.push("Excellent training consistency".to_string());
  } else if window.completion_rate < 60.0 {
    out
      .concerns
      .push("Missed sessions are likely limiting progress".to_string());
    out
      .recommendations
      .push("Aim to complete at least 80% of planned sessions".to_string());
  }

  if window.fatigue_score >= HIGH_FATIGUE {
    out.concerns.push("Fatigue is elevated".to_string());
    out
      .recommendations
      .push("Cut training volume by 20-30% for a week".to_string());
  }

  if window.avg_recovery_score <= settings.recovery_threshold {
    out.concerns.push(format!(
      "Recovery is averaging {:.1}, at or below your threshold of {:.1}",
      window.avg_recovery_score, settings.recovery_threshold
    ));
    out
      .recommendations
      .push("Prioritize sleep, nutrition and stress management".to_string());
  }

  if window.avg_rpe > 9.0 {
    out
      .concerns
      .push("Most sets are taken too close to failure".to_string());
    out
      .recommendations
      .push("Keep 1-2 reps in reserve (RPE 8) on most sets".to_string());
  } else if window.avg_rpe < 6.0 {
    out.concerns.push("Working sets look too easy".to_string());
    out
      .recommendations
      .push(format!("Target RPE {:.0}-{:.0} on working sets", settings.rpe_target_min, settings.rpe_target_max));
  }

  if window.e1rm_change_pct > 10.0 {
    out
      .strengths
      .push(format!("Estimated 1RM up {:.1}%", window.e1rm_change_pct));
  }

  out
}
