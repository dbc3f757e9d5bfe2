/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// stored and serialized form is the same snake_case text.
macro_rules! text_enum {
  ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
    impl $name {
      pub fn as_str(&self) -> &'static str {
        match self {
          $(Self::$variant => $text,)+
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl std::str::FromStr for $name {
      type Err = String;
      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($text => Ok(Self::$variant),)+
          _ => Err(format!("Unknown {}: {}", $label, s)),
        }
      }
    }
  };
}

pub(crate) use text_enum;

pub mod analytics;
pub mod catalog;
pub mod deload;
pub mod plateau;
pub mod recommendation;
pub mod records;
pub mod report;
pub mod settings;

pub use analytics::{
  AnalysisOutcome, ExerciseAnalytics, PerformanceInsights, PerformanceStatus, PerformanceWindow,
  Trend,
};
pub use catalog::{ExerciseAlternative, ExerciseInfo, SwapContext};
pub use deload::{DeloadAdjustment, DeloadReason, DeloadStatus, DeloadType, DeloadWindow};
pub use plateau::{
  ActionDetails, ActionStatus, PlateauMetric, PlateauRecord, PlateauScope, RecommendedAction,
};
pub use recommendation::{
  AdjustmentRecommendation, ExercisePrescription, LastPerformance, RecommendationEvent, RepRange,
};
pub use records::{DateRange, ExerciseRef, SessionRecord, SessionStatus, SetRecord, WeightUnit};
pub use report::{
  AnalysisReport, ExerciseInsight, InsightMetrics, InsightSource, InsightTrend, PlateauAlert,
  PlateauReport, ProgressionSuggestion, RecommendationReport, SuggestionType,
};
pub use settings::{ProgressionMode, ProgressionSettings};
