use serde::{Deserialize, Serialize};

use super::text_enum;

/// Target rep range, written as "8-12" or a single "5"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepRange {
  pub min: u32,
  pub max: u32,
}

impl RepRange {
  pub fn new(min: u32, max: u32) -> Self {
    Self { min, max }
  }

  pub fn average(&self) -> f64 {
    (self.min + self.max) as f64 / 2.0
  }
}

impl std::fmt::Display for RepRange {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.min == self.max {
      write!(f, "{}", self.min)
    } else {
      write!(f, "{}-{}", self.min, self.max)
    }
  }
}

impl std::str::FromStr for RepRange {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parse = |part: &str| {
      part
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid rep range: {}", s))
    };

    match s.split_once('-') {
      Some((lo, hi)) => {
        let (min, max) = (parse(lo)?, parse(hi)?);
        if min > max {
          return Err(format!("Invalid rep range: {}", s));
        }
        Ok(Self { min, max })
      }
      None => {
        let reps = parse(s)?;
        Ok(Self { min: reps, max: reps })
      }
    }
  }
}

/// Planned work for one exercise in an upcoming session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePrescription {
  pub exercise_id: String,
  pub exercise_name: String,
  pub target_sets: u32,
  pub target_reps: RepRange,
  pub rest_seconds: u32,
}

/// Most recent working set for an exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastPerformance {
  pub weight: f64,
  pub reps: u32,
  pub rpe: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecommendation {
  pub exercise_id: String,
  pub exercise_name: String,
  pub current_weight: f64,
  pub recommended_weight: f64,
  pub current_sets: u32,
  pub recommended_sets: u32,
  pub current_reps: RepRange,
  pub recommended_reps: RepRange,
  pub current_rest_seconds: u32,
  pub recommended_rest_seconds: u32,
  pub reason: String,
  /// 0-100
  pub confidence: u8,
  pub auto_apply: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationEvent {
  Accepted,
  Dismissed,
}

text_enum!(RecommendationEvent, "recommendation event" {
  Accepted => "accepted",
  Dismissed => "dismissed",
});

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_rep_range() {
    assert_eq!("8-12".parse::<RepRange>(), Ok(RepRange::new(8, 12)));
    assert_eq!(" 6 - 8 ".parse::<RepRange>(), Ok(RepRange::new(6, 8)));
    assert_eq!("5".parse::<RepRange>(), Ok(RepRange::new(5, 5)));
    assert!("12-8".parse::<RepRange>().is_err());
    assert!("amrap".parse::<RepRange>().is_err());
  }

  #[test]
  fn test_rep_range_display_and_average() {
    assert_eq!(RepRange::new(8, 12).to_string(), "8-12");
    assert_eq!(RepRange::new(5, 5).to_string(), "5");
    assert_eq!(RepRange::new(8, 12).average(), 10.0);
  }
}
