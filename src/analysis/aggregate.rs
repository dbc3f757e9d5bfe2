//! Groups raw set logs into ordered per-session buckets

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DateRange, SessionRecord, SessionStatus, SetRecord};

/// All valid sets of one exercise performed in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBucket {
  pub session_id: String,
  pub completed_at: DateTime<Utc>,
  /// In completion order
  pub sets: Vec<SetRecord>,
  pub session_rpe: Option<f64>,
  pub recovery_score: Option<f64>,
}

/// Bucket `sets` by session, oldest first.
///
/// Sets outside `range`, malformed sets (zero reps or weight) and sets from
/// sessions marked skipped are dropped. A bucket is timestamped by its session
/// record when one exists, otherwise by its last set.
pub fn aggregate_sessions(
  sets: &[SetRecord],
  sessions: &[SessionRecord],
  range: &DateRange,
) -> Vec<SessionBucket> {
  let by_id: HashMap<&str, &SessionRecord> = sessions.iter().map(|s| (s.id.as_str(), s)).collect();

  let mut dropped = 0usize;
  let mut buckets: HashMap<&str, Vec<SetRecord>> = HashMap::new();
  for set in sets {
    let skipped = by_id
      .get(set.session_id.as_str())
      .is_some_and(|s| s.status == SessionStatus::Skipped);
    if !set.is_valid() || skipped || !range.contains(set.completed_at) {
      dropped += 1;
      continue;
    }
    buckets.entry(set.session_id.as_str()).or_default().push(set.clone());
  }

  if dropped > 0 {
    tracing::debug!(dropped, "Ignored set records outside the window or malformed");
  }

  let mut result: Vec<SessionBucket> = buckets
    .into_iter()
    .map(|(session_id, mut sets)| {
      sort_by_completion(&mut sets, |s| s.completed_at);
      let session = by_id.get(session_id).copied();
      let last_set_at = sets.last().map(|s| s.completed_at).unwrap_or(range.start);
      SessionBucket {
        session_id: session_id.to_string(),
        completed_at: session.map(|s| s.completed_at).unwrap_or(last_set_at),
        sets,
        session_rpe: session.and_then(|s| s.session_rpe),
        recovery_score: session.and_then(|s| s.recovery_score),
      }
    })
    .collect();

  sort_by_completion(&mut result, |b| b.completed_at);
  result
}

/// Stable ascending sort by timestamp. Trend and half-split math rely on it.
pub fn sort_by_completion<T, F>(items: &mut [T], at: F)
where
  F: Fn(&T) -> DateTime<Utc>,
{
  items.sort_by_key(|item| at(item));
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::WeightUnit;
  use chrono::Duration;

  fn set_at(session: &str, days_ago: i64, reps: u32, weight: f64, now: DateTime<Utc>) -> SetRecord {
    SetRecord {
      exercise_id: "row".to_string(),
      session_id: session.to_string(),
      completed_at: now - Duration::days(days_ago),
      actual_reps: reps,
      actual_weight: weight,
      actual_rpe: Some(7.0),
      weight_unit: WeightUnit::Kg,
      original_weight: None,
    }
  }

  fn session(id: &str, days_ago: i64, status: SessionStatus, now: DateTime<Utc>) -> SessionRecord {
    SessionRecord {
      id: id.to_string(),
      user_id: "u1".to_string(),
      plan_id: None,
      completed_at: now - Duration::days(days_ago),
      session_rpe: Some(7.5),
      recovery_score: Some(6.0),
      status,
    }
  }

  #[test]
  fn test_buckets_are_sorted_oldest_first() {
    // Arrange: logs arrive newest first, as a store might return them
    let now = Utc::now();
    let range = DateRange::weeks_before(now, 4);
    let sets = vec![
      set_at("c", 1, 5, 100.0, now),
      set_at("a", 15, 5, 90.0, now),
      set_at("b", 8, 5, 95.0, now),
      set_at("a", 15, 5, 90.0, now),
    ];

    // Act
    let buckets = aggregate_sessions(&sets, &[], &range);

    // Assert
    let ids: Vec<&str> = buckets.iter().map(|b| b.session_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(buckets[0].sets.len(), 2);
  }

  #[test]
  fn test_malformed_and_out_of_window_sets_are_dropped() {
    let now = Utc::now();
    let range = DateRange::weeks_before(now, 2);
    let sets = vec![
      set_at("a", 3, 0, 100.0, now),
      set_at("a", 3, 5, 0.0, now),
      set_at("old", 30, 5, 100.0, now),
      set_at("b", 2, 5, 100.0, now),
    ];

    let buckets = aggregate_sessions(&sets, &[], &range);

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].session_id, "b");
  }

  #[test]
  fn test_session_metadata_is_attached() {
    let now = Utc::now();
    let range = DateRange::weeks_before(now, 4);
    let sessions = vec![
      session("a", 10, SessionStatus::Completed, now),
      session("skip", 5, SessionStatus::Skipped, now),
    ];
    let sets = vec![set_at("a", 10, 5, 100.0, now), set_at("skip", 5, 5, 100.0, now)];

    let buckets = aggregate_sessions(&sets, &sessions, &range);

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].session_rpe, Some(7.5));
    assert_eq!(buckets[0].recovery_score, Some(6.0));
    assert_eq!(buckets[0].completed_at, sessions[0].completed_at);
  }

  #[test]
  fn test_no_sets_gives_no_buckets() {
    let now = Utc::now();
    let buckets = aggregate_sessions(&[], &[], &DateRange::weeks_before(now, 4));
    assert!(buckets.is_empty());
  }
}
