use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::{load_settings, CommandError};
use crate::db::AppState;
use crate::deload::{
  active_window, auto_schedule_periodic_deload, deload_adjustment, plan_deload,
  refresh_deload_statuses, schedule_deload, update_deload_status,
};
use crate::models::{DeloadAdjustment, DeloadReason, DeloadStatus, DeloadWindow};

/// Furthest ahead a deload can be requested
pub const MAX_DELOAD_LEAD_WEEKS: u32 = 52;

/// Deload state for a user and plan as of today
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeloadOverview {
  pub today: NaiveDate,
  pub active: Option<DeloadWindow>,
  pub adjustment: DeloadAdjustment,
  pub windows: Vec<DeloadWindow>,
}

/// ---------------------------------------------------------------------------
/// Deload Commands
/// ---------------------------------------------------------------------------

/// Schedule a deload `weeks_from_now` weeks out; zero starts it today
pub async fn request_deload(
  state: &AppState,
  user_id: &str,
  plan_id: Option<&str>,
  reason: DeloadReason,
  weeks_from_now: u32,
) -> Result<DeloadWindow, CommandError> {
  if weeks_from_now > MAX_DELOAD_LEAD_WEEKS {
    return Err(CommandError::InvalidInput(format!(
      "a deload can be scheduled at most {} weeks out, got {}",
      MAX_DELOAD_LEAD_WEEKS, weeks_from_now
    )));
  }

  let today = Utc::now().date_naive();
  let window = plan_deload(user_id, plan_id, reason, weeks_from_now, today);
  Ok(schedule_deload(&state.db, window, today).await?)
}

pub async fn get_deload_overview(
  state: &AppState,
  user_id: &str,
  plan_id: Option<&str>,
) -> Result<DeloadOverview, CommandError> {
  let today = Utc::now().date_naive();
  let windows = refresh_deload_statuses(&state.db, user_id, plan_id, today).await?;
  let active = active_window(&windows, today).cloned();

  Ok(DeloadOverview {
    today,
    adjustment: deload_adjustment(active.as_ref()),
    active,
    windows,
  })
}

/// Schedule the next periodic deload if the user's settings call for one
pub async fn auto_schedule_deload(
  state: &AppState,
  user_id: &str,
  plan_id: Option<&str>,
) -> Result<Option<DeloadWindow>, CommandError> {
  let settings = load_settings(state, user_id).await;
  let today = Utc::now().date_naive();
  Ok(auto_schedule_periodic_deload(&state.db, &settings, plan_id, today).await?)
}

pub async fn set_deload_status(
  state: &AppState,
  deload_id: i64,
  status: DeloadStatus,
) -> Result<DeloadWindow, CommandError> {
  Ok(update_deload_status(&state.db, deload_id, status).await?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::DeloadType;
  use crate::test_utils::{setup_test_state, teardown_test_db};

  #[tokio::test]
  async fn test_deload_this_week_shows_in_overview() {
    // Arrange
    let state = setup_test_state().await;

    // Act
    let window = request_deload(&state, "u1", None, DeloadReason::UserRequested, 0)
      .await
      .unwrap();
    let overview = get_deload_overview(&state, "u1", None).await.unwrap();

    // Assert
    assert_eq!(window.deload_type, DeloadType::IntensityReduction);
    assert_eq!(overview.active.map(|w| w.id), Some(window.id));
    assert!(overview.adjustment.is_deload);
    assert_eq!(overview.adjustment.volume_reduction_pct, 40.0);
    assert_eq!(overview.adjustment.intensity_reduction_pct, 20.0);

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_deload_beyond_a_year_is_rejected() {
    let state = setup_test_state().await;

    let far = request_deload(&state, "u1", None, DeloadReason::UserRequested, 100_000_000).await;
    let limit = request_deload(&state, "u1", None, DeloadReason::UserRequested, MAX_DELOAD_LEAD_WEEKS).await;

    assert!(matches!(far, Err(CommandError::InvalidInput(_))));
    assert_eq!(limit.unwrap().scheduled_week, MAX_DELOAD_LEAD_WEEKS + 1);

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_no_deload_means_no_adjustment() {
    let state = setup_test_state().await;

    let overview = get_deload_overview(&state, "u1", None).await.unwrap();

    assert!(overview.active.is_none());
    assert_eq!(overview.adjustment, DeloadAdjustment::default());
    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_auto_schedule_does_not_stack() {
    let state = setup_test_state().await;

    let first = auto_schedule_deload(&state, "u1", None).await.unwrap();
    let second = auto_schedule_deload(&state, "u1", None).await.unwrap();

    // Default frequency is four weeks, so the deload lands three weeks out
    let first = first.expect("Expected a scheduled deload");
    assert_eq!(first.status, DeloadStatus::Scheduled);
    assert_eq!(first.scheduled_week, 4);
    assert!(second.is_none());

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_scheduled_deload_can_be_skipped() {
    let state = setup_test_state().await;
    let window = request_deload(&state, "u1", None, DeloadReason::UserRequested, 2)
      .await
      .unwrap();

    let skipped = set_deload_status(&state, window.id.unwrap(), DeloadStatus::Skipped)
      .await
      .unwrap();
    let revived = set_deload_status(&state, window.id.unwrap(), DeloadStatus::Active).await;

    assert_eq!(skipped.status, DeloadStatus::Skipped);
    assert!(revived.is_err());

    teardown_test_db(state.db).await;
  }
}
