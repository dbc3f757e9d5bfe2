//! Deload Scheduling
//!
//! Plans and tracks week-long load-reduction windows.
//!
//! Key principles:
//! - A window is active only while today is inside `[start, end]` and its
//!   status says active; a stale status never counts on its own
//! - At most one active window per user and plan, enforced in the insert
//!   transaction and by a partial unique index
//! - Periodic deloads never stack on top of an already scheduled one

use chrono::{Duration, NaiveDate};
use sqlx::{Row, SqlitePool};

use crate::models::{
    DeloadAdjustment, DeloadReason, DeloadStatus, DeloadType, DeloadWindow, ProgressionSettings,
};
use crate::store::{parse_column, StoreError};

/// Load reduction applied by scheduled deloads
pub const DELOAD_REDUCTION_PCT: f64 = 40.0;

pub const DELOAD_LENGTH_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
/// Planning (pure)
// ---------------------------------------------------------------------------

/// Build a window starting `weeks_from_now` weeks after `today`.
/// Dates past the calendar's end clamp to `NaiveDate::MAX`.
pub fn plan_deload(
    user_id: &str,
    plan_id: Option<&str>,
    reason: DeloadReason,
    weeks_from_now: u32,
    today: NaiveDate,
) -> DeloadWindow {
    let start_date = today
        .checked_add_signed(Duration::weeks(i64::from(weeks_from_now)))
        .unwrap_or(NaiveDate::MAX);
    let end_date = start_date
        .checked_add_signed(Duration::days(DELOAD_LENGTH_DAYS))
        .unwrap_or(NaiveDate::MAX);

    let deload_type = match reason {
        DeloadReason::FatigueDetected => DeloadType::VolumeReduction,
        _ => DeloadType::IntensityReduction,
    };
    let status = if weeks_from_now == 0 {
        DeloadStatus::Active
    } else {
        DeloadStatus::Scheduled
    };

    DeloadWindow {
        id: None,
        user_id: user_id.to_string(),
        plan_id: plan_id.map(str::to_string),
        scheduled_week: weeks_from_now.saturating_add(1),
        start_date,
        end_date,
        deload_type,
        reduction_pct: DELOAD_REDUCTION_PCT,
        status,
        reason,
    }
}

/// The window in effect today, derived from dates rather than trusted from status
pub fn active_window(windows: &[DeloadWindow], today: NaiveDate) -> Option<&DeloadWindow> {
    windows.iter().find(|w| w.is_active_on(today))
}

/// Volume and intensity cuts to apply while `active` is running
pub fn deload_adjustment(active: Option<&DeloadWindow>) -> DeloadAdjustment {
    match active {
        Some(w) => DeloadAdjustment {
            is_deload: true,
            volume_reduction_pct: w.reduction_pct,
            intensity_reduction_pct: w.reduction_pct * 0.5,
        },
        None => DeloadAdjustment::default(),
    }
}

/// Weeks out for the next periodic deload, or `None` when nothing should be scheduled
pub fn periodic_deload_weeks(
    settings: &ProgressionSettings,
    windows: &[DeloadWindow],
    today: NaiveDate,
) -> Option<u32> {
    if !settings.auto_deload_enabled {
        return None;
    }
    let already_planned = windows
        .iter()
        .any(|w| w.status == DeloadStatus::Scheduled && w.start_date > today);
    if already_planned {
        return None;
    }
    Some(settings.deload_frequency_weeks.saturating_sub(1))
}

/// Status a window should hold on `today`, if it differs from the stored one
fn due_status(window: &DeloadWindow, today: NaiveDate) -> Option<DeloadStatus> {
    match window.status {
        DeloadStatus::Scheduled if window.start_date <= today && today <= window.end_date => {
            Some(DeloadStatus::Active)
        }
        DeloadStatus::Scheduled if window.end_date < today => Some(DeloadStatus::Skipped),
        DeloadStatus::Active if window.end_date < today => Some(DeloadStatus::Completed),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
/// Persistence
// ---------------------------------------------------------------------------

const DELOAD_COLUMNS: &str = "id, user_id, plan_id, scheduled_week, start_date, end_date, \
     deload_type, reduction_pct, status, reason";

fn row_to_window(row: &sqlx::sqlite::SqliteRow) -> Result<DeloadWindow, StoreError> {
    Ok(DeloadWindow {
        id: Some(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        plan_id: row.try_get("plan_id")?,
        scheduled_week: row.try_get::<i64, _>("scheduled_week")? as u32,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        deload_type: parse_column(row, "deload_type")?,
        reduction_pct: row.try_get("reduction_pct")?,
        status: parse_column(row, "status")?,
        reason: parse_column(row, "reason")?,
    })
}

/// All windows for a user and plan, oldest first
pub async fn load_deload_windows(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: Option<&str>,
) -> Result<Vec<DeloadWindow>, StoreError> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {DELOAD_COLUMNS}
        FROM deload_windows
        WHERE user_id = ?1 AND COALESCE(plan_id, '') = COALESCE(?2, '')
        ORDER BY start_date ASC, id ASC
        "#
    ))
    .bind(user_id)
    .bind(plan_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_window).collect()
}

/// Persist a planned window.
///
/// Runs as one transaction: windows whose dates have passed are closed out,
/// then an active window that would overlap an existing active one is not
/// inserted and the existing window is returned instead.
pub async fn schedule_deload(
    pool: &SqlitePool,
    window: DeloadWindow,
    today: NaiveDate,
) -> Result<DeloadWindow, StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE deload_windows
        SET status = CASE status WHEN 'active' THEN 'completed' ELSE 'skipped' END
        WHERE user_id = ?1 AND COALESCE(plan_id, '') = COALESCE(?2, '')
          AND status IN ('active', 'scheduled') AND end_date < ?3
        "#,
    )
    .bind(&window.user_id)
    .bind(&window.plan_id)
    .bind(today)
    .execute(&mut *tx)
    .await?;

    if window.status == DeloadStatus::Active {
        let existing = sqlx::query(&format!(
            r#"
            SELECT {DELOAD_COLUMNS}
            FROM deload_windows
            WHERE user_id = ?1 AND COALESCE(plan_id, '') = COALESCE(?2, '')
              AND status = 'active'
            LIMIT 1
            "#
        ))
        .bind(&window.user_id)
        .bind(&window.plan_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            let current = row_to_window(&row)?;
            tx.commit().await?;
            tracing::info!(
                user_id = %window.user_id,
                start = %current.start_date,
                "Deload already active, not scheduling another"
            );
            return Ok(current);
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO deload_windows (
            user_id, plan_id, scheduled_week, start_date, end_date,
            deload_type, reduction_pct, status, reason
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&window.user_id)
    .bind(&window.plan_id)
    .bind(window.scheduled_week as i64)
    .bind(window.start_date)
    .bind(window.end_date)
    .bind(window.deload_type.as_str())
    .bind(window.reduction_pct)
    .bind(window.status.as_str())
    .bind(window.reason.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %window.user_id,
        start = %window.start_date,
        status = %window.status,
        reason = %window.reason,
        "Scheduled deload"
    );

    Ok(DeloadWindow {
        id: Some(result.last_insert_rowid()),
        ..window
    })
}

/// Move stored statuses in line with today's date
pub async fn refresh_deload_statuses(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: Option<&str>,
    today: NaiveDate,
) -> Result<Vec<DeloadWindow>, StoreError> {
    let mut windows = load_deload_windows(pool, user_id, plan_id).await?;

    // Close out finished windows before activating a new one
    windows.sort_by_key(|w| (w.status == DeloadStatus::Scheduled, w.start_date));
    for window in windows.iter_mut() {
        let (Some(id), Some(next)) = (window.id, due_status(window, today)) else {
            continue;
        };
        let updated = sqlx::query(
            "UPDATE deload_windows SET status = ?1 WHERE id = ?2 AND status = ?3",
        )
        .bind(next.as_str())
        .bind(id)
        .bind(window.status.as_str())
        .execute(pool)
        .await;

        match updated {
            Ok(_) => window.status = next,
            // Another active window holds the slot; leave this one scheduled
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::warn!(id, "Deload window overlaps an active one, left scheduled");
            }
            Err(e) => return Err(e.into()),
        }
    }

    windows.sort_by_key(|w| (w.start_date, w.id));
    Ok(windows)
}

pub async fn get_active_deload(
    pool: &SqlitePool,
    user_id: &str,
    plan_id: Option<&str>,
    today: NaiveDate,
) -> Result<Option<DeloadWindow>, StoreError> {
    let windows = refresh_deload_statuses(pool, user_id, plan_id, today).await?;
    Ok(active_window(&windows, today).cloned())
}

/// Schedule the next periodic deload when the user's settings call for one
pub async fn auto_schedule_periodic_deload(
    pool: &SqlitePool,
    settings: &ProgressionSettings,
    plan_id: Option<&str>,
    today: NaiveDate,
) -> Result<Option<DeloadWindow>, StoreError> {
    let windows = load_deload_windows(pool, &settings.user_id, plan_id).await?;
    let Some(weeks) = periodic_deload_weeks(settings, &windows, today) else {
        return Ok(None);
    };

    let window = plan_deload(
        &settings.user_id,
        plan_id,
        DeloadReason::PlannedPeriodization,
        weeks,
        today,
    );
    schedule_deload(pool, window, today).await.map(Some)
}

pub async fn update_deload_status(
    pool: &SqlitePool,
    id: i64,
    next: DeloadStatus,
) -> Result<DeloadWindow, StoreError> {
    let row = sqlx::query(&format!("SELECT {DELOAD_COLUMNS} FROM deload_windows WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("deload window {}", id)))?;
    let window = row_to_window(&row)?;

    if !window.status.can_transition_to(next) {
        return Err(StoreError::InvalidTransition(format!(
            "deload window {} cannot go from {} to {}",
            id, window.status, next
        )));
    }

    sqlx::query("UPDATE deload_windows SET status = ?1 WHERE id = ?2")
        .bind(next.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(DeloadWindow {
        status: next,
        ..window
    })
}
