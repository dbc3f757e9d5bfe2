//! Async service facade over the engine.
//!
//! Each command takes the shared `AppState`, reads what it needs through the
//! store traits, runs the pure engine functions and appends results back.

pub mod analysis;
pub mod deload;
pub mod plateau;
pub mod progression;

use serde::Serialize;
use tracing::warn;

use crate::db::AppState;
use crate::insight::InsightError;
use crate::models::ProgressionSettings;
use crate::store::{SettingsStore, StoreError};

#[derive(Debug, thiserror::Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum CommandError {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Insight(#[from] InsightError),

  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

/// Settings snapshot for one command run. Missing or unreadable settings
/// fall back to defaults.
pub(crate) async fn load_settings(state: &AppState, user_id: &str) -> ProgressionSettings {
  match state.store.get_settings(user_id).await {
    Ok(Some(settings)) => settings,
    Ok(None) => ProgressionSettings::for_user(user_id),
    Err(e) => {
      warn!(user_id, error = %e, "Failed to load progression settings, using defaults");
      ProgressionSettings::for_user(user_id)
    }
  }
}
