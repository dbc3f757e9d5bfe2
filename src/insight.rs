//! Insight providers
//!
//! One capability, two implementations: the remote analysis service and the
//! local fallback analyzer. `ResilientInsightProvider` picks between them
//! behind a circuit breaker, so callers never see remote failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::fallback::{analyze_locally, detect_local_plateau, suggest_locally, summarize_by_exercise};
use crate::models::{
  AnalysisReport, DateRange, ExerciseRef, InsightSource, PlateauReport, ProgressionSettings,
  RecommendationReport,
};
use crate::remote::RemoteError;
use crate::store::{LogStore, SettingsStore, StoreError};

/// ---------------------------------------------------------------------------
/// Provider Trait
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum InsightError {
  #[error(transparent)]
  Remote(#[from] RemoteError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

#[async_trait]
pub trait InsightProvider: Send + Sync {
  /// Per-exercise status over the last `lookback_days`
  async fn analyze(&self, user_id: &str, lookback_days: u32) -> Result<AnalysisReport, InsightError>;

  async fn detect_plateaus(&self, user_id: &str, plateau_weeks: u32) -> Result<PlateauReport, InsightError>;

  async fn recommend(&self, user_id: &str) -> Result<RecommendationReport, InsightError>;
}

/// ---------------------------------------------------------------------------
/// Circuit Breaker
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
  Closed,
  Open,
  HalfOpen,
}

impl CircuitState {
  const fn from_u32(value: u32) -> Self {
    match value {
      0 => Self::Closed,
      1 => Self::Open,
      _ => Self::HalfOpen,
    }
  }

  const fn to_u32(self) -> u32 {
    match self {
      Self::Closed => 0,
      Self::Open => 1,
      Self::HalfOpen => 2,
    }
  }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
  /// Consecutive failures before the circuit opens
  pub failure_threshold: u32,
  /// Time spent open before a probe is let through
  pub recovery_timeout: Duration,
  /// Successful probes needed to close again
  pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
  fn default() -> Self {
    Self {
      failure_threshold: 3,
      recovery_timeout: Duration::from_secs(30),
      success_threshold: 1,
    }
  }
}

/// Lock-free breaker guarding the remote service.
///
/// Closed passes everything and counts consecutive failures. Open rejects
/// until the recovery timeout elapses, then moves to half-open where probes
/// pass; one failed probe reopens it.
pub struct CircuitBreaker {
  state: AtomicU32,
  failure_count: AtomicU32,
  success_count: AtomicU32,
  /// Millis since `started` at which the circuit last opened
  opened_at: AtomicU64,
  config: CircuitBreakerConfig,
  started: Instant,
}

impl CircuitBreaker {
  pub fn new(config: CircuitBreakerConfig) -> Self {
    Self {
      state: AtomicU32::new(CircuitState::Closed.to_u32()),
      failure_count: AtomicU32::new(0),
      success_count: AtomicU32::new(0),
      opened_at: AtomicU64::new(0),
      config,
      started: Instant::now(),
    }
  }

  pub fn state(&self) -> CircuitState {
    CircuitState::from_u32(self.state.load(Ordering::SeqCst))
  }

  pub fn is_allowed(&self) -> bool {
    match self.state() {
      CircuitState::Closed | CircuitState::HalfOpen => true,
      CircuitState::Open => self.try_half_open(),
    }
  }

  fn elapsed_millis(&self) -> u64 {
    u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
  }

  fn try_half_open(&self) -> bool {
    let recovery_ms = u64::try_from(self.config.recovery_timeout.as_millis()).unwrap_or(u64::MAX);
    let since_open = self.elapsed_millis().saturating_sub(self.opened_at.load(Ordering::SeqCst));
    if since_open < recovery_ms {
      return false;
    }

    let moved = self
      .state
      .compare_exchange(
        CircuitState::Open.to_u32(),
        CircuitState::HalfOpen.to_u32(),
        Ordering::SeqCst,
        Ordering::SeqCst,
      )
      .is_ok();
    if moved {
      info!("Insight circuit half-open, probing remote service");
    }
    // Another caller may have moved it first; half-open still admits probes
    self.state() != CircuitState::Open
  }

  fn open(&self) {
    self.state.store(CircuitState::Open.to_u32(), Ordering::SeqCst);
    self.opened_at.store(self.elapsed_millis(), Ordering::SeqCst);
    self.success_count.store(0, Ordering::SeqCst);
  }

  pub fn record_success(&self) {
    match self.state() {
      CircuitState::Closed => self.failure_count.store(0, Ordering::SeqCst),
      CircuitState::HalfOpen => {
        let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
        if successes >= self.config.success_threshold {
          self.state.store(CircuitState::Closed.to_u32(), Ordering::SeqCst);
          self.failure_count.store(0, Ordering::SeqCst);
          self.success_count.store(0, Ordering::SeqCst);
          info!("Insight circuit closed, remote service recovered");
        }
      }
      CircuitState::Open => {}
    }
  }

  pub fn record_failure(&self) {
    match self.state() {
      CircuitState::Closed => {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.config.failure_threshold {
          self.open();
          warn!(
            failures,
            recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
            "Insight circuit opened, using local analysis"
          );
        }
      }
      CircuitState::HalfOpen => {
        self.open();
        warn!("Insight circuit re-opened, probe failed");
      }
      CircuitState::Open => self.opened_at.store(self.elapsed_millis(), Ordering::SeqCst),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Local Provider
/// ---------------------------------------------------------------------------

/// Fallback analysis over locally stored logs. No network access.
pub struct LocalInsightProvider {
  logs: Arc<dyn LogStore>,
  settings: Arc<dyn SettingsStore>,
  /// History window used by `recommend`
  default_lookback_days: u32,
}

impl LocalInsightProvider {
  pub fn new(logs: Arc<dyn LogStore>, settings: Arc<dyn SettingsStore>, default_lookback_days: u32) -> Self {
    Self {
      logs,
      settings,
      default_lookback_days,
    }
  }

  /// Stored settings, or defaults when missing or unreadable
  async fn settings_for(&self, user_id: &str) -> ProgressionSettings {
    match self.settings.get_settings(user_id).await {
      Ok(Some(settings)) => settings,
      Ok(None) => ProgressionSettings::for_user(user_id),
      Err(e) => {
        warn!(user_id, error = %e, "Failed to read settings, using defaults");
        ProgressionSettings::for_user(user_id)
      }
    }
  }

  /// Tracked exercises keyed by id, for display names
  async fn exercise_names(&self, user_id: &str) -> Result<HashMap<String, String>, StoreError> {
    Ok(
      self
        .logs
        .tracked_exercises(user_id, None)
        .await?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect(),
    )
  }
}

#[async_trait]
impl InsightProvider for LocalInsightProvider {
  async fn analyze(&self, user_id: &str, lookback_days: u32) -> Result<AnalysisReport, InsightError> {
    let range = DateRange::days_before(Utc::now(), lookback_days);
    let sets = self.logs.query_user_sets(user_id, &range).await?;
    let names = self.exercise_names(user_id).await?;
    let settings = self.settings_for(user_id).await;

    let insights = summarize_by_exercise(&sets)
      .iter()
      .map(|(id, sessions)| {
        let name = names.get(id).map(String::as_str).unwrap_or(id.as_str());
        analyze_locally(name, sessions, settings.mode)
      })
      .collect();

    Ok(AnalysisReport {
      source: InsightSource::Local,
      insights,
      settings: Some(settings),
    })
  }

  async fn detect_plateaus(&self, user_id: &str, plateau_weeks: u32) -> Result<PlateauReport, InsightError> {
    let now = Utc::now();
    let range = DateRange::weeks_before(now, plateau_weeks);
    let sets = self.logs.query_user_sets(user_id, &range).await?;
    let names = self.exercise_names(user_id).await?;

    let plateaus = summarize_by_exercise(&sets)
      .iter()
      .filter_map(|(id, sessions)| {
        let name = names.get(id).map(String::as_str).unwrap_or(id.as_str());
        detect_local_plateau(name, sessions, plateau_weeks, now)
      })
      .collect();

    Ok(PlateauReport {
      source: InsightSource::Local,
      plateaus,
    })
  }

  async fn recommend(&self, user_id: &str) -> Result<RecommendationReport, InsightError> {
    let range = DateRange::days_before(Utc::now(), self.default_lookback_days);
    let sets = self.logs.query_user_sets(user_id, &range).await?;
    let names = self.exercise_names(user_id).await?;
    let mode = self.settings_for(user_id).await.mode;

    let recommendations = summarize_by_exercise(&sets)
      .iter()
      .map(|(id, sessions)| {
        let exercise = ExerciseRef {
          id: id.clone(),
          name: names.get(id).cloned().unwrap_or_else(|| id.clone()),
        };
        let insight = analyze_locally(&exercise.name, sessions, mode);
        suggest_locally(&exercise, &insight, mode)
      })
      .collect();

    Ok(RecommendationReport {
      source: InsightSource::Local,
      recommendations,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Resilient Provider
/// ---------------------------------------------------------------------------

/// Remote when available, local otherwise. Remote failures are logged and
/// absorbed; only local failures reach the caller.
pub struct ResilientInsightProvider {
  remote: Option<Arc<dyn InsightProvider>>,
  local: Arc<dyn InsightProvider>,
  breaker: CircuitBreaker,
}

impl ResilientInsightProvider {
  pub fn new(
    remote: Option<Arc<dyn InsightProvider>>,
    local: Arc<dyn InsightProvider>,
    breaker: CircuitBreaker,
  ) -> Self {
    Self { remote, local, breaker }
  }

  pub fn breaker(&self) -> &CircuitBreaker {
    &self.breaker
  }

  fn remote_if_allowed(&self) -> Option<&Arc<dyn InsightProvider>> {
    self.remote.as_ref().filter(|_| self.breaker.is_allowed())
  }

  /// Feed the outcome to the breaker; `None` means fall back
  fn settle<T>(&self, operation: &str, result: Result<T, InsightError>) -> Option<T> {
    match result {
      Ok(value) => {
        self.breaker.record_success();
        Some(value)
      }
      Err(e) => {
        self.breaker.record_failure();
        warn!(operation, error = %e, "Remote insight call failed, using local analysis");
        None
      }
    }
  }
}

#[async_trait]
impl InsightProvider for ResilientInsightProvider {
  async fn analyze(&self, user_id: &str, lookback_days: u32) -> Result<AnalysisReport, InsightError> {
    if let Some(remote) = self.remote_if_allowed() {
      if let Some(report) = self.settle("analyze", remote.analyze(user_id, lookback_days).await) {
        return Ok(report);
      }
    }
    self.local.analyze(user_id, lookback_days).await
  }

  async fn detect_plateaus(&self, user_id: &str, plateau_weeks: u32) -> Result<PlateauReport, InsightError> {
    if let Some(remote) = self.remote_if_allowed() {
      if let Some(report) = self.settle("detect_plateaus", remote.detect_plateaus(user_id, plateau_weeks).await) {
        return Ok(report);
      }
    }
    self.local.detect_plateaus(user_id, plateau_weeks).await
  }

  async fn recommend(&self, user_id: &str) -> Result<RecommendationReport, InsightError> {
    if let Some(remote) = self.remote_if_allowed() {
      if let Some(report) = self.settle("recommend", remote.recommend(user_id).await) {
        return Ok(report);
      }
    }
    self.local.recommend(user_id).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
