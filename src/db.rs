use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::insight::{CircuitBreaker, InsightProvider, LocalInsightProvider, ResilientInsightProvider};
use crate::remote::RemoteInsightProvider;
use crate::store::{SqliteStore, StoreError};

pub type DbPool = SqlitePool;

/// Shared engine state: pool, store adapter and the insight provider
pub struct AppState {
  pub db: DbPool,
  pub store: Arc<SqliteStore>,
  pub insights: Arc<dyn InsightProvider>,
  pub config: EngineConfig,
}

impl AppState {
  /// Wire the store and providers around an existing pool.
  /// A remote URL that cannot be turned into a client leaves the engine local-only.
  pub fn new(db: DbPool, config: EngineConfig) -> Self {
    let store = Arc::new(SqliteStore::new(db.clone()));
    let local: Arc<dyn InsightProvider> = Arc::new(LocalInsightProvider::new(
      store.clone(),
      store.clone(),
      config.lookback_days,
    ));

    let remote = config.remote_url.as_ref().and_then(|url| {
      match RemoteInsightProvider::new(url.clone(), config.remote_timeout) {
        Ok(provider) => {
          info!(remote_url = %url, "Remote analysis service configured");
          Some(Arc::new(provider) as Arc<dyn InsightProvider>)
        }
        Err(e) => {
          warn!(error = %e, "Failed to build remote client, using local analysis only");
          None
        }
      }
    });

    let insights = Arc::new(ResilientInsightProvider::new(
      remote,
      local,
      CircuitBreaker::new(config.breaker_config()),
    ));

    Self {
      db,
      store,
      insights,
      config,
    }
  }

  /// Open the configured database and wire everything up
  pub async fn from_config(config: EngineConfig) -> Result<Self, StoreError> {
    let pool = initialize_db(&config.database_url).await?;
    Ok(Self::new(pool, config))
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool, StoreError> {
  info!(database_url, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .map_err(|e| StoreError::Database(format!("Migration failed: {}", e)))?;

  info!("Database initialized successfully");

  Ok(pool)
}
