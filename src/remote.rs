//! Remote progression analysis service
//!
//! Thin JSON-over-HTTP client for a deployed analysis service. Every failure
//! is reported as a `RemoteError`; deciding what to do about it is left to
//! the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::insight::{InsightError, InsightProvider};
use crate::models::{
  AnalysisReport, ExerciseInsight, InsightSource, PlateauAlert, PlateauReport,
  ProgressionSuggestion, RecommendationReport,
};

/// ---------------------------------------------------------------------------
/// Endpoints
/// ---------------------------------------------------------------------------

// Relative to the base URL, so a base path such as `/v1/` is kept
const ANALYZE_PATH: &str = "api/progression/analyze";
const PLATEAUS_PATH: &str = "api/progression/detect-plateaus";
const RECOMMENDATIONS_PATH: &str = "api/progression/recommendations";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum RemoteError {
  #[error("Request failed: {0}")]
  Request(String),

  #[error("Route unavailable: {0}")]
  RouteUnavailable(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Wire Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
  user_id: &'a str,
  lookback_days: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlateauRequest<'a> {
  user_id: &'a str,
  plateau_weeks: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest<'a> {
  user_id: &'a str,
}

/// Every response carries `success`; failures add `error`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
  #[serde(default = "default_success")]
  success: bool,
  error: Option<String>,
  #[serde(flatten)]
  body: T,
}

fn default_success() -> bool {
  true
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
  #[serde(default)]
  insights: Vec<ExerciseInsight>,
}

#[derive(Debug, Deserialize)]
struct PlateauBody {
  #[serde(default)]
  plateaus: Vec<PlateauAlert>,
}

#[derive(Debug, Deserialize)]
struct RecommendBody {
  #[serde(default)]
  recommendations: Vec<ProgressionSuggestion>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct RemoteInsightProvider {
  client: Client,
  base_url: Url,
}

impl RemoteInsightProvider {
  /// A base URL without a trailing slash is treated as a directory
  pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, RemoteError> {
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| RemoteError::Request(e.to_string()))?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// POST a JSON body and decode the enveloped response
  async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, RemoteError>
  where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
  {
    let url = self
      .base_url
      .join(path)
      .map_err(|e| RemoteError::Request(format!("Invalid URL for {}: {}", path, e)))?;

    let response = self
      .client
      .post(url)
      .json(body)
      .send()
      .await
      .map_err(|e| RemoteError::Request(e.to_string()))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| RemoteError::Request(e.to_string()))?;

    if status == StatusCode::NOT_FOUND {
      return Err(RemoteError::RouteUnavailable(path.to_string()));
    }

    if !status.is_success() {
      if let Ok(error_body) = serde_json::from_str::<ErrorBody>(&text) {
        return Err(RemoteError::Api(error_body.error));
      }
      return Err(RemoteError::Api(format!("HTTP {}: {}", status, text)));
    }

    let envelope: Envelope<R> =
      serde_json::from_str(&text).map_err(|e| RemoteError::Parse(e.to_string()))?;

    if !envelope.success {
      return Err(RemoteError::Api(
        envelope.error.unwrap_or_else(|| "Request unsuccessful".to_string()),
      ));
    }

    Ok(envelope.body)
  }
}

#[async_trait]
impl InsightProvider for RemoteInsightProvider {
  async fn analyze(&self, user_id: &str, lookback_days: u32) -> Result<AnalysisReport, InsightError> {
    let body: AnalyzeBody = self
      .post(ANALYZE_PATH, &AnalyzeRequest { user_id, lookback_days })
      .await?;

    Ok(AnalysisReport {
      source: InsightSource::Remote,
      insights: body.insights,
      settings: None,
    })
  }

  async fn detect_plateaus(&self, user_id: &str, plateau_weeks: u32) -> Result<PlateauReport, InsightError> {
    let body: PlateauBody = self
      .post(PLATEAUS_PATH, &PlateauRequest { user_id, plateau_weeks })
      .await?;

    Ok(PlateauReport {
      source: InsightSource::Remote,
      plateaus: body.plateaus,
    })
  }

  async fn recommend(&self, user_id: &str) -> Result<RecommendationReport, InsightError> {
    let body: RecommendBody = self
      .post(RECOMMENDATIONS_PATH, &RecommendRequest { user_id })
      .await?;

    Ok(RecommendationReport {
      source: InsightSource::Remote,
      recommendations: body.recommendations,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
