//! Time-series trend classification

use crate::models::Trend;

/// Fewer points than this are not enough to call a direction
pub const MIN_TREND_POINTS: usize = 3;

/// Coefficient of variation (%) above which a series is volatile
pub const VOLATILITY_CV_PCT: f64 = 20.0;

/// Slope magnitude (units per sample) below which a series is flat
pub const STABLE_SLOPE: f64 = 0.1;

/// Ordinary least-squares slope of `values` against their sample index
pub fn ols_slope(values: &[f64]) -> f64 {
  let n = values.len();
  if n < 2 {
    return 0.0;
  }

  let n_f = n as f64;
  let mean_x = (n_f - 1.0) / 2.0;
  let mean_y = values.iter().sum::<f64>() / n_f;

  let (num, den) = values
    .iter()
    .enumerate()
    .fold((0.0, 0.0), |(num, den), (i, y)| {
      let dx = i as f64 - mean_x;
      (num + dx * (y - mean_y), den + dx * dx)
    });

  if den.abs() < f64::EPSILON {
    0.0
  } else {
    num / den
  }
}

/// Population coefficient of variation in percent.
///
/// A zero mean gives 0 for an all-zero series and infinity otherwise.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let n = values.len() as f64;
  let mean = values.iter().sum::<f64>() / n;
  let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
  let std_dev = variance.sqrt();

  if mean.abs() < f64::EPSILON {
    if std_dev < f64::EPSILON {
      0.0
    } else {
      f64::INFINITY
    }
  } else {
    std_dev / mean.abs() * 100.0
  }
}

/// Reduce an ordered series to a single direction.
///
/// Volatility wins over slope; short series are stable.
pub fn classify_trend(values: &[f64]) -> Trend {
  if values.len() < MIN_TREND_POINTS {
    return Trend::Stable;
  }

  if coefficient_of_variation(values) > VOLATILITY_CV_PCT {
    return Trend::Volatile;
  }

  let slope = ols_slope(values);
  if slope.abs() < STABLE_SLOPE {
    Trend::Stable
  } else if slope > 0.0 {
    Trend::Increasing
  } else {
    Trend::Decreasing
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_constant_series_is_stable() {
    for value in [0.0, 1.0, 42.0, 2500.0] {
      assert_eq!(classify_trend(&[value; 6]), Trend::Stable, "value {}", value);
    }
  }

  #[test]
  fn test_short_series_defaults_to_stable() {
    assert_eq!(classify_trend(&[]), Trend::Stable);
    assert_eq!(classify_trend(&[10.0, 100.0]), Trend::Stable);
  }

  #[test]
  fn test_rising_and_falling_series() {
    assert_eq!(classify_trend(&[80.0, 82.5, 85.0, 87.5]), Trend::Increasing);
    assert_eq!(classify_trend(&[87.5, 85.0, 82.5, 80.0]), Trend::Decreasing);
  }

  #[test]
  fn test_high_cv_is_volatile_regardless_of_slope() {
    // Rising but noisy
    assert_eq!(classify_trend(&[10.0, 30.0, 12.0, 40.0]), Trend::Volatile);
    // Falling but noisy
    assert_eq!(classify_trend(&[40.0, 12.0, 30.0, 10.0]), Trend::Volatile);
  }

  #[test]
  fn test_small_slope_is_stable() {
    // slope = 0.05 per sample
    assert_eq!(classify_trend(&[100.0, 100.05, 100.1, 100.15]), Trend::Stable);
  }

  #[test]
  fn test_slope_uses_sample_index() {
    assert!((ols_slope(&[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-9);
    assert!((ols_slope(&[100.0, 100.0, 101.0, 99.0]) + 0.2).abs() < 1e-9);
    assert_eq!(ols_slope(&[5.0]), 0.0);
  }

  #[test]
  fn test_cv_zero_mean() {
    assert_eq!(coefficient_of_variation(&[0.0, 0.0, 0.0]), 0.0);
    assert!(coefficient_of_variation(&[-1.0, 0.0, 1.0]).is_infinite());
  }
}
