//! Congestion forecasting
//!
//! Forecasting strategies are expressed through the [`Forecaster`] trait
//! (fit/predict) rather than inheritance, so new strategies slot in without
//! touching the pipeline. Ships a repeat-last baseline, a seasonal-average
//! baseline, and a learned linear regression model.

mod baseline;
mod linear;

pub use baseline::{NaiveForecaster, SeasonalAverageForecaster};
pub use linear::LinearForecaster;

use crate::error::{FlowcastError, Result};
use crate::features::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A congestion forecast for one junction at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionForecast {
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub predicted_vehicle_count: f64,
    /// Optional (lower, upper) interval when the model can supply one
    pub prediction_interval: Option<(f64, f64)>,
}

/// Capability set for congestion forecasting models
pub trait Forecaster {
    /// Train on feature vectors. Must be called before `predict`.
    fn fit(&mut self, train: &[FeatureVector]) -> Result<()>;

    /// Produce one forecast per input row.
    ///
    /// Fails with [`FlowcastError::ModelNotFitted`] when called before `fit`.
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<CongestionForecast>>;
}

/// Controls which rows count toward reported accuracy.
///
/// Cold-start rows (rolling windows mostly unfilled) carry low-confidence
/// features; including them silently would skew reported accuracy, so the
/// threshold is an explicit first-class option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Minimum `min_fill_ratio` for a row to be evaluated, in [0, 1]
    pub cold_start_threshold: f64,
    /// Evaluate every row regardless of fill ratio
    pub include_cold_start: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            cold_start_threshold: 1.0,
            include_cold_start: false,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cold_start_threshold) {
            return Err(FlowcastError::ConfigError(format!(
                "cold_start_threshold must be in [0, 1], got {}",
                self.cold_start_threshold
            )));
        }
        Ok(())
    }
}

/// Accuracy metrics over an evaluation partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Rows that contributed to the metrics
    pub n_evaluated: usize,
    /// Rows excluded as cold-start
    pub n_skipped_cold_start: usize,
}

/// Evaluate a fitted model over a partition.
///
/// Rows below the cold-start threshold are skipped (and counted) unless
/// `include_cold_start` is set.
pub fn evaluate(
    model: &dyn Forecaster,
    rows: &[FeatureVector],
    config: &EvaluationConfig,
) -> Result<ForecastMetrics> {
    config.validate()?;
    let forecasts = model.predict(rows)?;

    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut n_evaluated = 0usize;
    let mut n_skipped = 0usize;

    for (row, forecast) in rows.iter().zip(&forecasts) {
        if !config.include_cold_start && row.min_fill_ratio() < config.cold_start_threshold {
            n_skipped += 1;
            continue;
        }
        let err = row.target - forecast.predicted_vehicle_count;
        abs_sum += err.abs();
        sq_sum += err * err;
        n_evaluated += 1;
    }

    if n_evaluated == 0 {
        return Err(FlowcastError::ConfigError(
            "no rows above the cold-start threshold to evaluate; lower the threshold \
             or set include_cold_start"
                .to_string(),
        ));
    }

    let n = n_evaluated as f64;
    Ok(ForecastMetrics {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        n_evaluated,
        n_skipped_cold_start: n_skipped,
    })
}
