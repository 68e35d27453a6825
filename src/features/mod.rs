//! Feature engineering
//!
//! Combines calendar features and causal rolling-window statistics into one
//! feature vector per observation. Feature vectors are derived values:
//! whenever raw data changes they are recomputed from scratch, never
//! incrementally mutated.

mod calendar;
mod rolling;

pub use calendar::{CalendarFeatures, TemporalFeaturizer};
pub use rolling::{RollingAggregator, RollingConfig, WindowStats, WindowUnit};

use crate::observations::CleanedSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engineered features for one observation, including its target value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub calendar: CalendarFeatures,
    /// One entry per configured window, in configuration order
    pub windows: Vec<WindowStats>,
    /// Vehicle count at `timestamp`
    pub target: f64,
}

impl FeatureVector {
    /// Smallest fill ratio across all windows. Rows where this falls below
    /// the cold-start threshold are excluded from evaluation by default.
    pub fn min_fill_ratio(&self) -> f64 {
        self.windows
            .iter()
            .map(|w| w.fill_ratio)
            .fold(f64::INFINITY, f64::min)
    }

    /// Numeric feature row for model consumption. Layout: cyclical calendar
    /// encodings, weekend flag, then (mean, std, min, max, fill_ratio) per
    /// window. The target is not included.
    pub fn numeric_row(&self) -> Vec<f64> {
        let mut row = vec![
            self.calendar.hour_sin,
            self.calendar.hour_cos,
            self.calendar.dow_sin,
            self.calendar.dow_cos,
            if self.calendar.is_weekend { 1.0 } else { 0.0 },
        ];
        for w in &self.windows {
            row.extend_from_slice(&[w.mean, w.std, w.min, w.max, w.fill_ratio]);
        }
        row
    }
}

/// Build feature vectors for one cleaned series, in timestamp order
pub fn build_features(series: &CleanedSeries, aggregator: &RollingAggregator) -> Vec<FeatureVector> {
    let featurizer = TemporalFeaturizer;
    let rolling = aggregator.compute(series);

    series
        .observations()
        .iter()
        .zip(rolling)
        .map(|(obs, windows)| FeatureVector {
            location_id: obs.location_id.clone(),
            timestamp: obs.timestamp,
            calendar: featurizer.features(obs.timestamp),
            windows,
            target: obs.vehicle_count as f64,
        })
        .collect()
}
