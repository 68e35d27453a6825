//! Causal rolling-window statistics
//!
//! Every statistic for the observation at index i is computed only from
//! observations strictly before i. The current observation never enters its
//! own window, so the target value cannot leak into the features that
//! predict it.

use crate::error::{FlowcastError, Result};
use crate::observations::CleanedSeries;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// How window sizes are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowUnit {
    /// Window size counts prior observations
    Count,
    /// Window size is a time span in seconds before the current timestamp
    Duration,
}

/// Rolling-window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Window sizes, in observations or seconds depending on `window_unit`
    pub window_sizes: Vec<usize>,
    pub window_unit: WindowUnit,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            window_sizes: vec![3, 6, 12],
            window_unit: WindowUnit::Count,
        }
    }
}

/// Statistics over one lookback window at one observation.
///
/// `fill_ratio` reports how much of the requested window was actually
/// available, so downstream models and tests can discount cold-start rows
/// instead of treating them as equal-confidence. An empty window yields
/// zeroed statistics with `fill_ratio` 0.0, keeping feature matrices finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Window size this entry was computed for
    pub window: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Fraction of the window actually filled, in [0, 1]
    pub fill_ratio: f64,
}

/// Computes causal rolling statistics over a cleaned series
#[derive(Debug, Clone)]
pub struct RollingAggregator {
    config: RollingConfig,
}

impl RollingAggregator {
    /// Create an aggregator, validating the window configuration up front
    pub fn new(config: RollingConfig) -> Result<Self> {
        if config.window_sizes.is_empty() {
            return Err(FlowcastError::ConfigError(
                "at least one window size is required".to_string(),
            ));
        }
        if config.window_sizes.iter().any(|&w| w == 0) {
            return Err(FlowcastError::ConfigError(
                "window sizes must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RollingConfig {
        &self.config
    }

    /// Compute per-observation window statistics for a series.
    ///
    /// Returns one `Vec<WindowStats>` per observation, one entry per
    /// configured window, in configuration order.
    pub fn compute(&self, series: &CleanedSeries) -> Vec<Vec<WindowStats>> {
        let obs = series.observations();
        let mut result = Vec::with_capacity(obs.len());

        for i in 0..obs.len() {
            let mut per_window = Vec::with_capacity(self.config.window_sizes.len());
            for &window in &self.config.window_sizes {
                let stats = match self.config.window_unit {
                    WindowUnit::Count => {
                        let start = i.saturating_sub(window);
                        let values: Vec<f64> = obs[start..i]
                            .iter()
                            .map(|o| o.vehicle_count as f64)
                            .collect();
                        let fill_ratio = values.len() as f64 / window as f64;
                        summarize(window, &values, fill_ratio)
                    }
                    WindowUnit::Duration => {
                        let span = Duration::seconds(window as i64);
                        let cutoff = obs[i].timestamp - span;
                        let values: Vec<f64> = obs[..i]
                            .iter()
                            .filter(|o| o.timestamp >= cutoff)
                            .map(|o| o.vehicle_count as f64)
                            .collect();
                        // Coverage of the span by available history, not an
                        // observation count: irregular sampling makes the
                        // expected count undefined.
                        let fill_ratio = if i == 0 {
                            0.0
                        } else {
                            let elapsed = (obs[i].timestamp - obs[0].timestamp)
                                .num_seconds()
                                .max(0) as f64;
                            (elapsed / span.num_seconds() as f64).min(1.0)
                        };
                        summarize(window, &values, fill_ratio)
                    }
                };
                per_window.push(stats);
            }
            result.push(per_window);
        }

        result
    }
}

fn summarize(window: usize, values: &[f64], fill_ratio: f64) -> WindowStats {
    if values.is_empty() {
        return WindowStats {
            window,
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
            fill_ratio: 0.0,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    WindowStats {
        window,
        mean,
        std: variance.sqrt(),
        min,
        max,
        fill_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observations::{ObservationStore, RawRow};

    fn series(rows: &[(&str, &str)]) -> CleanedSeries {
        let raw: Vec<RawRow> = rows
            .iter()
            .map(|(ts, count)| RawRow::new("J1", ts, count))
            .collect();
        let (store, report) = ObservationStore::ingest(&raw);
        assert_eq!(report.rows_dropped(), 0);
        store.get("J1").unwrap().clone()
    }

    #[test]
    fn test_count_window_excludes_current_value() {
        let s = series(&[
            ("2015-11-01 08:00:00", "12"),
            ("2015-11-01 08:05:00", "15"),
            ("2015-11-01 08:10:00", "9"),
        ]);
        let agg = RollingAggregator::new(RollingConfig {
            window_sizes: vec![2],
            window_unit: WindowUnit::Count,
        })
        .unwrap();

        let stats = agg.compute(&s);

        // At 08:10 the window holds 12 and 15; the current value 9 is excluded
        assert!((stats[2][0].mean - 13.5).abs() < 1e-9);
        assert!((stats[2][0].fill_ratio - 1.0).abs() < 1e-9);
        assert!((stats[2][0].min - 12.0).abs() < 1e-9);
        assert!((stats[2][0].max - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_cold_start_partial_fill() {
        let s = series(&[
            ("2015-11-01 08:00:00", "12"),
            ("2015-11-01 08:05:00", "15"),
        ]);
        let agg = RollingAggregator::new(RollingConfig {
            window_sizes: vec![4],
            window_unit: WindowUnit::Count,
        })
        .unwrap();

        let stats = agg.compute(&s);

        // First observation has no history at all
        assert_eq!(stats[0][0].fill_ratio, 0.0);
        assert_eq!(stats[0][0].mean, 0.0);
        // Second has 1 of 4 requested
        assert!((stats[1][0].fill_ratio - 0.25).abs() < 1e-9);
        assert!((stats[1][0].mean - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_never_fails() {
        let s = series(&[("2015-11-01 08:00:00", "12")]);
        let agg = RollingAggregator::new(RollingConfig {
            window_sizes: vec![10, 20],
            window_unit: WindowUnit::Count,
        })
        .unwrap();

        let stats = agg.compute(&s);
        assert_eq!(stats.len(), 1);
        assert!(stats[0].iter().all(|w| w.fill_ratio < 1.0));
    }

    #[test]
    fn test_duration_window() {
        let s = series(&[
            ("2015-11-01 08:00:00", "10"),
            ("2015-11-01 08:05:00", "20"),
            ("2015-11-01 08:20:00", "30"),
        ]);
        // 600 second window: at 08:20 only 08:05 falls outside... 08:20-08:05
        // is 900s > 600s, and 08:00 is 1200s back, so the window is empty.
        let agg = RollingAggregator::new(RollingConfig {
            window_sizes: vec![600],
            window_unit: WindowUnit::Duration,
        })
        .unwrap();

        let stats = agg.compute(&s);

        // Empty window reports zero fill regardless of history coverage
        assert_eq!(stats[2][0].fill_ratio, 0.0);
        assert_eq!(stats[2][0].mean, 0.0);

        // At 08:05 the 08:00 observation is 300s back, inside the window
        assert!((stats[1][0].mean - 10.0).abs() < 1e-9);
        assert!((stats[1][0].fill_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_causality_mutation() {
        let s = series(&[
            ("2015-11-01 08:00:00", "10"),
            ("2015-11-01 08:05:00", "20"),
            ("2015-11-01 08:10:00", "30"),
            ("2015-11-01 08:15:00", "40"),
        ]);
        let agg = RollingAggregator::new(RollingConfig::default()).unwrap();
        let before = agg.compute(&s);

        // Change the last observation; nothing computed earlier may move
        let mutated = series(&[
            ("2015-11-01 08:00:00", "10"),
            ("2015-11-01 08:05:00", "20"),
            ("2015-11-01 08:10:00", "30"),
            ("2015-11-01 08:15:00", "9999"),
        ]);
        let after = agg.compute(&mutated);

        assert_eq!(before[..3], after[..3]);
        assert_eq!(before[3], after[3]);
    }

    #[test]
    fn test_rejects_zero_window() {
        let result = RollingAggregator::new(RollingConfig {
            window_sizes: vec![3, 0],
            window_unit: WindowUnit::Count,
        });
        assert!(matches!(result, Err(FlowcastError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_empty_window_set() {
        let result = RollingAggregator::new(RollingConfig {
            window_sizes: vec![],
            window_unit: WindowUnit::Count,
        });
        assert!(matches!(result, Err(FlowcastError::ConfigError(_))));
    }

    #[test]
    fn test_population_std() {
        let s = series(&[
            ("2015-11-01 08:00:00", "2"),
            ("2015-11-01 08:05:00", "4"),
            ("2015-11-01 08:10:00", "0"),
        ]);
        let agg = RollingAggregator::new(RollingConfig {
            window_sizes: vec![2],
            window_unit: WindowUnit::Count,
        })
        .unwrap();

        let stats = agg.compute(&s);
        // Window at index 2: values [2, 4], mean 3, population std 1
        assert!((stats[2][0].std - 1.0).abs() < 1e-9);
    }
}
