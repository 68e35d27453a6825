//! Baseline forecasters
//!
//! Cheap reference models every learned forecaster has to beat.

use super::{CongestionForecast, Forecaster};
use crate::error::{FlowcastError, Result};
use crate::features::FeatureVector;
use std::collections::HashMap;

/// Repeat-last-value baseline: predicts the most recent training target seen
/// for the row's junction.
#[derive(Debug, Clone, Default)]
pub struct NaiveForecaster {
    last_value: HashMap<String, f64>,
    global_mean: Option<f64>,
}

impl NaiveForecaster {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for NaiveForecaster {
    fn fit(&mut self, train: &[FeatureVector]) -> Result<()> {
        if train.is_empty() {
            return Err(FlowcastError::ValidationError(
                "cannot fit on an empty training set".to_string(),
            ));
        }
        // Rows arrive time-ordered per location, so the last write wins
        for row in train {
            self.last_value.insert(row.location_id.clone(), row.target);
        }
        self.global_mean =
            Some(train.iter().map(|r| r.target).sum::<f64>() / train.len() as f64);
        Ok(())
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<CongestionForecast>> {
        let global_mean = self.global_mean.ok_or(FlowcastError::ModelNotFitted)?;

        Ok(rows
            .iter()
            .map(|row| CongestionForecast {
                location_id: row.location_id.clone(),
                timestamp: row.timestamp,
                predicted_vehicle_count: self
                    .last_value
                    .get(&row.location_id)
                    .copied()
                    .unwrap_or(global_mean),
                prediction_interval: None,
            })
            .collect())
    }
}

/// Seasonal-average baseline: predicts the training mean for the row's
/// (junction, day-of-week, hour) cell, falling back to the junction mean and
/// then the global mean for unseen cells.
#[derive(Debug, Clone, Default)]
pub struct SeasonalAverageForecaster {
    cell_mean: HashMap<(String, u32, u32), f64>,
    location_mean: HashMap<String, f64>,
    global_mean: Option<f64>,
}

impl SeasonalAverageForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell_key(row: &FeatureVector) -> (String, u32, u32) {
        (
            row.location_id.clone(),
            row.calendar.day_of_week,
            row.calendar.hour_of_day,
        )
    }
}

impl Forecaster for SeasonalAverageForecaster {
    fn fit(&mut self, train: &[FeatureVector]) -> Result<()> {
        if train.is_empty() {
            return Err(FlowcastError::ValidationError(
                "cannot fit on an empty training set".to_string(),
            ));
        }

        let mut cell_acc: HashMap<(String, u32, u32), (f64, usize)> = HashMap::new();
        let mut location_acc: HashMap<String, (f64, usize)> = HashMap::new();

        for row in train {
            let cell = cell_acc.entry(Self::cell_key(row)).or_insert((0.0, 0));
            cell.0 += row.target;
            cell.1 += 1;

            let loc = location_acc
                .entry(row.location_id.clone())
                .or_insert((0.0, 0));
            loc.0 += row.target;
            loc.1 += 1;
        }

        self.cell_mean = cell_acc
            .into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f64))
            .collect();
        self.location_mean = location_acc
            .into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f64))
            .collect();
        self.global_mean =
            Some(train.iter().map(|r| r.target).sum::<f64>() / train.len() as f64);
        Ok(())
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<CongestionForecast>> {
        let global_mean = self.global_mean.ok_or(FlowcastError::ModelNotFitted)?;

        Ok(rows
            .iter()
            .map(|row| {
                let predicted = self
                    .cell_mean
                    .get(&Self::cell_key(row))
                    .or_else(|| self.location_mean.get(&row.location_id))
                    .copied()
                    .unwrap_or(global_mean);
                CongestionForecast {
                    location_id: row.location_id.clone(),
                    timestamp: row.timestamp,
                    predicted_vehicle_count: predicted,
                    prediction_interval: None,
                }
            })
            .collect())
    }
}
