//! Calendar feature derivation

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Calendar features derived from a single UTC instant.
///
/// `day_of_week` follows chrono's Monday-first convention (0 = Monday,
/// 6 = Sunday); the weekend flag covers Saturday and Sunday. Cyclical
/// sine/cosine encodings let linear models pick up the wrap-around at
/// midnight and at the week boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Hour of day (0-23)
    pub hour_of_day: u32,
    /// Day of week (0 = Monday .. 6 = Sunday)
    pub day_of_week: u32,
    /// Saturday or Sunday
    pub is_weekend: bool,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub dow_sin: f64,
    pub dow_cos: f64,
}

/// Pure featurizer over UTC timestamps. No state, no I/O; the same instant
/// always yields the same features, keeping training and inference aligned.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalFeaturizer;

impl TemporalFeaturizer {
    pub fn features(&self, timestamp: DateTime<Utc>) -> CalendarFeatures {
        let hour_of_day = timestamp.hour();
        let day_of_week = timestamp.weekday().num_days_from_monday();

        let hour_angle = 2.0 * std::f64::consts::PI * hour_of_day as f64 / 24.0;
        let dow_angle = 2.0 * std::f64::consts::PI * day_of_week as f64 / 7.0;

        CalendarFeatures {
            hour_of_day,
            day_of_week,
            is_weekend: day_of_week >= 5,
            hour_sin: hour_angle.sin(),
            hour_cos: hour_angle.cos(),
            dow_sin: dow_angle.sin(),
            dow_cos: dow_angle.cos(),
        }
    }
}
