//! Congestion-to-ETA mapping
//!
//! Converts a congestion forecast into an expected travel time for a route
//! segment: `travel_time = free_flow_seconds * f(predicted_vehicle_count)`,
//! where f is a monotone non-decreasing piecewise-linear slowdown curve.
//! Curves are either supplied as configuration or calibrated from observed
//! (vehicle_count, travel_time) pairs; which one applies per segment is the
//! caller's choice.

use crate::error::{FlowcastError, Result};
use crate::forecast::CongestionForecast;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// A road segment with its no-congestion travel time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub segment_id: String,
    pub free_flow_seconds: f64,
}

/// Travel-time estimate for one segment, carrying the forecast it was
/// derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaEstimate {
    pub route_segment_id: String,
    pub predicted_travel_time_seconds: f64,
    /// True when the forecast was unusable and the free-flow time was
    /// returned as a best-effort fallback
    pub degraded: bool,
    pub basis: CongestionForecast,
}

/// Monotone non-decreasing piecewise-linear slowdown curve over vehicle
/// counts. Below the first knot the first factor applies; above the last
/// knot the last factor applies; between knots the factor is interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowdownCurve {
    knots: Vec<(f64, f64)>,
}

impl SlowdownCurve {
    /// Build a curve from (vehicle_count, slowdown_factor) knots.
    ///
    /// Knots must be non-empty, strictly increasing in vehicle count, with
    /// positive, non-decreasing factors.
    pub fn from_knots(mut knots: Vec<(f64, f64)>) -> Result<Self> {
        if knots.is_empty() {
            return Err(FlowcastError::ConfigError(
                "slowdown curve needs at least one knot".to_string(),
            ));
        }
        knots.sort_by(|a, b| a.0.total_cmp(&b.0));

        for pair in knots.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(FlowcastError::ConfigError(format!(
                    "duplicate vehicle count {} in slowdown curve",
                    pair[0].0
                )));
            }
            if pair[1].1 < pair[0].1 {
                return Err(FlowcastError::ConfigError(format!(
                    "slowdown factors must be non-decreasing, got {} then {}",
                    pair[0].1, pair[1].1
                )));
            }
        }
        if knots.iter().any(|(c, f)| !c.is_finite() || !f.is_finite() || *f <= 0.0) {
            return Err(FlowcastError::ConfigError(
                "slowdown curve knots must be finite with positive factors".to_string(),
            ));
        }

        Ok(Self { knots })
    }

    /// Calibrate a curve from observed (vehicle_count, actual_travel_time)
    /// pairs for a segment. Ratios against the free-flow time become the
    /// factors; runs that would decrease are clamped to the running maximum
    /// so the result stays monotone.
    pub fn calibrate(pairs: &[(f64, f64)], free_flow_seconds: f64) -> Result<Self> {
        if pairs.is_empty() {
            return Err(FlowcastError::MissingCalibration);
        }
        if free_flow_seconds <= 0.0 {
            return Err(FlowcastError::ConfigError(format!(
                "free-flow time must be positive, got {free_flow_seconds}"
            )));
        }

        let mut sorted: Vec<(f64, f64)> = pairs
            .iter()
            .map(|(count, time)| (*count, time / free_flow_seconds))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        sorted.dedup_by(|b, a| {
            if a.0 == b.0 {
                // Same count observed twice: keep the larger factor
                a.1 = a.1.max(b.1);
                true
            } else {
                false
            }
        });

        let mut running_max = 0.0f64;
        for knot in &mut sorted {
            running_max = running_max.max(knot.1);
            knot.1 = running_max;
        }

        Self::from_knots(sorted)
    }

    /// Slowdown factor for a predicted vehicle count
    pub fn factor(&self, vehicle_count: f64) -> f64 {
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        if vehicle_count <= first.0 {
            return first.1;
        }
        if vehicle_count >= last.0 {
            return last.1;
        }

        for pair in self.knots.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if vehicle_count <= x1 {
                let t = (vehicle_count - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        last.1
    }
}

/// Maps congestion forecasts to travel-time estimates.
///
/// Holds an optional default curve plus per-segment calibrated curves;
/// per-segment curves take precedence. With neither available, `estimate`
/// fails with [`FlowcastError::MissingCalibration`] — the only condition
/// under which it fails rather than degrading.
#[derive(Debug, Clone, Default)]
pub struct EtaMapper {
    default_curve: Option<SlowdownCurve>,
    per_segment: HashMap<String, SlowdownCurve>,
}

impl EtaMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default curve used for segments without their own calibration
    pub fn with_default_curve(mut self, curve: SlowdownCurve) -> Self {
        self.default_curve = Some(curve);
        self
    }

    /// Calibrate and register a curve for one segment
    pub fn calibrate_segment(
        &mut self,
        segment: &RouteSegment,
        pairs: &[(f64, f64)],
    ) -> Result<()> {
        let curve = SlowdownCurve::calibrate(pairs, segment.free_flow_seconds)?;
        self.per_segment.insert(segment.segment_id.clone(), curve);
        Ok(())
    }

    /// Estimate travel time for a segment from a congestion forecast.
    ///
    /// An unusable forecast (non-finite or negative predicted count) returns
    /// the free-flow time flagged `degraded: true` rather than failing.
    pub fn estimate(
        &self,
        segment: &RouteSegment,
        forecast: &CongestionForecast,
    ) -> Result<EtaEstimate> {
        let curve = self
            .per_segment
            .get(&segment.segment_id)
            .or(self.default_curve.as_ref())
            .ok_or(FlowcastError::MissingCalibration)?;

        let count = forecast.predicted_vehicle_count;
        if !count.is_finite() || count < 0.0 {
            warn!(
                segment = %segment.segment_id,
                predicted = count,
                "unusable forecast, returning free-flow time"
            );
            return Ok(EtaEstimate {
                route_segment_id: segment.segment_id.clone(),
                predicted_travel_time_seconds: segment.free_flow_seconds,
                degraded: true,
                basis: forecast.clone(),
            });
        }

        Ok(EtaEstimate {
            route_segment_id: segment.segment_id.clone(),
            predicted_travel_time_seconds: segment.free_flow_seconds * curve.factor(count),
            degraded: false,
            basis: forecast.clone(),
        })
    }
}
