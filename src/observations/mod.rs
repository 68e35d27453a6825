//! Observation ingestion and cleaning
//!
//! Turns raw tabular rows into validated, deduplicated, time-sorted
//! per-junction observation series. Malformed rows are dropped and counted
//! in an [`IngestReport`], never fatal to the batch.

use crate::error::{FlowcastError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// A raw row as exposed by an external tabular source. All fields arrive as
/// strings; parsing and validation happen during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    /// Optional unique row identifier. When present, duplicates are dropped.
    pub row_id: Option<String>,
    /// Junction identifier
    pub location_id: String,
    /// Timestamp string, RFC 3339 or `YYYY-MM-DD HH:MM:SS` (treated as UTC)
    pub timestamp: String,
    /// Vehicle count string, must parse to a non-negative integer
    pub vehicle_count: String,
}

impl RawRow {
    /// Convenience constructor for rows without an explicit id
    pub fn new(location_id: &str, timestamp: &str, vehicle_count: &str) -> Self {
        Self {
            row_id: None,
            location_id: location_id.to_string(),
            timestamp: timestamp.to_string(),
            vehicle_count: vehicle_count.to_string(),
        }
    }
}

/// A single validated observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub location_id: String,
    pub timestamp: DateTime<Utc>,
    pub vehicle_count: u32,
}

/// Per-junction sequence of observations, strictly increasing in timestamp.
/// Produced exclusively by [`ObservationStore::ingest`] and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedSeries {
    location_id: String,
    observations: Vec<Observation>,
}

impl CleanedSeries {
    /// Junction identifier this series belongs to
    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    /// Observations in strictly increasing timestamp order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Data-quality counts for one ingestion batch. Returned alongside the
/// cleaned series so callers and tests can assert on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Total rows presented to the store
    pub rows_seen: usize,
    /// Rows that survived cleaning
    pub rows_kept: usize,
    /// Rows dropped for an unparseable timestamp
    pub invalid_timestamp: usize,
    /// Rows dropped for a missing/empty location id
    pub missing_location: usize,
    /// Rows dropped for a negative or unparseable vehicle count
    pub invalid_vehicle_count: usize,
    /// Rows dropped because their row id was already seen
    pub duplicate_row_id: usize,
    /// Rows dropped because their (location, timestamp) pair was already
    /// observed; the first occurrence wins
    pub duplicate_observation: usize,
}

impl IngestReport {
    /// Total rows dropped for any reason
    pub fn rows_dropped(&self) -> usize {
        self.rows_seen - self.rows_kept
    }

    /// Rows dropped by row-level validation, excluding duplicate resolution
    pub fn validation_failures(&self) -> usize {
        self.invalid_timestamp + self.missing_location + self.invalid_vehicle_count
    }
}

/// Validated, deduplicated, time-sorted observation store.
///
/// Lifecycle is explicit: one-shot [`ingest`](Self::ingest), immutable
/// result. Re-ingesting identical raw input yields an identical store.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    series: BTreeMap<String, CleanedSeries>,
}

impl ObservationStore {
    /// Ingest a batch of raw rows.
    ///
    /// Malformed rows (unparseable timestamp, empty location id, negative or
    /// unparseable vehicle count, repeated row id) are dropped and counted.
    /// Duplicate (location, timestamp) pairs keep the first occurrence in
    /// arrival order, so the result is deterministic.
    pub fn ingest(rows: &[RawRow]) -> (Self, IngestReport) {
        let mut report = IngestReport {
            rows_seen: rows.len(),
            ..Default::default()
        };
        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut by_location: BTreeMap<String, Vec<Observation>> = BTreeMap::new();

        for (idx, row) in rows.iter().enumerate() {
            if let Some(id) = row.row_id.as_deref() {
                let id = id.trim();
                if !id.is_empty() && !seen_ids.insert(id) {
                    debug!(row = idx, row_id = id, "dropping row: duplicate row id");
                    report.duplicate_row_id += 1;
                    continue;
                }
            }

            let location_id = row.location_id.trim();
            if location_id.is_empty() {
                debug!(row = idx, "dropping row: missing location id");
                report.missing_location += 1;
                continue;
            }

            let timestamp = match parse_timestamp(&row.timestamp) {
                Ok(ts) => ts,
                Err(_) => {
                    debug!(row = idx, raw = %row.timestamp, "dropping row: unparseable timestamp");
                    report.invalid_timestamp += 1;
                    continue;
                }
            };

            let vehicle_count = match parse_vehicle_count(&row.vehicle_count) {
                Ok(v) => v,
                Err(_) => {
                    debug!(row = idx, raw = %row.vehicle_count, "dropping row: invalid vehicle count");
                    report.invalid_vehicle_count += 1;
                    continue;
                }
            };

            by_location.entry(location_id.to_string()).or_default().push(Observation {
                location_id: location_id.to_string(),
                timestamp,
                vehicle_count,
            });
        }

        let mut series = BTreeMap::new();
        for (location_id, mut observations) in by_location {
            // Stable sort keeps arrival order among equal timestamps, so the
            // dedup below implements the keep-first collision policy.
            observations.sort_by_key(|o| o.timestamp);
            let before = observations.len();
            observations.dedup_by_key(|o| o.timestamp);
            report.duplicate_observation += before - observations.len();
            report.rows_kept += observations.len();

            series.insert(
                location_id.clone(),
                CleanedSeries {
                    location_id,
                    observations,
                },
            );
        }

        if report.rows_dropped() > 0 {
            warn!(
                dropped = report.rows_dropped(),
                kept = report.rows_kept,
                "ingestion dropped rows"
            );
        }

        (Self { series }, report)
    }

    /// Series for a single junction, if present
    pub fn get(&self, location_id: &str) -> Option<&CleanedSeries> {
        self.series.get(location_id)
    }

    /// Junction ids in sorted order
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// All series in sorted junction-id order
    pub fn series(&self) -> impl Iterator<Item = &CleanedSeries> {
        self.series.values()
    }

    /// Number of junctions with at least one observation
    pub fn num_locations(&self) -> usize {
        self.series.len()
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    Err(FlowcastError::ValidationError(format!(
        "unparseable timestamp: {raw}"
    )))
}

fn parse_vehicle_count(raw: &str) -> Result<u32> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FlowcastError::ValidationError(format!("unparseable vehicle count: {raw}")))?;
    u32::try_from(value).map_err(|_| {
        FlowcastError::ValidationError(format!("negative vehicle count: {value}"))
    })
}
