//! Leakage-free dataset splitting
//!
//! Partitions feature vectors into time-ordered train/validation/test sets.
//! A random row-wise split would leak future rolling-window information into
//! training, so only temporal cutoffs are supported: absolute timestamps
//! applied globally, or fractions applied per location independently.

use crate::error::{FlowcastError, Result};
use crate::features::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Temporal cutoff specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CutoffSpec {
    /// Absolute boundaries: rows at or before `train_end` train, rows at or
    /// before `validation_end` validate, the rest test
    Timestamps {
        train_end: DateTime<Utc>,
        validation_end: DateTime<Utc>,
    },
    /// Per-location index fractions, e.g. 0.6 train / 0.2 validation leaves
    /// the final 0.2 of each location's rows for test
    Fractions { train: f64, validation: f64 },
}

/// Time-ordered partitions. For every location present in more than one
/// partition, all train timestamps precede all validation timestamps, which
/// precede all test timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<FeatureVector>,
    pub validation: Vec<FeatureVector>,
    pub test: Vec<FeatureVector>,
}

/// Splits feature vectors along validated temporal cutoffs
#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    cutoff: CutoffSpec,
}

impl DatasetSplitter {
    /// Create a splitter, rejecting non-monotonic cutoffs before any data
    /// is touched
    pub fn new(cutoff: CutoffSpec) -> Result<Self> {
        match &cutoff {
            CutoffSpec::Timestamps {
                train_end,
                validation_end,
            } => {
                if train_end >= validation_end {
                    return Err(FlowcastError::ConfigError(format!(
                        "train_end ({train_end}) must precede validation_end ({validation_end})"
                    )));
                }
            }
            CutoffSpec::Fractions { train, validation } => {
                if !(*train > 0.0 && *validation > 0.0 && train + validation < 1.0) {
                    return Err(FlowcastError::ConfigError(format!(
                        "fractions must be positive with train + validation < 1, \
                         got train={train}, validation={validation}"
                    )));
                }
            }
        }
        Ok(Self { cutoff })
    }

    /// Partition feature vectors, preserving within-location time order.
    ///
    /// Fails with a configuration error if any location would end up with an
    /// empty partition: evaluating such a split would silently misreport
    /// accuracy for that location.
    pub fn split(&self, features: Vec<FeatureVector>) -> Result<Split> {
        let mut per_location: BTreeMap<String, Vec<FeatureVector>> = BTreeMap::new();
        for fv in features {
            per_location.entry(fv.location_id.clone()).or_default().push(fv);
        }

        let mut split = Split {
            train: Vec::new(),
            validation: Vec::new(),
            test: Vec::new(),
        };

        for (location, rows) in per_location {
            let (train, validation, test) = match &self.cutoff {
                CutoffSpec::Timestamps {
                    train_end,
                    validation_end,
                } => {
                    let mut train = Vec::new();
                    let mut validation = Vec::new();
                    let mut test = Vec::new();
                    for fv in rows {
                        if fv.timestamp <= *train_end {
                            train.push(fv);
                        } else if fv.timestamp <= *validation_end {
                            validation.push(fv);
                        } else {
                            test.push(fv);
                        }
                    }
                    (train, validation, test)
                }
                CutoffSpec::Fractions { train, validation } => {
                    let n = rows.len();
                    let train_end = (n as f64 * train).floor() as usize;
                    let validation_end = (n as f64 * (train + validation)).floor() as usize;
                    let mut rows = rows;
                    let test = rows.split_off(validation_end.min(n));
                    let validation = rows.split_off(train_end.min(rows.len()));
                    (rows, validation, test)
                }
            };

            for (name, partition) in [("train", &train), ("validation", &validation), ("test", &test)]
            {
                if partition.is_empty() {
                    return Err(FlowcastError::ConfigError(format!(
                        "location {location} has an empty {name} partition under the \
                         configured cutoff"
                    )));
                }
            }

            split.train.extend(train);
            split.validation.extend(validation);
            split.test.extend(test);
        }

        info!(
            train = split.train.len(),
            validation = split.validation.len(),
            test = split.test.len(),
            "dataset split complete"
        );

        Ok(split)
    }
}
