//! End-to-end pipeline orchestration
//!
//! One-shot, batch-oriented composition: raw rows → cleaned series →
//! per-location feature vectors → leakage-free split. Feature computation
//! parallelizes across locations (they share no mutable state); outputs are
//! ordered by junction id, so results do not depend on thread scheduling.

use crate::error::Result;
use crate::eta::{EtaMapper, SlowdownCurve};
use crate::features::{build_features, FeatureVector, RollingAggregator, RollingConfig, WindowUnit};
use crate::forecast::EvaluationConfig;
use crate::observations::{IngestReport, ObservationStore, RawRow};
use crate::split::{CutoffSpec, DatasetSplitter, Split};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Full configuration surface of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rolling window sizes (observations or seconds, per `window_unit`)
    pub window_sizes: Vec<usize>,
    pub window_unit: WindowUnit,
    /// Temporal cutoffs for the train/validation/test split
    pub cutoff: CutoffSpec,
    /// Minimum window fill ratio for a row to count toward evaluation
    pub cold_start_threshold: f64,
    /// Evaluate cold-start rows anyway
    pub include_cold_start: bool,
    /// Default (vehicle_count, slowdown_factor) curve for ETA mapping;
    /// None means every segment must be individually calibrated
    pub eta_default_curve: Option<Vec<(f64, f64)>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_sizes: vec![3, 6, 12],
            window_unit: WindowUnit::Count,
            cutoff: CutoffSpec::Fractions {
                train: 0.6,
                validation: 0.2,
            },
            cold_start_threshold: 1.0,
            include_cold_start: false,
            eta_default_curve: Some(vec![(0.0, 1.0), (20.0, 1.5), (40.0, 2.5)]),
        }
    }
}

/// Everything the pipeline produces for one batch of raw rows
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// All feature vectors, ordered by junction id then timestamp
    pub features: Vec<FeatureVector>,
    pub split: Split,
    /// Data-quality counts from ingestion
    pub report: IngestReport,
}

/// Deterministic batch pipeline from raw rows to split feature matrices
#[derive(Debug, Clone)]
pub struct TrafficPipeline {
    aggregator: RollingAggregator,
    splitter: DatasetSplitter,
    config: PipelineConfig,
}

impl TrafficPipeline {
    /// Build a pipeline, validating the whole configuration before any data
    /// is touched
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let aggregator = RollingAggregator::new(RollingConfig {
            window_sizes: config.window_sizes.clone(),
            window_unit: config.window_unit,
        })?;
        let splitter = DatasetSplitter::new(config.cutoff.clone())?;
        validate_evaluation(&config)?;
        if let Some(knots) = &config.eta_default_curve {
            SlowdownCurve::from_knots(knots.clone())?;
        }

        Ok(Self {
            aggregator,
            splitter,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline over one batch of raw rows
    pub fn run(&self, rows: &[RawRow]) -> Result<PipelineOutput> {
        let (store, report) = ObservationStore::ingest(rows);
        info!(
            locations = store.num_locations(),
            kept = report.rows_kept,
            dropped = report.rows_dropped(),
            "ingestion complete"
        );

        let series: Vec<_> = store.series().collect();
        let features: Vec<FeatureVector> = series
            .par_iter()
            .map(|s| build_features(s, &self.aggregator))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        info!(rows = features.len(), "feature engineering complete");

        let split = self.splitter.split(features.clone())?;

        Ok(PipelineOutput {
            features,
            split,
            report,
        })
    }

    /// Evaluation settings derived from the pipeline configuration
    pub fn evaluation_config(&self) -> EvaluationConfig {
        EvaluationConfig {
            cold_start_threshold: self.config.cold_start_threshold,
            include_cold_start: self.config.include_cold_start,
        }
    }

    /// ETA mapper seeded with the configured default curve, if any
    pub fn eta_mapper(&self) -> Result<EtaMapper> {
        let mut mapper = EtaMapper::new();
        if let Some(knots) = &self.config.eta_default_curve {
            mapper = mapper.with_default_curve(SlowdownCurve::from_knots(knots.clone())?);
        }
        Ok(mapper)
    }
}

fn validate_evaluation(config: &PipelineConfig) -> Result<()> {
    EvaluationConfig {
        cold_start_threshold: config.cold_start_threshold,
        include_cold_start: config.include_cold_start,
    }
    .validate()
}
