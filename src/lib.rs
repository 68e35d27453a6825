//! flowcast - Junction congestion forecasting pipeline
//!
//! This crate forecasts short-term traffic congestion at discrete road
//! junctions from historical time-stamped vehicle-count observations, then
//! maps congestion forecasts to travel-time estimates:
//! - Ingestion validation with per-reason drop counts
//! - Calendar and causal rolling-window feature engineering
//! - Leakage-free time-ordered train/validation/test splitting
//! - Pluggable forecasting models behind a fit/predict trait
//! - Congestion-to-ETA mapping through calibrated slowdown curves
//!
//! # Modules
//!
//! - [`observations`] - Raw-row validation, deduplication, time sorting
//! - [`features`] - Calendar features and causal rolling statistics
//! - [`split`] - Temporal train/validation/test partitioning
//! - [`forecast`] - Forecaster trait, baselines, linear model, evaluation
//! - [`eta`] - Slowdown curves and travel-time estimation
//! - [`pipeline`] - End-to-end batch orchestration
//!
//! All timestamps are UTC instants; derived features use the same timezone
//! as ingestion so training and inference never skew. The pipeline is
//! batch-oriented and deterministic: identical raw input yields identical
//! feature matrices. I/O (reading raw files, persisting models) belongs to
//! external collaborators; the core operates on in-memory sequences.

pub mod error;

pub mod eta;
pub mod features;
pub mod forecast;
pub mod observations;
pub mod pipeline;
pub mod split;

pub use error::{FlowcastError, Result};

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::error::{FlowcastError, Result};
    pub use crate::eta::{EtaEstimate, EtaMapper, RouteSegment, SlowdownCurve};
    pub use crate::features::{
        build_features, CalendarFeatures, FeatureVector, RollingAggregator, RollingConfig,
        TemporalFeaturizer, WindowStats, WindowUnit,
    };
    pub use crate::forecast::{
        evaluate, CongestionForecast, EvaluationConfig, ForecastMetrics, Forecaster,
        LinearForecaster, NaiveForecaster, SeasonalAverageForecaster,
    };
    pub use crate::observations::{
        CleanedSeries, IngestReport, Observation, ObservationStore, RawRow,
    };
    pub use crate::pipeline::{PipelineConfig, PipelineOutput, TrafficPipeline};
    pub use crate::split::{CutoffSpec, DatasetSplitter, Split};
}
