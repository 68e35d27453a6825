//! Integration tests for the full pipeline: ingestion, feature engineering,
//! splitting, forecasting, and ETA mapping

use chrono::{TimeZone, Utc};
use flowcast::prelude::*;

fn hourly_rows(location: &str, days: usize) -> Vec<RawRow> {
    let mut rows = Vec::new();
    for day in 0..days {
        for hour in 0..24 {
            // Two rush-hour humps over a baseline
            let count = 5
                + if (7..=9).contains(&hour) { 20 } else { 0 }
                + if (16..=18).contains(&hour) { 25 } else { 0 };
            rows.push(RawRow::new(
                location,
                &format!("2015-11-{:02} {:02}:00:00", 1 + day, hour),
                &count.to_string(),
            ));
        }
    }
    rows
}

#[test]
fn test_end_to_end_pipeline() {
    let mut rows = hourly_rows("J1", 6);
    rows.extend(hourly_rows("J2", 6));

    let config = PipelineConfig {
        window_sizes: vec![3, 6],
        window_unit: WindowUnit::Count,
        cutoff: CutoffSpec::Timestamps {
            train_end: Utc.with_ymd_and_hms(2015, 11, 4, 23, 0, 0).unwrap(),
            validation_end: Utc.with_ymd_and_hms(2015, 11, 5, 23, 0, 0).unwrap(),
        },
        cold_start_threshold: 1.0,
        include_cold_start: false,
        eta_default_curve: Some(vec![(0.0, 1.0), (20.0, 1.5), (50.0, 3.0)]),
    };
    let pipeline = TrafficPipeline::new(config).unwrap();
    let output = pipeline.run(&rows).unwrap();

    assert_eq!(output.report.rows_kept, 288);
    assert_eq!(output.report.rows_dropped(), 0);

    let mut model = LinearForecaster::new();
    model.fit(&output.split.train).unwrap();
    let metrics = evaluate(&model, &output.split.test, &pipeline.evaluation_config()).unwrap();

    assert!(metrics.mae.is_finite());
    assert!(metrics.rmse >= metrics.mae);
    assert!(metrics.n_evaluated > 0);

    // Map one forecast to an ETA with the configured default curve
    let forecasts = model.predict(&output.split.test[..1]).unwrap();
    let mapper = pipeline.eta_mapper().unwrap();
    let segment = RouteSegment {
        segment_id: "S1".to_string(),
        free_flow_seconds: 600.0,
    };
    let eta = mapper.estimate(&segment, &forecasts[0]).unwrap();
    assert!(!eta.degraded);
    assert!(eta.predicted_travel_time_seconds >= 600.0);
}

#[test]
fn test_pipeline_determinism_byte_identical() {
    let mut rows = hourly_rows("J1", 4);
    rows.extend(hourly_rows("J3", 4));
    rows.extend(hourly_rows("J2", 4));

    let pipeline = TrafficPipeline::new(PipelineConfig::default()).unwrap();
    let a = pipeline.run(&rows).unwrap();
    let b = pipeline.run(&rows).unwrap();

    assert_eq!(
        serde_json::to_vec(&a.features).unwrap(),
        serde_json::to_vec(&b.features).unwrap()
    );
}

#[test]
fn test_cleaned_series_strictly_increasing() {
    // Shuffle arrival order and inject a duplicate timestamp
    let mut rows = hourly_rows("J1", 2);
    rows.reverse();
    rows.push(RawRow::new("J1", "2015-11-01 05:00:00", "99"));

    let (store, report) = ObservationStore::ingest(&rows);
    assert_eq!(report.duplicate_observation, 1);

    for series in store.series() {
        assert!(series
            .observations()
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }
    // Keep-first policy: the original 05:00 row arrived before the injected
    // duplicate, so its value wins
    let at_five = &store.get("J1").unwrap().observations()[5];
    assert_eq!(at_five.vehicle_count, 5);
}

#[test]
fn test_split_has_no_temporal_overlap() {
    let rows = hourly_rows("J1", 5);
    let pipeline = TrafficPipeline::new(PipelineConfig {
        cutoff: CutoffSpec::Fractions {
            train: 0.7,
            validation: 0.15,
        },
        ..Default::default()
    })
    .unwrap();
    let output = pipeline.run(&rows).unwrap();

    let max_train = output.split.train.iter().map(|f| f.timestamp).max().unwrap();
    let min_validation = output.split.validation.iter().map(|f| f.timestamp).min().unwrap();
    let max_validation = output.split.validation.iter().map(|f| f.timestamp).max().unwrap();
    let min_test = output.split.test.iter().map(|f| f.timestamp).min().unwrap();

    assert!(max_train < min_validation);
    assert!(max_validation < min_test);
}

#[test]
fn test_malformed_rows_never_abort_the_batch() {
    let mut rows = hourly_rows("J1", 5);
    rows.push(RawRow::new("J1", "garbage", "10"));
    rows.push(RawRow::new("J1", "2015-11-06 00:00:00", "-1"));
    rows.push(RawRow::new("", "2015-11-06 01:00:00", "10"));

    let pipeline = TrafficPipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&rows).unwrap();

    assert_eq!(output.report.invalid_timestamp, 1);
    assert_eq!(output.report.invalid_vehicle_count, 1);
    assert_eq!(output.report.missing_location, 1);
    assert_eq!(output.report.validation_failures(), 3);
    assert_eq!(output.report.rows_kept, 120);
}

#[test]
fn test_tiny_location_yields_cold_start_features_without_failure() {
    // Fewer observations than the smallest window
    let rows = vec![
        RawRow::new("J9", "2015-11-01 08:00:00", "4"),
        RawRow::new("J9", "2015-11-01 09:00:00", "6"),
    ];

    let agg = RollingAggregator::new(RollingConfig {
        window_sizes: vec![6],
        window_unit: WindowUnit::Count,
    })
    .unwrap();
    let (store, _) = ObservationStore::ingest(&rows);
    let features = build_features(store.get("J9").unwrap(), &agg);

    assert_eq!(features.len(), 2);
    assert!(features.iter().all(|f| f.min_fill_ratio() < 1.0));
}

#[test]
fn test_baselines_and_learned_model_share_the_trait() {
    // Two full weeks so every test (day-of-week, hour) cell shows up in
    // training for the seasonal baseline
    let rows = hourly_rows("J1", 14);
    let pipeline = TrafficPipeline::new(PipelineConfig::default()).unwrap();
    let output = pipeline.run(&rows).unwrap();

    let mut models: Vec<Box<dyn Forecaster>> = vec![
        Box::new(NaiveForecaster::new()),
        Box::new(SeasonalAverageForecaster::new()),
        Box::new(LinearForecaster::new()),
    ];

    let eval = pipeline.evaluation_config();
    let mut maes = Vec::new();
    for model in models.iter_mut() {
        model.fit(&output.split.train).unwrap();
        let metrics = evaluate(model.as_ref(), &output.split.test, &eval).unwrap();
        assert!(metrics.mae.is_finite());
        maes.push(metrics.mae);
    }

    // The daily pattern repeats exactly, so the seasonal baseline should
    // easily beat repeat-last on this data
    assert!(maes[1] < maes[0]);
}
