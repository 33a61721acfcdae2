//! Pipeline Regression Tests
//!
//! End-to-end checks across stage boundaries: generated artifacts read back
//! through storage, labels surviving the delimited round trip, and feature
//! values computed from tables that went through the whole chain.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use grid_guardian::config::GuardianConfig;
use grid_guardian::degradation::DegradationModel;
use grid_guardian::features::FeatureEngineer;
use grid_guardian::generator::{equipment_ids, TelemetryGenerator};
use grid_guardian::labeling::RiskLabeler;
use grid_guardian::pipeline::PipelineRunner;
use grid_guardian::preprocessing::Preprocessor;
use grid_guardian::seed::{RunSeed, Stream};
use grid_guardian::storage::columnar::read_telemetry;
use grid_guardian::storage::tables::{read_frame_csv, read_telemetry_csv, write_telemetry_csv};
use grid_guardian::types::{
    label_columns, EquipmentId, RiskLevel, SensorChannel, TelemetryRecord, TelemetryTable,
};
use tempfile::tempdir;

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

/// Readings at their normal reference values.
fn normal_readings() -> [f64; SensorChannel::COUNT] {
    let mut r = [0.0; SensorChannel::COUNT];
    r[SensorChannel::TemperatureTop.index()] = 65.0;
    r[SensorChannel::TemperatureOil.index()] = 60.0;
    r[SensorChannel::VibrationX.index()] = 2.0;
    r[SensorChannel::VibrationY.index()] = 2.0;
    r[SensorChannel::VibrationZ.index()] = 1.5;
    r[SensorChannel::CurrentPhaseA.index()] = 120.0;
    r[SensorChannel::CurrentPhaseB.index()] = 120.0;
    r[SensorChannel::CurrentPhaseC.index()] = 120.0;
    r[SensorChannel::VoltagePhaseA.index()] = 230.0;
    r[SensorChannel::VoltagePhaseB.index()] = 230.0;
    r[SensorChannel::VoltagePhaseC.index()] = 230.0;
    r[SensorChannel::GasH2.index()] = 20.0;
    r[SensorChannel::GasC2h2.index()] = 5.0;
    r[SensorChannel::GasCh4.index()] = 10.0;
    r[SensorChannel::Humidity.index()] = 50.0;
    r[SensorChannel::LoadPercentage.index()] = 60.0;
    r
}

fn record(id: &EquipmentId, hour: i64, readings: [f64; SensorChannel::COUNT]) -> TelemetryRecord {
    TelemetryRecord {
        timestamp: t0() + TimeDelta::hours(hour),
        equipment_id: id.clone(),
        readings,
    }
}

// ============================================================================
// Degradation
// ============================================================================

#[test]
fn forced_failure_gives_one_ramp_then_constant_tail() {
    let model = DegradationModel::new(1.0, 4, 12, 0.2).unwrap();
    let seed = RunSeed::new(11);

    for unit in 0..2 {
        let pattern = model
            .generate_pattern(48, &mut seed.rng(Stream::Degradation, unit, 0))
            .unwrap();
        let episode = pattern.episode().expect("p_fail = 1 always degrades");
        let s = pattern.severity();

        assert_eq!(s.len(), 48);
        assert!(episode.failure_hour >= 9, "failure window starts at 20% of the run");
        assert!(s[..=episode.onset_hour].iter().all(|&v| v == 0.0));
        for h in episode.onset_hour + 1..episode.failure_hour {
            assert!(s[h] > s[h - 1], "unit {unit}: not increasing at hour {h}");
        }
        assert!(s[episode.failure_hour..].iter().all(|&v| v == 1.0));
        assert!(s.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}

#[test]
fn failing_units_show_up_in_generated_gases() {
    let mut config = GuardianConfig::default().generation;
    config.degradation_probability = 1.0;
    config.hours = 96;
    config.batch_size_hours = 24;
    config.onset_min_hours = 4;
    config.onset_max_hours = 12;
    let ids = equipment_ids(1, 2);
    let generator = TelemetryGenerator::new(&config).unwrap();
    let patterns = generator.degradation_patterns(&ids).unwrap();
    let (table, summary) = generator.generate_table(&ids).unwrap();
    assert_eq!(summary.failing_equipment, 2);

    let c2h2 = table.channel(SensorChannel::GasC2h2);
    for (unit, pattern) in patterns.iter().enumerate() {
        assert!(pattern.episode().unwrap().onset_hour > 0);
        let rows: Vec<usize> = (0..table.len())
            .filter(|&r| table.equipment_ids()[r] == ids[unit])
            .collect();
        let early = c2h2[rows[0]];
        let late = c2h2[rows[rows.len() - 1]];
        assert!(late > early, "unit {unit}: acetylene should rise from {early} once failed");
    }
}

// ============================================================================
// Generation → Storage → Preprocessing
// ============================================================================

#[test]
fn artifact_round_trips_into_preprocessing() {
    let dir = tempdir().unwrap();
    let mut config = GuardianConfig::default();
    config.generation.n_substations = 2;
    config.generation.equipment_per_substation = 3;
    config.generation.hours = 50;
    config.generation.batch_size_hours = 24;
    config.output.data_dir = dir.path().to_path_buf();
    config.output.dashboard_sample_rows = 0;

    let runner = PipelineRunner::new(config).unwrap();
    let generated = runner.generate().unwrap();
    assert_eq!(generated.summary.batches, 3);

    let raw = read_telemetry(&generated.manifest.path).unwrap();
    assert_eq!(raw.len(), 6 * 50);
    for ch in SensorChannel::ALL {
        let (lo, hi) = ch.physical_range();
        assert!(raw.channel(ch).iter().all(|&v| v >= lo && v <= hi), "{ch} out of range");
    }

    let cleaned = Preprocessor::new(&runner.config().preprocessing).clean(raw.clone());
    assert_eq!(cleaned.table.len(), raw.len());
    for ch in SensorChannel::ALL {
        assert!(cleaned.table.channel(ch).iter().all(|v| v.is_finite()));
    }
}

// ============================================================================
// Labeling
// ============================================================================

#[test]
fn acetylene_alone_marks_row_high_after_csv_round_trip() {
    let dir = tempdir().unwrap();
    let id = EquipmentId::new(1, 1);
    let mut hot = normal_readings();
    hot[SensorChannel::GasC2h2.index()] = 150.0;
    hot[SensorChannel::TemperatureTop.index()] = 70.0;
    hot[SensorChannel::VibrationX.index()] = 1.0;
    let table: TelemetryTable = vec![record(&id, 0, hot), record(&id, 1, normal_readings())]
        .into_iter()
        .collect();

    let outcome = RiskLabeler::new(&GuardianConfig::default()).label(table).unwrap();
    assert!(!outcome.fallback_used);

    let path = dir.path().join("labeled.csv");
    write_telemetry_csv(&path, &outcome.table).unwrap();
    let back = read_telemetry_csv(&path).unwrap();
    let labels = back.labels().unwrap();

    assert_eq!(labels.risk_level, vec![RiskLevel::High, RiskLevel::Low]);
    assert_eq!(labels.failure, vec![1, 0]);
    assert!(labels.failure_probability[1] < 0.3);
    assert_eq!(
        labels.failure_probability,
        outcome.table.labels().unwrap().failure_probability
    );
}

#[test]
fn quantile_fallback_marks_top_five_percent() {
    let ids = equipment_ids(1, 4);
    let mut rows = Vec::new();
    for i in 0..100_i32 {
        let mut r = normal_readings();
        // Distinct, all below every rule threshold
        r[SensorChannel::GasH2.index()] = f64::from(i) * 0.5;
        rows.push(record(&ids[i as usize % 4], i64::from(i / 4), r));
    }
    let table: TelemetryTable = rows.into_iter().collect();

    let outcome = RiskLabeler::new(&GuardianConfig::default()).label(table).unwrap();
    assert!(outcome.fallback_used);
    assert_eq!(outcome.distribution.high, 5);

    // The five highest scores are exactly the high rows
    let labels = outcome.table.labels().unwrap();
    let mut by_score: Vec<usize> = (0..100).collect();
    by_score.sort_by(|&a, &b| {
        labels.failure_probability[b].total_cmp(&labels.failure_probability[a])
    });
    for &row in &by_score[..5] {
        assert_eq!(labels.risk_level[row], RiskLevel::High);
    }
    for &row in &by_score[5..] {
        assert_ne!(labels.risk_level[row], RiskLevel::High);
    }
}

// ============================================================================
// Features
// ============================================================================

#[test]
fn rolling_mean_with_partial_windows() {
    let id = EquipmentId::new(1, 1);
    let table: TelemetryTable = [10.0, 20.0, 30.0, 40.0]
        .iter()
        .enumerate()
        .map(|(h, &v)| {
            let mut r = normal_readings();
            r[SensorChannel::TemperatureTop.index()] = v;
            record(&id, h as i64, r)
        })
        .collect();

    let features = FeatureEngineer::new(&GuardianConfig::default().features)
        .unwrap()
        .engineer(&table)
        .unwrap();
    assert_eq!(
        features.frame.column("temperature_top_rolling_mean_3h").unwrap(),
        &[10.0, 15.0, 20.0, 30.0]
    );
}

#[test]
fn full_run_feature_table_reads_back() {
    let dir = tempdir().unwrap();
    let mut config = GuardianConfig::default();
    config.generation.n_substations = 1;
    config.generation.equipment_per_substation = 3;
    config.generation.hours = 72;
    config.generation.batch_size_hours = 24;
    config.output.data_dir = dir.path().to_path_buf();
    config.output.dashboard_sample_rows = 50;

    let runner = PipelineRunner::new(config.clone()).unwrap();
    let report = runner.run().unwrap();
    assert_eq!(report.cleaned_rows, 3 * 72);
    assert_eq!(report.distribution.total(), 3 * 72);
    assert!(report.distribution.high > 0, "rules or fallback always yield high rows");

    let frame = read_frame_csv(&config.output.resolve(&config.output.features)).unwrap();
    assert_eq!(frame.len(), 3 * 72);
    assert_eq!(frame.width(), report.feature_columns);
    assert!(frame.has_column(label_columns::RISK_LEVEL));
    assert!(frame.has_column("total_risk_score"));
    assert!(frame.has_column("equipment_SUB001_EQ01"));

    // Sorted by (equipment, timestamp)
    for r in 1..frame.len() {
        let prev = (&frame.equipment_ids()[r - 1], frame.timestamps()[r - 1]);
        let cur = (&frame.equipment_ids()[r], frame.timestamps()[r]);
        assert!(prev < cur, "row {r} out of order");
    }

    let sample = read_frame_csv(&config.output.resolve(&config.output.dashboard_sample)).unwrap();
    assert!(!sample.is_empty() && sample.len() <= 53);
    assert!(sample.has_column("temperature") && sample.has_column("vibration"));
    assert!(!frame.has_column("temperature"));
}

#[test]
fn same_seed_same_run() {
    let run = |dir: &std::path::Path| {
        let mut config = GuardianConfig::default();
        config.generation.n_substations = 1;
        config.generation.equipment_per_substation = 2;
        config.generation.hours = 30;
        config.generation.batch_size_hours = 7;
        config.output.data_dir = dir.to_path_buf();
        PipelineRunner::new(config.clone()).unwrap().run().unwrap();
        read_telemetry_csv(&config.output.resolve(&config.output.cleaned)).unwrap()
    };
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    assert_eq!(run(a.path()), run(b.path()));
}
