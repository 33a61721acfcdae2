//! Feature Isolation Tests
//!
//! Per-unit features must depend only on that unit's own rows, in time
//! order, regardless of how the input table happens to be ordered.

use chrono::{NaiveDate, TimeDelta};
use grid_guardian::config::GuardianConfig;
use grid_guardian::features::{FeatureEngineer, FeatureOutcome};
use grid_guardian::generator::{equipment_ids, TelemetryGenerator};
use grid_guardian::labeling::RiskLabeler;
use grid_guardian::types::{EquipmentId, SensorChannel, TelemetryRecord, TelemetryTable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn generated(units: usize, hours: usize) -> (TelemetryTable, Vec<EquipmentId>) {
    let mut config = GuardianConfig::default().generation;
    config.n_substations = 1;
    config.equipment_per_substation = units;
    config.hours = hours;
    config.batch_size_hours = 10;
    config.degradation_probability = 0.5;
    config.onset_min_hours = 5;
    config.onset_max_hours = 20;
    let ids = equipment_ids(1, units);
    let (table, _) = TelemetryGenerator::new(&config)
        .unwrap()
        .generate_table(&ids)
        .unwrap();
    (table, ids)
}

fn engineer(table: &TelemetryTable) -> FeatureOutcome {
    FeatureEngineer::new(&GuardianConfig::default().features)
        .unwrap()
        .engineer(table)
        .unwrap()
}

#[test]
fn input_order_does_not_change_features() {
    let (table, _) = generated(3, 40);
    let mut order: Vec<usize> = (0..table.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(3));

    let shuffled = table.select_rows(&order);
    assert_ne!(shuffled, table);
    assert_eq!(engineer(&shuffled).frame, engineer(&table).frame);
}

#[test]
fn neighbours_do_not_leak_into_a_units_features() {
    let (fleet, ids) = generated(2, 36);
    let target = &ids[0];
    let own_rows: Vec<usize> = (0..fleet.len())
        .filter(|&r| &fleet.equipment_ids()[r] == target)
        .collect();

    let alone = engineer(&fleet.select_rows(&own_rows)).frame;
    let together = engineer(&fleet).frame;
    let together_rows: Vec<usize> = (0..together.len())
        .filter(|&r| &together.equipment_ids()[r] == target)
        .collect();
    let together = together.select_rows(&together_rows);

    assert_eq!(alone.len(), together.len());
    assert_eq!(alone.timestamps(), together.timestamps());
    for column in alone.columns() {
        let other = together
            .column(&column.name)
            .unwrap_or_else(|| panic!("{} missing from fleet frame", column.name));
        assert_eq!(column.values.as_slice(), other, "{} leaks across units", column.name);
    }
}

#[test]
fn first_row_of_each_unit_has_no_history() {
    let (table, ids) = generated(2, 12);
    let frame = engineer(&table).frame;
    let lag = frame.column("temperature_top_lag_1").unwrap();
    let roc = frame.column("temperature_top_roc").unwrap();
    let top = frame.channel(SensorChannel::TemperatureTop).unwrap();
    let rolling_max = frame.column("temperature_top_rolling_max_24h").unwrap();

    for id in &ids {
        let first = (0..frame.len())
            .find(|&r| &frame.equipment_ids()[r] == id)
            .unwrap();
        assert_eq!(lag[first], 0.0);
        assert_eq!(roc[first], 0.0);
        assert_eq!(rolling_max[first], top[first]);
    }
}

#[test]
fn labels_pass_through_feature_engineering_unchanged() {
    let (table, _) = generated(2, 30);
    let labeled = RiskLabeler::new(&GuardianConfig::default())
        .label(table)
        .unwrap()
        .table;
    let frame = engineer(&labeled).frame;
    let sorted_levels: Vec<f64> = {
        let order = labeled.groups().order().to_vec();
        let labels = labeled.labels().unwrap();
        order
            .iter()
            .map(|&r| f64::from(labels.risk_level[r].as_u8()))
            .collect()
    };
    assert_eq!(frame.column("risk_level").unwrap(), sorted_levels.as_slice());
}

#[test]
fn rolling_windows_count_rows_not_hours() {
    let t0 = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    let id = EquipmentId::new(1, 1);
    let table: TelemetryTable = [(0, 10.0), (1, 20.0), (5, 30.0)]
        .into_iter()
        .map(|(h, v)| {
            let mut readings = [1.0; SensorChannel::COUNT];
            readings[SensorChannel::TemperatureTop.index()] = v;
            TelemetryRecord {
                timestamp: t0 + TimeDelta::hours(h),
                equipment_id: id.clone(),
                readings,
            }
        })
        .collect();
    let frame = engineer(&table).frame;
    assert_eq!(
        frame.column("temperature_top_rolling_mean_3h").unwrap(),
        &[10.0, 15.0, 20.0]
    );
}
