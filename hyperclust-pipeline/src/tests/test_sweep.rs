use std::fs;

use hyperclust_core::ClusterError;

use super::fixtures::*;
use crate::config::IndexSource;
use crate::records::ResultsTable;
use crate::run_meta::{RunParameters, SIDECAR_FILE};
use crate::sweep::Sweep;
use crate::run_sweep;

const GOOD: &str = "big_sample_k=2_mu=0.1_reg=0.05";

#[test]
fn test_single_run_is_recovered_and_smoothed() {
    crate::init();
    let (_root, mut config) = sweep_root();
    config.write_label_maps = true;
    let dir = run_dir(&config.parent_dir, GOOD, Some(TWO_GROUP_COEFF));

    let sweep = Sweep::prepare(config).unwrap();
    assert_eq!(sweep.run_dirs().len(), 1);

    let evaluation = sweep.evaluate(2, &dir).unwrap();
    assert_eq!(evaluation.record.atoms, 2);
    assert_eq!(evaluation.record.mu, 0.1);
    assert_eq!(evaluation.record.reg, 0.05);
    assert_eq!(evaluation.record.neighbors, 2);
    assert_eq!(evaluation.record.accuracy, 1.0);
    assert_eq!(evaluation.smoothed_accuracy, Some(1.0));

    let learned = fs::read_to_string(dir.join("learned_nn=2.json")).unwrap();
    let grid: Vec<Vec<u32>> = serde_json::from_str(&learned).unwrap();
    assert_eq!(grid, vec![vec![1, 1, 0], vec![2, 2, 0]]);
    assert!(dir.join("smoothed_nn=2.json").is_file());
}

#[test]
fn test_smoothing_only_at_reference_neighbors() {
    let (_root, mut config) = sweep_root();
    config.neighbor_counts = vec![2, 3];
    let dir = run_dir(&config.parent_dir, GOOD, Some(TWO_GROUP_COEFF));

    let sweep = Sweep::prepare(config).unwrap();
    assert_eq!(sweep.evaluate(3, &dir).unwrap().smoothed_accuracy, None);
    assert_eq!(sweep.evaluate(2, &dir).unwrap().smoothed_accuracy, Some(1.0));

    let table = sweep.run().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.smoothed().len(), 1);
    assert_eq!(table.smoothed()[0].record.neighbors, 2);
    let path = sweep.persist(&table).unwrap();
    assert!(path.with_file_name("Or_toy_smoothed.csv").is_file());
}

#[test]
fn test_failing_pairs_are_skipped() {
    crate::init();
    let (_root, mut config) = sweep_root();
    // 5 neighbors on 4 samples cannot form a graph
    config.neighbor_counts = vec![2, 5];
    let parent = config.parent_dir.clone();
    run_dir(&parent, GOOD, Some(TWO_GROUP_COEFF));
    run_dir(&parent, "big_sample_k=3_mu=0.2_reg=0.05", None);
    run_dir(&parent, "big_sample_k=x_mu=0.1_reg=0.05", Some(TWO_GROUP_COEFF));
    run_dir(&parent, "other_k=2_mu=0.1_reg=0.05", Some(TWO_GROUP_COEFF));

    let sweep = Sweep::prepare(config).unwrap();
    assert_eq!(sweep.run_dirs().len(), 3);

    let table = sweep.run().unwrap();
    assert_eq!(table.len(), 6);
    let non_zero: Vec<_> = table.records().iter().filter(|r| !r.is_zero()).collect();
    assert_eq!(non_zero.len(), 1);
    assert_eq!(non_zero[0].neighbors, 2);
    assert_eq!(non_zero[0].accuracy, 1.0);
    // neighbor-major order, directories sorted by name
    assert!(!table.records()[0].is_zero());

    let path = sweep.persist(&table).unwrap();
    assert!(path.ends_with("Or_toy.csv"));
    let saved = ResultsTable::load_csv(&path).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved.records()[0].atoms, 2);
}

#[test]
fn test_run_sweep_end_to_end() {
    let (_root, config) = sweep_root();
    run_dir(&config.parent_dir, GOOD, Some(TWO_GROUP_COEFF));
    run_dir(
        &config.parent_dir,
        "big_sample_k=4_mu=0.3_reg=0.1",
        Some(TWO_GROUP_COEFF),
    );
    let smoothed_path = config.smoothed_results_path();

    let (table, path) = run_sweep(config).unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.records().iter().all(|r| r.accuracy == 1.0));
    assert_eq!(ResultsTable::load_csv(&path).unwrap().len(), 2);

    // both pairs sit at the reference neighbor count with full accuracy
    assert_eq!(table.smoothed().len(), 2);
    assert!(table.smoothed().iter().all(|s| s.smoothed_accuracy == 1.0));
    assert_eq!(table.smoothed()[0].record, table.records()[0]);
    assert!(smoothed_path.ends_with("Or_toy_smoothed.csv"));
    let saved = std::fs::read_to_string(&smoothed_path).unwrap();
    assert_eq!(saved.lines().count(), 3);
}

#[test]
fn test_per_run_index() {
    let (_root, mut config) = sweep_root();
    config.index_source = IndexSource::PerRun;
    let dir = run_dir(&config.parent_dir, GOOD, Some(TWO_GROUP_COEFF));
    // a saved sample draw is accepted as well as a bare list
    write(
        &dir.join("train_index.json"),
        r#"{"rows": [], "indices": [0, 1, 3, 4], "labels_used": [1, 2]}"#,
    );
    let broken = run_dir(
        &config.parent_dir,
        "big_sample_k=5_mu=0.1_reg=0.05",
        Some(TWO_GROUP_COEFF),
    );
    write(&broken.join("train_index.json"), "[0, 1, 3, 99]");

    let sweep = Sweep::prepare(config).unwrap();
    assert_eq!(sweep.evaluate(2, &dir).unwrap().record.accuracy, 1.0);
    assert!(matches!(
        sweep.evaluate(2, &broken),
        Err(ClusterError::Load { .. })
    ));
}

#[test]
fn test_sample_count_mismatch_is_skippable() {
    let (_root, config) = sweep_root();
    let dir = run_dir(
        &config.parent_dir,
        GOOD,
        Some("[[1.0, 0.9, 0.0], [0.0, 0.1, 1.0]]"),
    );
    let sweep = Sweep::prepare(config).unwrap();
    let err = sweep.evaluate(2, &dir).unwrap_err();
    assert!(err.is_skippable(), "{err}");
}

#[test]
fn test_setup_errors_are_fatal() {
    let (root, config) = sweep_root();

    let mut missing_truth = config.clone();
    missing_truth.ground_truth = root.path().join("nope.json");
    assert!(matches!(
        Sweep::prepare(missing_truth),
        Err(ClusterError::Load { .. })
    ));

    let mut missing_index = config.clone();
    missing_index.index_source = IndexSource::Global(root.path().join("nope.json"));
    assert!(Sweep::prepare(missing_index).is_err());

    let mut missing_parent = config;
    missing_parent.parent_dir = root.path().join("no_runs_here");
    assert!(Sweep::prepare(missing_parent).is_err());
}

#[test]
fn test_sidecars_written_on_request() {
    let (_root, mut config) = sweep_root();
    config.write_sidecars = true;
    let dir = run_dir(&config.parent_dir, GOOD, Some(TWO_GROUP_COEFF));
    let unnamed = run_dir(&config.parent_dir, "big_sample_k=_broken", None);

    Sweep::prepare(config).unwrap();
    assert_eq!(
        RunParameters::read_sidecar(&dir).unwrap(),
        Some(RunParameters {
            atoms: 2,
            mu: 0.1,
            reg: 0.05
        })
    );
    assert!(!unnamed.join(SIDECAR_FILE).exists());
}
