use std::fs;
use std::path::PathBuf;

use hyperclust_core::affinity::{NeighborFeatures, Symmetrization};
use tempfile::TempDir;

use crate::config::*;

#[test]
fn test_defaults_follow_the_experiment() {
    let config = SweepConfig::default();
    assert_eq!(config.neighbor_counts, vec![20, 25, 30, 35, 40, 45, 50]);
    assert_eq!(config.n_clusters, 6);
    assert_eq!(config.symmetrization, Symmetrization::Or);
    assert_eq!(config.smoothing_votes, 10);
    assert_eq!(config.smoothing_radius_cap, 40);
    assert_eq!(config.reference_neighbors, 20);
    assert_eq!(config.dir_prefix, "big_sample_k=");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    crate::init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sweep.json");
    fs::write(
        &path,
        r#"{
            "symmetrization": "and",
            "features": "cosine_profiles",
            "index_source": "per_run",
            "sweep_name": "salinas"
        }"#,
    )
    .unwrap();

    let config = SweepConfig::load_json(&path).unwrap();
    assert_eq!(config.symmetrization, Symmetrization::And);
    assert_eq!(config.features, NeighborFeatures::CosineProfiles);
    assert_eq!(config.index_source, IndexSource::PerRun);
    assert_eq!(config.n_clusters, 6);
    assert_eq!(config.results_path(), PathBuf::from(".").join("And_salinas.csv"));
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sweep.json");
    let config = SweepConfig {
        index_source: IndexSource::Global(PathBuf::from("idx.json")),
        seed: Some(4),
        ..Default::default()
    };
    config.save_json(&path).unwrap();
    assert_eq!(SweepConfig::load_json(&path).unwrap(), config);
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        SweepConfig {
            neighbor_counts: vec![],
            ..Default::default()
        },
        SweepConfig {
            neighbor_counts: vec![0, 5],
            ..Default::default()
        },
        SweepConfig {
            n_clusters: 0,
            ..Default::default()
        },
        SweepConfig {
            smoothing_threshold: 1.5,
            ..Default::default()
        },
    ];
    for config in cases {
        assert!(config.validate().is_err(), "{config:?}");
    }
}

#[test]
fn test_smoothing_gate() {
    let config = SweepConfig::default();
    assert!(config.should_smooth(20, 0.6));
    assert!(config.should_smooth(20, 0.9));
    assert!(!config.should_smooth(20, 0.59));
    assert!(!config.should_smooth(25, 0.9));
}
