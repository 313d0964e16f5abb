//! On-disk sweep layouts for the pipeline tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::{IndexSource, SweepConfig};

/// Two atoms, four samples: samples 0/1 lean on atom 0, samples 2/3 on atom 1.
pub const TWO_GROUP_COEFF: &str = "[[1.0, 0.9, 0.0, 0.1], [0.0, 0.1, 1.0, 0.9]]";

/// 2x3 scene, last column unlabeled; samples sit at pixels 0, 1, 3, 4.
pub const GROUND_TRUTH: &str = "[[1, 1, 0], [2, 2, 0]]";
pub const COMMON_INDEX: &str = "[0, 1, 3, 4]";

pub fn write(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

pub fn run_dir(parent: &Path, name: &str, coeff: Option<&str>) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(&dir).unwrap();
    if let Some(coeff) = coeff {
        write(&dir.join("coeff.json"), coeff);
    }
    dir
}

/// Ground truth and shared index in `root`, runs under `root/runs`.
pub fn sweep_root() -> (TempDir, SweepConfig) {
    let root = TempDir::new().unwrap();
    let runs = root.path().join("runs");
    fs::create_dir_all(&runs).unwrap();
    write(&root.path().join("gt.json"), GROUND_TRUTH);
    write(&root.path().join("common_index.json"), COMMON_INDEX);

    let config = SweepConfig {
        parent_dir: runs,
        neighbor_counts: vec![2],
        n_clusters: 2,
        ground_truth: root.path().join("gt.json"),
        index_source: IndexSource::Global(root.path().join("common_index.json")),
        reference_neighbors: 2,
        sweep_name: "toy".to_string(),
        output_dir: root.path().join("out"),
        seed: Some(0),
        ..Default::default()
    };
    (root, config)
}
