//! Sweep configuration.
//!
//! Every field has a default, so a JSON file only needs to list what differs:
//!
//! ```json
//! { "parent_dir": "runs", "symmetrization": "and", "sweep_name": "salinas" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use hyperclust_core::affinity::{AffinityConfig, NeighborFeatures, Symmetrization};
use hyperclust_core::ground_truth::LabelRemap;
use hyperclust_core::smoothing::SmoothingConfig;
use hyperclust_core::spectral::SpectralConfig;
use hyperclust_core::{ClusterError, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::records::ResultsTable;

/// Where the sample index of a run comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    /// One index file shared by every run.
    Global(PathBuf),
    /// `train_index.json` inside each run directory.
    PerRun,
}

impl Default for IndexSource {
    fn default() -> Self {
        IndexSource::Global(PathBuf::from("common_index.json"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Directory whose children are the dictionary-learning runs.
    pub parent_dir: PathBuf,
    /// Only children whose name contains this are evaluated.
    pub dir_prefix: String,
    pub neighbor_counts: Vec<usize>,
    pub n_clusters: usize,
    pub symmetrization: Symmetrization,
    pub features: NeighborFeatures,

    /// Ground-truth grid, JSON list of rows of raw class IDs.
    pub ground_truth: PathBuf,
    /// Raw → compact class mapping; derived from the ground truth when absent.
    pub remap: Option<LabelRemap>,
    pub index_source: IndexSource,

    pub smoothing_votes: usize,
    pub smoothing_radius_cap: usize,
    /// Minimum alignment accuracy before a run is smoothed.
    pub smoothing_threshold: f64,
    /// Neighbor count at which smoothing runs.
    pub reference_neighbors: usize,

    pub sweep_name: String,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
    /// Write learned and smoothed label grids into each run directory.
    pub write_label_maps: bool,
    /// Write `run.json` into run directories that only carry their
    /// parameters in the name.
    pub write_sidecars: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parent_dir: PathBuf::from("."),
            dir_prefix: "big_sample_k=".to_string(),
            neighbor_counts: vec![20, 25, 30, 35, 40, 45, 50],
            n_clusters: 6,
            symmetrization: Symmetrization::Or,
            features: NeighborFeatures::UnitColumns,
            ground_truth: PathBuf::from("gt.json"),
            remap: None,
            index_source: IndexSource::default(),
            smoothing_votes: 10,
            smoothing_radius_cap: 40,
            smoothing_threshold: 0.6,
            reference_neighbors: 20,
            sweep_name: "sweep".to_string(),
            output_dir: PathBuf::from("."),
            seed: None,
            write_label_maps: false,
            write_sidecars: false,
        }
    }
}

impl SweepConfig {
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| ClusterError::load(path, e))?;
        info!("Loaded sweep config {:?} from {:?}", config.sweep_name, path);
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        fs::write(path, raw).map_err(|e| ClusterError::load(path, e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.neighbor_counts.is_empty() || self.neighbor_counts.contains(&0) {
            return Err(ClusterError::InvalidInput(format!(
                "neighbor counts must be positive and non-empty, got {:?}",
                self.neighbor_counts
            )));
        }
        if self.n_clusters == 0 {
            return Err(ClusterError::InvalidInput("n_clusters must be positive".into()));
        }
        if self.smoothing_votes == 0 {
            return Err(ClusterError::InvalidInput("smoothing_votes must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.smoothing_threshold) {
            return Err(ClusterError::InvalidInput(format!(
                "smoothing_threshold {} outside [0, 1]",
                self.smoothing_threshold
            )));
        }
        if self.sweep_name.is_empty() {
            return Err(ClusterError::InvalidInput("sweep_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn affinity(&self, k_neighbors: usize) -> AffinityConfig {
        AffinityConfig {
            k_neighbors,
            symmetrization: self.symmetrization,
            features: self.features,
        }
    }

    pub fn spectral(&self) -> SpectralConfig {
        match self.seed {
            Some(seed) => SpectralConfig::seeded(seed),
            None => SpectralConfig::default(),
        }
    }

    pub fn smoothing(&self) -> SmoothingConfig {
        SmoothingConfig {
            votes: self.smoothing_votes,
            radius_cap: self.smoothing_radius_cap,
        }
    }

    /// `<Constraint>_<sweep_name>.csv` under `output_dir`.
    pub fn results_path(&self) -> PathBuf {
        self.output_dir
            .join(ResultsTable::file_name(self.symmetrization, &self.sweep_name))
    }

    /// `<Constraint>_<sweep_name>_smoothed.csv` under `output_dir`.
    pub fn smoothed_results_path(&self) -> PathBuf {
        self.output_dir
            .join(ResultsTable::smoothed_file_name(self.symmetrization, &self.sweep_name))
    }

    /// Smoothing runs only for good runs at the reference neighbor count.
    pub fn should_smooth(&self, neighbors: usize, accuracy: f64) -> bool {
        neighbors == self.reference_neighbors && accuracy >= self.smoothing_threshold
    }
}
