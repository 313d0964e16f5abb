//! Parameter sweep over run directories × neighbor counts.
//!
//! Setup (ground truth, shared index, run discovery) fails hard. After that
//! every `(neighbors, directory)` pair is evaluated independently on the
//! rayon pool: affinity → spectral clustering → alignment → optional
//! smoothing. A pair that fails with a skippable error (unreadable run,
//! unparsable name, degenerate graph) leaves an all-zero row, which is
//! stripped when the table is persisted. Any other error aborts the sweep.

use std::fs;
use std::path::{Path, PathBuf};

use hyperclust_core::affinity::AffinityBuilder;
use hyperclust_core::alignment::LabelAligner;
use hyperclust_core::ground_truth::GroundTruth;
use hyperclust_core::smoothing::{grid_accuracy, SpatialSmoother};
use hyperclust_core::spectral::SpectralClustering;
use hyperclust_core::{ClusterError, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::{IndexSource, SweepConfig};
use crate::loader::{load_index, RunArtifacts};
use crate::records::{ParameterRecord, ResultsTable};
use crate::run_meta::{RunParameters, SIDECAR_FILE};

/// Outcome of one `(neighbors, directory)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairEvaluation {
    pub record: ParameterRecord,
    /// Accuracy over the whole footprint after smoothing, when it ran.
    pub smoothed_accuracy: Option<f64>,
}

pub struct Sweep {
    config: SweepConfig,
    truth: GroundTruth,
    mask: Vec<bool>,
    shared_index: Option<Vec<usize>>,
    run_dirs: Vec<PathBuf>,
}

impl Sweep {
    pub fn prepare(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  SWEEP SETUP                                          ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        info!("  • sweep {:?}", config.sweep_name);

        let truth = GroundTruth::load_json(&config.ground_truth, config.remap.clone())?;
        let mask = truth.mask();

        let shared_index = match &config.index_source {
            IndexSource::Global(path) => Some(load_index(path, truth.n_pixels())?),
            IndexSource::PerRun => None,
        };

        let run_dirs = discover(&config.parent_dir, &config.dir_prefix)?;
        info!(
            "  ✓ {} run directories under {:?}, {} neighbor counts",
            run_dirs.len(),
            config.parent_dir,
            config.neighbor_counts.len()
        );

        if config.write_sidecars {
            write_missing_sidecars(&run_dirs);
        }
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  SWEEP SETUP COMPLETE                                 ║");
        info!("╚═══════════════════════════════════════════════════════╝");

        Ok(Self {
            config,
            truth,
            mask,
            shared_index,
            run_dirs,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn truth(&self) -> &GroundTruth {
        &self.truth
    }

    pub fn run_dirs(&self) -> &[PathBuf] {
        &self.run_dirs
    }

    /// Evaluate every pair. Rows come out neighbor-major, directories in
    /// discovery order, skipped pairs as all-zero rows. Pairs that were
    /// smoothed also land in [`ResultsTable::smoothed`].
    pub fn run(&self) -> Result<ResultsTable> {
        let pairs: Vec<(usize, &PathBuf)> = self
            .config
            .neighbor_counts
            .iter()
            .flat_map(|&k| self.run_dirs.iter().map(move |dir| (k, dir)))
            .collect();
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  SWEEP: CLUSTER + ALIGN + SMOOTH                      ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        info!(
            "  • sweep {:?}: {} pairs, rule={}, clusters={}",
            self.config.sweep_name,
            pairs.len(),
            self.config.symmetrization,
            self.config.n_clusters
        );

        let outcomes: Vec<Result<PairEvaluation>> = pairs
            .par_iter()
            .map(|&(neighbors, dir)| self.evaluate(neighbors, dir))
            .collect();

        let mut table = ResultsTable::new();
        let mut skipped = 0usize;
        for ((neighbors, dir), outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Ok(evaluation) => {
                    table.push(evaluation.record);
                    if let Some(accuracy) = evaluation.smoothed_accuracy {
                        table.push_smoothed(evaluation.record, accuracy);
                    }
                }
                Err(e) if e.is_skippable() => {
                    warn!("Skipping {:?} at NN={}: {}", dir, neighbors, e);
                    skipped += 1;
                    table.push(ParameterRecord::default());
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "  ✓ {} pairs evaluated, {} skipped",
            pairs.len() - skipped,
            skipped
        );
        info!("  • {} pairs smoothed", table.smoothed().len());
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  SWEEP COMPLETE                                       ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        Ok(table)
    }

    /// Strip all-zero rows and write the table; returns the file written.
    /// Smoothed scores, when any pair passed the gate, go to a second file
    /// next to it.
    pub fn persist(&self, table: &ResultsTable) -> Result<PathBuf> {
        let mut table = table.clone();
        let removed = table.strip_zero_rows();
        debug!("Stripped {} all-zero rows", removed);

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| ClusterError::load(&self.config.output_dir, e))?;
        let path = self.config.results_path();
        table.save_csv(&path)?;
        if !table.smoothed().is_empty() {
            table.save_smoothed_csv(&self.config.smoothed_results_path())?;
        }
        info!("{}", table.summary());
        Ok(path)
    }

    pub fn evaluate(&self, neighbors: usize, dir: &Path) -> Result<PairEvaluation> {
        let params = RunParameters::resolve(dir)?;
        let artifacts = RunArtifacts::load(dir, self.shared_index.as_deref(), self.truth.n_pixels())?;

        let n_samples = artifacts.weights.n_samples();
        if neighbors > n_samples {
            return Err(ClusterError::DegenerateGraph(format!(
                "{} neighbors requested for {} samples",
                neighbors, n_samples
            )));
        }

        let affinity = AffinityBuilder::new(self.config.affinity(neighbors)).build(&artifacts.weights)?;
        let clustering = SpectralClustering::new(self.config.spectral())
            .cluster(&affinity.matrix, self.config.n_clusters)?;
        let alignment = LabelAligner.align(&clustering.labels, &artifacts.indices, &self.truth)?;

        info!(
            "atoms={} mu={} reg={} NN={} | acc={:.4}",
            params.atoms, params.mu, params.reg, neighbors, alignment.accuracy
        );

        let learned = alignment.scatter(self.truth.rows(), self.truth.cols(), &artifacts.indices)?;
        if self.config.write_label_maps {
            learned.save_json(&dir.join(format!("learned_nn={}.json", neighbors)))?;
        }

        let mut smoothed_accuracy = None;
        if self.config.should_smooth(neighbors, alignment.accuracy) {
            let smoothed = SpatialSmoother::new(self.config.smoothing()).smooth(&learned, &self.mask)?;
            let accuracy = grid_accuracy(&smoothed, &self.truth)?;
            info!(
                "  • smoothed atoms={} mu={} reg={} NN={} | acc={:.4}",
                params.atoms, params.mu, params.reg, neighbors, accuracy
            );
            if self.config.write_label_maps {
                smoothed.save_json(&dir.join(format!("smoothed_nn={}.json", neighbors)))?;
            }
            smoothed_accuracy = Some(accuracy);
        }

        Ok(PairEvaluation {
            record: ParameterRecord::new(params, neighbors, alignment.accuracy),
            smoothed_accuracy,
        })
    }
}

/// Child directories of `parent` whose name contains `prefix`, sorted by name.
fn discover(parent: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(parent).map_err(|e| ClusterError::load(parent, e))?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(prefix))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn write_missing_sidecars(run_dirs: &[PathBuf]) {
    for dir in run_dirs {
        if dir.join(SIDECAR_FILE).is_file() {
            continue;
        }
        let written = RunParameters::resolve(dir).and_then(|params| params.write_sidecar(dir));
        match written {
            Ok(path) => debug!("  • wrote {:?}", path),
            Err(e) => warn!("No sidecar for {:?}: {}", dir, e),
        }
    }
}
