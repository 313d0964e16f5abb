//! # hyperclust-pipeline
//!
//! Evaluation sweep over a directory of dictionary-learning runs. Each run
//! directory holds the learned weights (`coeff.json`) and optionally its own
//! sample index (`train_index.json`); its parameters come from a `run.json`
//! sidecar or from the directory name. For every neighbor count and run the
//! sweep clusters the weights, scores the clustering against ground truth
//! and records `(mu, atoms, reg, neighbors, accuracy)`.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use hyperclust_pipeline::{run_sweep, SweepConfig};
//!
//! let config = SweepConfig::load_json(Path::new("sweep.json"))?;
//! let (table, path) = run_sweep(config)?;
//! println!("{} -> {:?}", table.summary(), path);
//! # Ok::<(), hyperclust_core::ClusterError>(())
//! ```

pub mod config;
pub mod loader;
pub mod records;
pub mod run_meta;
pub mod sweep;

use std::path::PathBuf;

pub use config::{IndexSource, SweepConfig};
pub use records::{ParameterRecord, ResultsTable, SmoothedScore};
pub use run_meta::RunParameters;
pub use sweep::{PairEvaluation, Sweep};

use hyperclust_core::Result;

/// Prepare, run and persist in one call.
pub fn run_sweep(config: SweepConfig) -> Result<(ResultsTable, PathBuf)> {
    let sweep = Sweep::prepare(config)?;
    let table = sweep.run()?;
    let path = sweep.persist(&table)?;
    Ok((table, path))
}

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
