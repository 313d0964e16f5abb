//! Artifacts of one run directory.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use hyperclust_core::sampling::SampleDraw;
use hyperclust_core::weights::WeightMatrix;
use hyperclust_core::{ClusterError, Result};
use log::debug;
use serde::Deserialize;

pub const WEIGHTS_FILE: &str = "coeff.json";
pub const INDEX_FILE: &str = "train_index.json";

/// Index files are either a bare list or a saved [`SampleDraw`].
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexFile {
    Plain(Vec<usize>),
    Draw(SampleDraw),
}

/// Ordered, unique pixel indices, each below `n_pixels`.
pub fn load_index(path: &Path, n_pixels: usize) -> Result<Vec<usize>> {
    let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;
    let file: IndexFile = serde_json::from_str(&raw).map_err(|e| ClusterError::load(path, e))?;
    let indices = match file {
        IndexFile::Plain(indices) => indices,
        IndexFile::Draw(draw) => draw.indices,
    };

    if let Some(&px) = indices.iter().find(|&&px| px >= n_pixels) {
        return Err(ClusterError::load(
            path,
            format!("pixel {} outside a grid of {} pixels", px, n_pixels),
        ));
    }
    let mut seen = HashSet::with_capacity(indices.len());
    if let Some(&px) = indices.iter().find(|&&px| !seen.insert(px)) {
        return Err(ClusterError::load(path, format!("pixel {} listed twice", px)));
    }
    debug!("Loaded {} sample indices from {:?}", indices.len(), path);
    Ok(indices)
}

pub struct RunArtifacts {
    pub weights: WeightMatrix,
    pub indices: Vec<usize>,
}

impl RunArtifacts {
    /// Weights from `dir`; the index from `dir` unless a shared one is given.
    pub fn load(dir: &Path, shared_index: Option<&[usize]>, n_pixels: usize) -> Result<Self> {
        let weights = WeightMatrix::load_json(&dir.join(WEIGHTS_FILE))?;
        let indices = match shared_index {
            Some(indices) => indices.to_vec(),
            None => load_index(&dir.join(INDEX_FILE), n_pixels)?,
        };
        if indices.len() != weights.n_samples() {
            return Err(ClusterError::load(
                dir,
                format!(
                    "{} weight vectors but {} sample indices",
                    weights.n_samples(),
                    indices.len()
                ),
            ));
        }
        Ok(Self { weights, indices })
    }
}
