//! Weight matrix produced by the dictionary-learning optimizer.
//!
//! Layout follows the optimizer: rows are atoms, columns are samples, so
//! column `j` is the mixture of sample `j` over the learned atoms.

use std::fs;
use std::path::Path;

use log::debug;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ClusterError, Result};

#[derive(Debug, Clone)]
pub struct WeightMatrix {
    matrix: DenseMatrix<f64>,
}

impl WeightMatrix {
    pub fn new(matrix: DenseMatrix<f64>) -> Self {
        Self { matrix }
    }

    /// Build from atom rows, `rows[a][j]` = weight of atom `a` in sample `j`.
    pub fn from_atom_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_atoms = rows.len();
        let n_samples = rows.first().map(|r| r.len()).unwrap_or(0);
        if n_atoms == 0 || n_samples == 0 {
            return Err(ClusterError::InvalidInput("empty weight matrix".into()));
        }
        if rows.iter().any(|r| r.len() != n_samples) {
            return Err(ClusterError::Parse(
                "weight matrix rows have different lengths".into(),
            ));
        }

        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        let matrix = DenseMatrix::new(n_atoms, n_samples, values, false)
            .map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        Ok(Self { matrix })
    }

    /// Build from per-sample weight vectors (one vector per column).
    pub fn from_samples(samples: &[Vec<f64>]) -> Result<Self> {
        let n_samples = samples.len();
        let n_atoms = samples.first().map(|s| s.len()).unwrap_or(0);
        if n_samples == 0 || n_atoms == 0 {
            return Err(ClusterError::InvalidInput("empty weight matrix".into()));
        }
        if samples.iter().any(|s| s.len() != n_atoms) {
            return Err(ClusterError::Parse(
                "weight vectors have different lengths".into(),
            ));
        }

        let values: Vec<f64> = samples.iter().flatten().copied().collect();
        // samples are contiguous per column
        let matrix = DenseMatrix::new(n_atoms, n_samples, values, true)
            .map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        Ok(Self { matrix })
    }

    /// Load a JSON list of atom rows (`coeff.json`).
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;
        let rows: Vec<Vec<f64>> =
            serde_json::from_str(&raw).map_err(|e| ClusterError::load(path, e))?;
        let weights = Self::from_atom_rows(&rows).map_err(|e| ClusterError::load(path, e))?;
        debug!(
            "Loaded weights {} atoms x {} samples from {:?}",
            weights.n_atoms(),
            weights.n_samples(),
            path
        );
        Ok(weights)
    }

    pub fn n_atoms(&self) -> usize {
        self.matrix.shape().0
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.shape().1
    }

    pub fn get(&self, atom: usize, sample: usize) -> f64 {
        *self.matrix.get((atom, sample))
    }

    pub fn sample(&self, j: usize) -> Vec<f64> {
        (0..self.n_atoms()).map(|a| self.get(a, j)).collect()
    }

    /// Every sample scaled to unit L2 norm; all-zero samples stay zero.
    pub fn unit_samples(&self) -> Vec<Vec<f64>> {
        (0..self.n_samples())
            .map(|j| {
                let mut v = self.sample(j);
                let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    v.iter_mut().for_each(|x| *x /= norm);
                }
                v
            })
            .collect()
    }

    pub fn matrix(&self) -> &DenseMatrix<f64> {
        &self.matrix
    }
}
