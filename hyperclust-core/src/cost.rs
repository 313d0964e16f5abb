//! Ground-distance (cost) matrix between spectral channels.
//!
//! Each channel has a scalar descriptor (its wavelength). The cost between
//! channels `i` and `j` is `|d_i - d_j|^p`, rescaled by `0.1 * max` so the
//! entropic kernel `exp(-C / reg)` used downstream stays well conditioned.

use std::fs;
use std::path::Path;

use log::{debug, info};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ClusterError, Result};

/// Column holding the wavelength in the channel descriptor file.
pub const DEFAULT_DESCRIPTOR_COLUMN: usize = 2;

const RESCALE_FACTOR: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct CostMatrix {
    pub matrix: DenseMatrix<f64>,
    pub power: f64,
}

impl CostMatrix {
    pub fn from_descriptors(descriptors: &[f64], power: f64) -> Result<Self> {
        let n = descriptors.len();
        if n == 0 {
            return Err(ClusterError::InvalidInput("no channel descriptors".into()));
        }

        let mut values = Vec::with_capacity(n * n);
        for &di in descriptors {
            for &dj in descriptors {
                values.push((di - dj).abs().powf(power));
            }
        }

        let max = values.iter().copied().fold(0.0_f64, f64::max);
        if max > 0.0 {
            let scale = max * RESCALE_FACTOR;
            values.iter_mut().for_each(|v| *v /= scale);
        }

        let matrix = DenseMatrix::new(n, n, values, false)
            .map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        debug!("Cost matrix {}x{} (L^{}), max before rescale {:.4}", n, n, power, max);

        Ok(Self { matrix, power })
    }

    /// Read descriptors from a comma-separated file, one channel per line.
    pub fn from_csv(path: &Path, column: usize, power: f64) -> Result<Self> {
        let descriptors = read_descriptor_column(path, column)?;
        info!(
            "Building cost matrix from {} channel descriptors in {:?}",
            descriptors.len(),
            path
        );
        Self::from_descriptors(&descriptors, power)
    }

    pub fn size(&self) -> usize {
        self.matrix.shape().0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        *self.matrix.get((i, j))
    }
}

fn read_descriptor_column(path: &Path, column: usize) -> Result<Vec<f64>> {
    let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;

    let mut descriptors = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cell = line.split(',').nth(column).ok_or_else(|| {
            ClusterError::Parse(format!(
                "{}:{}: missing column {}",
                path.display(),
                line_no + 1,
                column
            ))
        })?;
        let value: f64 = cell.trim().parse().map_err(|_| {
            ClusterError::Parse(format!(
                "{}:{}: non-numeric descriptor {:?}",
                path.display(),
                line_no + 1,
                cell.trim()
            ))
        })?;
        descriptors.push(value);
    }

    if descriptors.is_empty() {
        return Err(ClusterError::Parse(format!(
            "{}: no descriptor rows",
            path.display()
        )));
    }
    Ok(descriptors)
}
