//! Normalized spectral clustering of an affinity graph.
//!
//! Pipeline position: A[N, N] → L_sym[N, N] → embedding [N, c] → labels [N].
//!
//! * Degrees exclude the self-loop: `d_i = Σ_j A[i, j] − A[i, i]`. A node
//!   whose only neighbor is itself makes the graph non-clusterable and is
//!   reported as [`ClusterError::DegenerateGraph`].
//! * `L_sym = I − D^{-½} A D^{-½}` keeps the self-loop in `A`.
//! * The embedding takes the `c` eigenvectors with the smallest eigenvalues,
//!   **including** the first one (no trivial-eigenvector skip).
//! * Rows of the embedding are scaled to unit length before k-means.
//!
//! The eigensolver reads the lower triangle only, so a directed (`None`
//! symmetrization) graph is clustered through its lower triangle.

use log::{debug, info};
use nalgebra::{DMatrix, SymmetricEigen};
use sprs::CsMat;

use crate::error::{ClusterError, Result};
use crate::kmeans::{KMeans, KMeansConfig};

const DEGREE_FLOOR: f64 = 1e-12;
const ROW_NORM_FLOOR: f64 = 1e-12;
const EIGEN_SWEEPS_PER_ROW: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct SpectralConfig {
    /// k-means settings; `n_clusters` is overridden per call.
    pub kmeans: KMeansConfig,
}

impl SpectralConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            kmeans: KMeansConfig {
                seed: Some(seed),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpectralOutput {
    /// Raw cluster IDs in `0..n_clusters`, no semantic meaning.
    pub labels: Vec<usize>,
    /// Eigenvalues of the kept eigenvectors, ascending.
    pub eigenvalues: Vec<f64>,
    pub inertia: f64,
}

pub struct SpectralClustering {
    pub config: SpectralConfig,
}

impl SpectralClustering {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SpectralConfig::default())
    }

    pub fn cluster(&self, affinity: &CsMat<f64>, n_clusters: usize) -> Result<SpectralOutput> {
        let (n, m) = affinity.shape();
        if n != m {
            return Err(ClusterError::InvalidInput(format!(
                "affinity must be square, got {}x{}",
                n, m
            )));
        }
        if n_clusters == 0 || n_clusters > n {
            return Err(ClusterError::DegenerateGraph(format!(
                "cannot split {} nodes into {} clusters",
                n, n_clusters
            )));
        }

        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 2: SPECTRAL CLUSTERING                         ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        info!(
            "Spectral clustering: N={}, nnz={}, clusters={}",
            n,
            affinity.nnz(),
            n_clusters
        );

        let laplacian = normalized_laplacian(affinity)?;
        let (eigenvalues, embedding) = smallest_eigenvectors(laplacian, n_clusters)?;
        debug!("  • smallest eigenvalues: {:?}", eigenvalues);

        let rows = normalize_rows(&embedding, n, n_clusters)?;

        let kmeans = KMeans::new(KMeansConfig {
            n_clusters,
            ..self.config.kmeans.clone()
        });
        let fit = kmeans.fit(&rows)?;

        info!("  ✓ {} nodes clustered, inertia={:.6}", n, fit.inertia);
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 2 COMPLETE                                     ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        Ok(SpectralOutput {
            labels: fit.labels,
            eigenvalues,
            inertia: fit.inertia,
        })
    }
}

/// `I − D^{-½} A D^{-½}` with degrees that leave out the diagonal.
pub fn normalized_laplacian(affinity: &CsMat<f64>) -> Result<DMatrix<f64>> {
    let n = affinity.rows();

    let mut degrees = vec![0.0f64; n];
    for (&v, (i, j)) in affinity.iter() {
        if i != j {
            degrees[i] += v;
        }
    }

    if let Some((node, d)) = degrees
        .iter()
        .enumerate()
        .find(|&(_, &d)| d <= DEGREE_FLOOR || !d.is_finite())
    {
        return Err(ClusterError::DegenerateGraph(format!(
            "node {} has degree {} outside its self-loop",
            node, d
        )));
    }

    let d_inv_sqrt: Vec<f64> = degrees.iter().map(|d| 1.0 / d.sqrt()).collect();

    let mut laplacian = DMatrix::<f64>::identity(n, n);
    for (&v, (i, j)) in affinity.iter() {
        laplacian[(i, j)] -= d_inv_sqrt[i] * v * d_inv_sqrt[j];
    }
    Ok(laplacian)
}

/// Full symmetric eigendecomposition; returns the `c` smallest eigenvalues
/// and their eigenvectors as columns of an [N, c] matrix.
fn smallest_eigenvectors(laplacian: DMatrix<f64>, c: usize) -> Result<(Vec<f64>, DMatrix<f64>)> {
    let n = laplacian.nrows();
    let eigen = SymmetricEigen::try_new(laplacian, f64::EPSILON, EIGEN_SWEEPS_PER_ROW * n.max(1))
        .ok_or_else(|| ClusterError::DegenerateGraph("eigensolver did not converge".into()))?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let mut values = Vec::with_capacity(c);
    let mut embedding = DMatrix::<f64>::zeros(n, c);
    for (k, &col) in order.iter().take(c).enumerate() {
        let value = eigen.eigenvalues[col];
        if !value.is_finite() {
            return Err(ClusterError::DegenerateGraph(format!(
                "non-finite eigenvalue at position {}",
                k
            )));
        }
        values.push(value);
        for row in 0..n {
            embedding[(row, k)] = eigen.eigenvectors[(row, col)];
        }
    }
    Ok((values, embedding))
}

fn normalize_rows(embedding: &DMatrix<f64>, n: usize, c: usize) -> Result<Vec<Vec<f64>>> {
    (0..n)
        .map(|row| {
            let v: Vec<f64> = (0..c).map(|k| embedding[(row, k)]).collect();
            let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm <= ROW_NORM_FLOOR || !norm.is_finite() {
                return Err(ClusterError::DegenerateGraph(format!(
                    "embedding row {} has norm {}",
                    row, norm
                )));
            }
            Ok(v.into_iter().map(|x| x / norm).collect())
        })
        .collect()
}
