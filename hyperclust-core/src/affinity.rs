//! k-nearest-neighbor connectivity graph over weight vectors.
//!
//! Pipeline position: weights [atoms, N] → A[N, N] 0/1 affinity.
//!
//! Each sample lists itself plus its `k - 1` nearest samples (Euclidean, on
//! unit-normalised weight vectors). Only membership is stored, never rank or
//! distance, so equidistant neighbors are resolved by index and nothing
//! downstream depends on that order.
//!
//! | rule | entry `A[i, j]` | effect |
//! | :-- | :-- | :-- |
//! | `None` | `raw[i, j]` | directed, not symmetric |
//! | `And` | `raw[i, j] · raw[j, i]` | mutual neighbors, sparser, higher precision |
//! | `Or` | `ceil((raw[i, j] + raw[j, i]) / 2)` | either direction, denser, higher recall |
//!
//! The diagonal is always 1.

use std::fmt;

use dashmap::DashMap;
use log::{debug, info, trace};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{ClusterError, Result};
use crate::weights::WeightMatrix;

/// Symmetrization applied to the directed k-NN graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symmetrization {
    None,
    And,
    #[default]
    Or,
}

impl fmt::Display for Symmetrization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symmetrization::None => write!(f, "None"),
            Symmetrization::And => write!(f, "And"),
            Symmetrization::Or => write!(f, "Or"),
        }
    }
}

/// Feature space the neighbor search runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborFeatures {
    /// Unit-L2 weight vectors.
    #[default]
    UnitColumns,
    /// Rows of the cosine Gram matrix `UᵀU` of the unit weight vectors, i.e.
    /// each sample described by its similarity to every other sample.
    CosineProfiles,
}

#[derive(Debug, Clone)]
pub struct AffinityConfig {
    /// Neighbors per sample, self included.
    pub k_neighbors: usize,
    pub symmetrization: Symmetrization,
    pub features: NeighborFeatures,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 20,
            symmetrization: Symmetrization::Or,
            features: NeighborFeatures::UnitColumns,
        }
    }
}

impl AffinityConfig {
    pub fn new(k_neighbors: usize, symmetrization: Symmetrization) -> Self {
        Self {
            k_neighbors,
            symmetrization,
            ..Default::default()
        }
    }
}

/// Output of the affinity stage.
pub struct AffinityOutput {
    /// 0/1 affinity [N, N].
    pub matrix: CsMat<f64>,
    pub n_samples: usize,
    /// Edges of the directed k-NN graph before symmetrization (self included).
    pub directed_edges: usize,
    pub nnz: usize,
}

impl AffinityOutput {
    pub fn summary(&self) -> String {
        format!(
            "AffinityOutput: N={}, directed={}, nnz={}, density={:.2}%",
            self.n_samples,
            self.directed_edges,
            self.nnz,
            100.0 * self.nnz as f64 / (self.n_samples * self.n_samples).max(1) as f64
        )
    }

    pub fn is_symmetric(&self) -> bool {
        self.matrix
            .iter()
            .all(|(&v, (i, j))| self.matrix.get(j, i).copied().unwrap_or(0.0) == v)
    }
}

pub struct AffinityBuilder {
    pub config: AffinityConfig,
}

impl AffinityBuilder {
    pub fn new(config: AffinityConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, weights: &WeightMatrix) -> Result<AffinityOutput> {
        let n = weights.n_samples();
        let k = self.config.k_neighbors;
        if k == 0 || k > n {
            return Err(ClusterError::InvalidInput(format!(
                "k_neighbors={} must be in 1..={} samples",
                k, n
            )));
        }

        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 1: AFFINITY GRAPH                              ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        info!(
            "Affinity: {} samples x {} atoms, k={}, rule={}, features={:?}",
            n,
            weights.n_atoms(),
            k,
            self.config.symmetrization,
            self.config.features
        );

        let features = match self.config.features {
            NeighborFeatures::UnitColumns => weights.unit_samples(),
            NeighborFeatures::CosineProfiles => cosine_profiles(&weights.unit_samples()),
        };

        let edges = knn_edges(&features, k);
        debug!("  • {} directed edges before symmetrization", edges.len());

        let matrix = symmetrise(&edges, n, self.config.symmetrization);
        let output = AffinityOutput {
            nnz: matrix.nnz(),
            matrix,
            n_samples: n,
            directed_edges: edges.len(),
        };
        info!("  ✓ {}", output.summary());
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 1 COMPLETE                                     ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        Ok(output)
    }
}

fn cosine_profiles(unit: &[Vec<f64>]) -> Vec<Vec<f64>> {
    unit.par_iter()
        .map(|a| {
            unit.iter()
                .map(|b| a.iter().zip(b).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect()
}

/// Directed k-NN edges `(i, j)`: `i` itself first, then its `k - 1` closest.
fn knn_edges(features: &[Vec<f64>], k: usize) -> Vec<(usize, usize)> {
    features
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, fi)| {
            let mut scored: Vec<(OrderedFloat<f64>, usize)> = features
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, fj)| {
                    let d2: f64 = fi.iter().zip(fj).map(|(a, b)| (a - b) * (a - b)).sum();
                    (OrderedFloat(d2), j)
                })
                .collect();
            scored.sort_unstable();
            scored.truncate(k - 1);

            if i % 500 == 0 {
                trace!("Sample {}: farthest kept neighbor d²={:?}", i, scored.last());
            }

            std::iter::once((i, i)).chain(scored.into_iter().map(move |(_, j)| (i, j)))
        })
        .collect()
}

fn symmetrise(edges: &[(usize, usize)], n: usize, rule: Symmetrization) -> CsMat<f64> {
    let mut tri = TriMat::new((n, n));

    if rule == Symmetrization::None {
        for &(i, j) in edges {
            tri.add_triplet(i, j, 1.0);
        }
        return tri.to_csr();
    }

    // canonical key (min, max) → number of directions it was listed in
    let undirected: DashMap<(usize, usize), u8> = DashMap::new();
    edges.par_iter().for_each(|&(i, j)| {
        if i == j {
            undirected.insert((i, i), 2);
            return;
        }
        let key = if i < j { (i, j) } else { (j, i) };
        undirected.entry(key).and_modify(|c| *c += 1).or_insert(1);
    });

    for entry in undirected.iter() {
        let (i, j) = *entry.key();
        let keep = match rule {
            Symmetrization::And => *entry.value() >= 2,
            _ => true,
        };
        if !keep {
            continue;
        }
        tri.add_triplet(i, j, 1.0);
        if i != j {
            tri.add_triplet(j, i, 1.0);
        }
    }

    tri.to_csr()
}

/// Row-major dense copy, handy for small graphs and diagnostics.
pub fn to_dense(matrix: &CsMat<f64>) -> Vec<Vec<f64>> {
    let (rows, cols) = matrix.shape();
    let mut dense = vec![vec![0.0; cols]; rows];
    for (&v, (i, j)) in matrix.iter() {
        dense[i][j] = v;
    }
    dense
}
