//! Cluster-to-class alignment and accuracy.
//!
//! Spectral clustering hands out arbitrary IDs. To score them, every cluster
//! is matched to at most one ground-truth class by maximising the total
//! agreement in the confusion matrix `C[class][cluster]`, i.e. minimising
//! `max(C) − C` with a Hungarian solver. The matrix is rectangular whenever
//! the number of clusters differs from the number of classes present;
//! clusters left without a class map to 0 and count as errors.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::error::{ClusterError, Result};
use crate::ground_truth::{GridLabelMap, GroundTruth};

#[derive(Debug, Clone)]
pub struct Alignment {
    /// Per-sample class after remapping; 0 for clusters with no class.
    pub labels: Vec<u32>,
    /// Ground truth at the sampled pixels.
    pub truth: Vec<u32>,
    pub accuracy: f64,
    /// Distinct ground-truth classes, ascending (confusion rows).
    pub classes: Vec<u32>,
    /// Distinct raw cluster IDs, ascending (confusion columns).
    pub clusters: Vec<usize>,
    pub confusion: Vec<Vec<u64>>,
    /// Raw cluster ID → class.
    pub mapping: BTreeMap<usize, u32>,
}

impl Alignment {
    /// Scatter the aligned labels onto an empty grid at the sampled pixels.
    pub fn scatter(&self, rows: usize, cols: usize, indices: &[usize]) -> Result<GridLabelMap> {
        GridLabelMap::scatter(rows, cols, indices, &self.labels)
    }

    pub fn correct(&self) -> usize {
        self.labels
            .iter()
            .zip(&self.truth)
            .filter(|&(&l, &t)| l != 0 && l == t)
            .count()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LabelAligner;

impl LabelAligner {
    pub fn align(
        &self,
        raw: &[usize],
        indices: &[usize],
        truth: &GroundTruth,
    ) -> Result<Alignment> {
        if raw.is_empty() {
            return Err(ClusterError::InvalidInput("nothing to align".into()));
        }
        if raw.len() != indices.len() {
            return Err(ClusterError::InvalidInput(format!(
                "{} cluster labels for {} sample indices",
                raw.len(),
                indices.len()
            )));
        }

        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 3: LABEL ALIGNMENT                             ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        let truth_at = truth.labels_at(indices)?;
        let classes: Vec<u32> = truth_at.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let clusters: Vec<usize> = raw.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let class_pos: BTreeMap<u32, usize> = classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let cluster_pos: BTreeMap<usize, usize> =
            clusters.iter().enumerate().map(|(i, &c)| (c, i)).collect();

        let mut confusion = vec![vec![0u64; clusters.len()]; classes.len()];
        for (&t, &c) in truth_at.iter().zip(raw) {
            confusion[class_pos[&t]][cluster_pos[&c]] += 1;
        }

        let max = confusion.iter().flatten().copied().max().unwrap_or(0) as i64;
        let cost: Vec<Vec<i64>> = confusion
            .iter()
            .map(|row| row.iter().map(|&v| max - v as i64).collect())
            .collect();

        let mapping: BTreeMap<usize, u32> = linear_sum_assignment(&cost)
            .into_iter()
            .map(|(r, c)| (clusters[c], classes[r]))
            .collect();
        debug!(
            "Alignment: {} classes x {} clusters, mapping {:?}",
            classes.len(),
            clusters.len(),
            mapping
        );

        let labels: Vec<u32> = raw
            .iter()
            .map(|c| mapping.get(c).copied().unwrap_or(0))
            .collect();

        let mut alignment = Alignment {
            labels,
            truth: truth_at,
            accuracy: 0.0,
            classes,
            clusters,
            confusion,
            mapping,
        };
        alignment.accuracy = alignment.correct() as f64 / raw.len() as f64;

        info!(
            "  ✓ aligned {} samples, accuracy={:.4}",
            raw.len(),
            alignment.accuracy
        );
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 3 COMPLETE                                     ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        Ok(alignment)
    }
}

/// Minimum-cost assignment on a rectangular cost matrix.
///
/// Returns `(row, col)` pairs sorted by row; `min(rows, cols)` pairs are
/// produced and every row / column appears at most once.
pub fn linear_sum_assignment(cost: &[Vec<i64>]) -> Vec<(usize, usize)> {
    let rows = cost.len();
    let cols = cost.first().map(|r| r.len()).unwrap_or(0);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    if rows <= cols {
        hungarian(cost)
    } else {
        let transposed: Vec<Vec<i64>> = (0..cols)
            .map(|c| (0..rows).map(|r| cost[r][c]).collect())
            .collect();
        let mut pairs: Vec<(usize, usize)> =
            hungarian(&transposed).into_iter().map(|(c, r)| (r, c)).collect();
        pairs.sort_unstable();
        pairs
    }
}

/// Potentials-based Hungarian algorithm, `rows <= cols`.
fn hungarian(a: &[Vec<i64>]) -> Vec<(usize, usize)> {
    let n = a.len();
    let m = a[0].len();
    let inf = i64::MAX / 4;

    // 1-based; column 0 is a virtual start
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![inf; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = inf;
            let mut j1 = 0usize;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = a[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .collect();
    pairs.sort_unstable();
    pairs
}
