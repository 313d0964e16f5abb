//! Spatial majority-vote smoothing of a sparse label map.
//!
//! Only the sampled pixels carry a label after clustering. Every unlabeled
//! pixel inside the labeled footprint receives the most frequent label among
//! its nearest labeled pixels, searched ring by ring in L1 distance:
//!
//! ```text
//!         3
//!       3 2 3
//!     3 2 1 2 3
//!   3 2 1 x 1 2 3
//!     3 2 1 2 3
//!       3 2 3
//!         3
//! ```
//!
//! Votes are always read from the input map, never from cells filled during
//! the same pass, so the result does not depend on traversal order. A ring is
//! scanned in row-major order and the search stops as soon as `votes` labels
//! are collected or the ring radius reaches `radius_cap`. Ties in the vote go
//! to the label seen first.
//!
//! The result is masked with the footprint: nothing outside the ground-truth
//! labeled area survives, so smoothing never adds evaluation signal there.

use log::info;
use rayon::prelude::*;

use crate::error::{ClusterError, Result};
use crate::ground_truth::{GridLabelMap, GroundTruth};

#[derive(Debug, Clone)]
pub struct SmoothingConfig {
    /// Labeled neighbors collected per pixel.
    pub votes: usize,
    /// Rings `1..radius_cap` are searched.
    pub radius_cap: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            votes: 10,
            radius_cap: 40,
        }
    }
}

pub struct SpatialSmoother {
    pub config: SmoothingConfig,
}

impl SpatialSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SmoothingConfig::default())
    }

    /// Fill and mask `grid`. `mask[p]` is true on the labeled footprint.
    pub fn smooth(&self, grid: &GridLabelMap, mask: &[bool]) -> Result<GridLabelMap> {
        if grid.cols == 0 || grid.rows == 0 || grid.data.len() != grid.rows * grid.cols {
            return Err(ClusterError::InvalidInput(format!(
                "cannot smooth a {}x{} grid holding {} cells",
                grid.rows,
                grid.cols,
                grid.data.len()
            )));
        }
        if mask.len() != grid.data.len() {
            return Err(ClusterError::InvalidInput(format!(
                "mask of {} cells for a {}x{} grid",
                mask.len(),
                grid.rows,
                grid.cols
            )));
        }
        if self.config.votes == 0 {
            return Err(ClusterError::InvalidInput("votes must be positive".into()));
        }

        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 4: SPATIAL SMOOTHING                           ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        info!(
            "Spatial smoothing {}x{}: {} labeled cells, votes={}, radius cap={}",
            grid.rows,
            grid.cols,
            grid.labeled_count(),
            self.config.votes,
            self.config.radius_cap
        );

        let cols = grid.cols;
        let mut out = vec![0u32; grid.data.len()];
        out.par_chunks_mut(cols).enumerate().for_each(|(r, row)| {
            let mut votes = Vec::with_capacity(self.config.votes);
            for (c, cell) in row.iter_mut().enumerate() {
                let idx = r * cols + c;
                if !mask[idx] {
                    continue;
                }
                let current = grid.data[idx];
                *cell = if current != 0 {
                    current
                } else {
                    self.collect_votes(grid, r, c, &mut votes);
                    majority(&votes).unwrap_or(0)
                };
            }
        });

        let result = GridLabelMap {
            rows: grid.rows,
            cols: grid.cols,
            data: out,
        };
        let unresolved = mask
            .iter()
            .zip(&result.data)
            .filter(|&(&m, &l)| m && l == 0)
            .count();
        info!(
            "  ✓ {} labeled cells after smoothing, {} footprint cells without votes",
            result.labeled_count(),
            unresolved
        );
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  STAGE 4 COMPLETE                                     ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        Ok(result)
    }

    /// Labeled neighbors of (r, c) ring by ring, at most `votes` of them.
    fn collect_votes(&self, grid: &GridLabelMap, r: usize, c: usize, votes: &mut Vec<u32>) {
        votes.clear();
        let want = self.config.votes;
        let (rows, cols) = (grid.rows as isize, grid.cols as isize);
        let (r, c) = (r as isize, c as isize);

        let mut dist: isize = 1;
        while votes.len() < want && (dist as usize) < self.config.radius_cap {
            for dr in -dist..=dist {
                let rr = r + dr;
                if rr < 0 || rr >= rows {
                    continue;
                }
                let rem = dist - dr.abs();
                let left = c - rem;
                let right = c + rem;
                for cc in [left, right] {
                    if cc < 0 || cc >= cols {
                        continue;
                    }
                    let label = grid.get(rr as usize, cc as usize);
                    if label != 0 {
                        votes.push(label);
                        if votes.len() == want {
                            return;
                        }
                    }
                    if rem == 0 {
                        break;
                    }
                }
            }
            dist += 1;
        }
    }
}

/// Most frequent label; among equally frequent labels the first one seen wins.
pub fn majority(votes: &[u32]) -> Option<u32> {
    let mut tally: Vec<(u32, usize)> = Vec::new();
    for &v in votes {
        match tally.iter_mut().find(|(label, _)| *label == v) {
            Some((_, count)) => *count += 1,
            None => tally.push((v, 1)),
        }
    }
    let mut best: Option<(u32, usize)> = None;
    for &(label, count) in &tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Fraction of footprint pixels whose smoothed label equals the ground truth.
pub fn grid_accuracy(smoothed: &GridLabelMap, truth: &GroundTruth) -> Result<f64> {
    if smoothed.data.len() != truth.n_pixels() {
        return Err(ClusterError::InvalidInput(format!(
            "smoothed grid has {} cells, ground truth {}",
            smoothed.data.len(),
            truth.n_pixels()
        )));
    }
    let (hits, total) = smoothed
        .data
        .iter()
        .zip(truth.labels())
        .filter(|&(_, &t)| t != 0)
        .fold((0usize, 0usize), |(h, n), (&s, &t)| (h + (s == t) as usize, n + 1));
    if total == 0 {
        return Err(ClusterError::InvalidInput("ground truth has no labeled pixels".into()));
    }
    Ok(hits as f64 / total as f64)
}
