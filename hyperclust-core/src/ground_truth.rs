//! Ground-truth class labels on the 2-D pixel grid and the label maps built
//! on top of it.
//!
//! Pixels are addressed by their flattened row-major index
//! `row * cols + col`, the same index the sampler stores. Label 0 means
//! unlabeled background everywhere in this crate.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Mapping from raw dataset class IDs to a compact alphabet.
///
/// Unmapped labels become 0. Label 0 always maps to 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelRemap {
    pairs: BTreeMap<u32, u32>,
}

impl LabelRemap {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut pairs: BTreeMap<u32, u32> = pairs.into_iter().collect();
        pairs.insert(0, 0);
        Self { pairs }
    }

    /// Non-zero labels in ascending order become 1, 2, 3, ...
    pub fn compact(labels: &[u32]) -> Self {
        let distinct: BTreeSet<u32> = labels.iter().copied().filter(|&l| l != 0).collect();
        Self::from_pairs(
            distinct
                .into_iter()
                .enumerate()
                .map(|(i, l)| (l, i as u32 + 1)),
        )
    }

    pub fn apply(&self, label: u32) -> u32 {
        self.pairs.get(&label).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A `rows x cols` grid of labels, 0 where nothing is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLabelMap {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<u32>,
}

impl GridLabelMap {
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn from_rows(grid: &[Vec<u32>]) -> Result<Self> {
        let rows = grid.len();
        let cols = grid.first().map(|r| r.len()).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(ClusterError::InvalidInput("empty label grid".into()));
        }
        if grid.iter().any(|r| r.len() != cols) {
            return Err(ClusterError::Parse("ragged label grid".into()));
        }
        Ok(Self {
            rows,
            cols,
            data: grid.iter().flatten().copied().collect(),
        })
    }

    /// Place `labels[i]` at flattened pixel `indices[i]`.
    pub fn scatter(rows: usize, cols: usize, indices: &[usize], labels: &[u32]) -> Result<Self> {
        if indices.len() != labels.len() {
            return Err(ClusterError::InvalidInput(format!(
                "{} indices for {} labels",
                indices.len(),
                labels.len()
            )));
        }
        let mut grid = Self::empty(rows, cols);
        for (&idx, &label) in indices.iter().zip(labels) {
            if idx >= grid.data.len() {
                return Err(ClusterError::InvalidInput(format!(
                    "pixel index {} outside {}x{} grid",
                    idx, rows, cols
                )));
            }
            grid.data[idx] = label;
        }
        Ok(grid)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.cols + col]
    }

    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.data.chunks(self.cols).map(|c| c.to_vec()).collect()
    }

    pub fn labeled_count(&self) -> usize {
        self.data.iter().filter(|&&l| l != 0).count()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string(&self.to_rows())
            .map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        fs::write(path, raw).map_err(|e| ClusterError::load(path, e))
    }
}

/// Per-pixel class labels after remapping, plus the labeled footprint.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    grid: GridLabelMap,
    remap: LabelRemap,
}

impl GroundTruth {
    /// Remap a raw label grid. With `remap = None` a compact remap is derived
    /// from the labels present.
    pub fn new(raw: GridLabelMap, remap: Option<LabelRemap>) -> Self {
        let remap = remap.unwrap_or_else(|| LabelRemap::compact(&raw.data));
        let data = raw.data.iter().map(|&l| remap.apply(l)).collect();
        let grid = GridLabelMap {
            rows: raw.rows,
            cols: raw.cols,
            data,
        };
        debug!(
            "Ground truth {}x{}: {} labeled pixels, {} classes",
            grid.rows,
            grid.cols,
            grid.labeled_count(),
            remap.len().saturating_sub(1)
        );
        Self { grid, remap }
    }

    /// Load a JSON grid (list of rows of raw class IDs).
    pub fn load_json(path: &Path, remap: Option<LabelRemap>) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;
        let rows: Vec<Vec<u32>> =
            serde_json::from_str(&raw).map_err(|e| ClusterError::load(path, e))?;
        let grid = GridLabelMap::from_rows(&rows).map_err(|e| ClusterError::load(path, e))?;
        info!("Loaded ground truth {}x{} from {:?}", grid.rows, grid.cols, path);
        Ok(Self::new(grid, remap))
    }

    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn cols(&self) -> usize {
        self.grid.cols
    }

    pub fn n_pixels(&self) -> usize {
        self.grid.data.len()
    }

    #[inline]
    pub fn label(&self, pixel: usize) -> u32 {
        self.grid.data[pixel]
    }

    pub fn labels(&self) -> &[u32] {
        &self.grid.data
    }

    pub fn grid(&self) -> &GridLabelMap {
        &self.grid
    }

    pub fn remap(&self) -> &LabelRemap {
        &self.remap
    }

    /// Labels at the given pixels; out-of-range indices are an error.
    pub fn labels_at(&self, indices: &[usize]) -> Result<Vec<u32>> {
        indices
            .iter()
            .map(|&i| {
                self.grid.data.get(i).copied().ok_or_else(|| {
                    ClusterError::InvalidInput(format!(
                        "pixel index {} outside ground truth of {} pixels",
                        i,
                        self.n_pixels()
                    ))
                })
            })
            .collect()
    }

    /// Flattened pixel indices carrying the given (remapped) class.
    pub fn pixels_of(&self, class: u32) -> Vec<usize> {
        self.grid
            .data
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect()
    }

    /// `true` on every labeled pixel.
    pub fn mask(&self) -> Vec<bool> {
        self.grid.data.iter().map(|&l| l != 0).collect()
    }
}
