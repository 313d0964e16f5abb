//! Labeled pixel sampling for the dictionary-learning training set.
//!
//! Two policies:
//! - [`SamplingPolicy::TrainClasses`]: pick a set of classes and fill each
//!   with an equal share of the sample by rejection sampling over the whole
//!   image (draws landing on another class are rejected).
//! - [`SamplingPolicy::TrueRandom`]: uniform draws over every labeled pixel;
//!   the classes touched are reported afterwards, sorted ascending.
//!
//! Every drawn spectrum is L1-normalised because the optimizer treats samples
//! as probability histograms. Rejection loops are bounded: a class that cannot
//! reach its quota fails with [`ClusterError::SamplingExhausted`] instead of
//! spinning.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ClusterError, Result};

/// Classes of the Salinas-A scene the class-balanced policy draws from.
pub const SALINAS_A_CLASSES: [u32; 6] = [1, 10, 11, 12, 13, 14];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// Equal share per class. `fixed_labels` overrides the random choice of
    /// `n_labels` classes from the candidate pool.
    TrainClasses {
        n_labels: usize,
        fixed_labels: Option<Vec<u32>>,
    },
    /// Uniform over the labeled footprint.
    TrueRandom,
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Classes `TrainClasses` may draw when no labels are fixed.
    pub candidate_pool: Vec<u32>,
    /// Attempt budget per still-missing sample before giving up on a class.
    pub max_attempts_per_sample: usize,
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            candidate_pool: SALINAS_A_CLASSES.to_vec(),
            max_attempts_per_sample: 10_000,
            seed: None,
        }
    }
}

/// Result of one sampling call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDraw {
    /// L1-normalised spectra, one per sampled pixel.
    pub rows: Vec<Vec<f64>>,
    /// Flattened pixel indices, unique, in draw order.
    pub indices: Vec<usize>,
    /// Classes the sample was built from.
    pub labels_used: Vec<u32>,
}

impl SampleDraw {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let raw =
            serde_json::to_string(self).map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        fs::write(path, raw).map_err(|e| ClusterError::load(path, e))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;
        serde_json::from_str(&raw).map_err(|e| ClusterError::load(path, e))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub struct Sampler {
    config: SamplerConfig,
    rng: StdRng,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    pub fn with_defaults() -> Self {
        Self::new(SamplerConfig::default())
    }

    /// Draw `size` pixels from `data` (pixels x channels) using the per-pixel
    /// class `labels` (flattened, 0 = unlabeled).
    pub fn sample(
        &mut self,
        data: &DenseMatrix<f64>,
        labels: &[u32],
        size: usize,
        policy: &SamplingPolicy,
    ) -> Result<SampleDraw> {
        let (n_pixels, n_channels) = data.shape();
        if n_pixels != labels.len() {
            return Err(ClusterError::InvalidInput(format!(
                "{} pixels of data but {} labels",
                n_pixels,
                labels.len()
            )));
        }
        if size == 0 {
            return Err(ClusterError::InvalidInput("sample size must be positive".into()));
        }

        info!(
            "Sampling {} of {} pixels ({} channels) with {:?}",
            size, n_pixels, n_channels, policy
        );

        let (indices, labels_used) = match policy {
            SamplingPolicy::TrainClasses {
                n_labels,
                fixed_labels,
            } => {
                let classes = match fixed_labels {
                    Some(fixed) if !fixed.is_empty() => fixed.clone(),
                    _ => self.choose_classes(*n_labels)?,
                };
                (self.draw_train_classes(labels, size, &classes)?, classes)
            }
            SamplingPolicy::TrueRandom => self.draw_true_random(labels, size)?,
        };

        let rows = indices
            .iter()
            .map(|&px| l1_normalised_row(data, px))
            .collect::<Result<Vec<_>>>()?;

        debug!("Sampled {} pixels over classes {:?}", indices.len(), labels_used);
        Ok(SampleDraw {
            rows,
            indices,
            labels_used,
        })
    }

    fn choose_classes(&mut self, n_labels: usize) -> Result<Vec<u32>> {
        let pool = &self.config.candidate_pool;
        if n_labels == 0 || n_labels > pool.len() {
            return Err(ClusterError::InvalidInput(format!(
                "cannot choose {} classes from a pool of {}",
                n_labels,
                pool.len()
            )));
        }
        let picked = rand::seq::index::sample(&mut self.rng, pool.len(), n_labels);
        Ok(picked.iter().map(|i| pool[i]).collect())
    }

    fn draw_train_classes(
        &mut self,
        labels: &[u32],
        size: usize,
        classes: &[u32],
    ) -> Result<Vec<usize>> {
        let n_pixels = labels.len();
        let n_classes = classes.len() as f64;
        let mut taken: HashSet<usize> = HashSet::with_capacity(size);
        let mut order: Vec<usize> = Vec::with_capacity(size);

        for (i, &class) in classes.iter().enumerate() {
            // running total must reach i*size/n; real-valued so the last class is under-filled on ties
            let target = (i + 1) as f64 * size as f64 / n_classes;
            let needed = (target - order.len() as f64).ceil().max(0.0) as usize;

            let available = labels
                .iter()
                .enumerate()
                .filter(|&(px, &l)| l == class && !taken.contains(&px))
                .count();
            if available < needed {
                return Err(ClusterError::SamplingExhausted {
                    class,
                    quota: needed,
                    drawn: 0,
                    attempts: 0,
                });
            }

            let budget = self.config.max_attempts_per_sample.saturating_mul(needed.max(1));
            let start = order.len();
            let mut attempts = 0usize;
            while (order.len() as f64) < target {
                if attempts >= budget {
                    return Err(ClusterError::SamplingExhausted {
                        class,
                        quota: needed,
                        drawn: order.len() - start,
                        attempts,
                    });
                }
                attempts += 1;
                let px = self.rng.random_range(0..n_pixels);
                if labels[px] == class && taken.insert(px) {
                    order.push(px);
                }
            }
            trace!(
                "Class {}: {} samples in {} attempts",
                class,
                order.len() - start,
                attempts
            );
        }

        Ok(order)
    }

    fn draw_true_random(&mut self, labels: &[u32], size: usize) -> Result<(Vec<usize>, Vec<u32>)> {
        let n_pixels = labels.len();
        let footprint = labels.iter().filter(|&&l| l != 0).count();
        if footprint < size {
            return Err(ClusterError::SamplingExhausted {
                class: 0,
                quota: size,
                drawn: 0,
                attempts: 0,
            });
        }

        let budget = self.config.max_attempts_per_sample.saturating_mul(size);
        let mut taken: HashSet<usize> = HashSet::with_capacity(size);
        let mut order: Vec<usize> = Vec::with_capacity(size);
        let mut classes: BTreeSet<u32> = BTreeSet::new();
        let mut attempts = 0usize;

        while order.len() < size {
            if attempts >= budget {
                return Err(ClusterError::SamplingExhausted {
                    class: 0,
                    quota: size,
                    drawn: order.len(),
                    attempts,
                });
            }
            attempts += 1;
            let px = self.rng.random_range(0..n_pixels);
            if labels[px] != 0 && taken.insert(px) {
                order.push(px);
                classes.insert(labels[px]);
            }
        }

        Ok((order, classes.into_iter().collect()))
    }
}

fn l1_normalised_row(data: &DenseMatrix<f64>, pixel: usize) -> Result<Vec<f64>> {
    let n_channels = data.shape().1;
    let row: Vec<f64> = (0..n_channels).map(|c| *data.get((pixel, c))).collect();
    let sum: f64 = row.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "pixel {} has non-positive spectrum mass {}",
            pixel, sum
        )));
    }
    Ok(row.into_iter().map(|v| v / sum).collect())
}

/// Shift `data` so that no entry is below `pad`; matrices that are already
/// non-negative are only offset by `pad`.
pub fn make_non_negative(data: &DenseMatrix<f64>, pad: f64) -> Result<DenseMatrix<f64>> {
    let (rows, cols) = data.shape();
    let mut min = 0.0_f64;
    for i in 0..rows {
        for j in 0..cols {
            min = min.min(*data.get((i, j)));
        }
    }
    let shift = min.abs() + pad;

    let values: Vec<f64> = (0..rows)
        .flat_map(|i| (0..cols).map(move |j| (i, j)))
        .map(|(i, j)| *data.get((i, j)) + shift)
        .collect();
    DenseMatrix::new(rows, cols, values, false).map_err(|e| ClusterError::InvalidInput(e.to_string()))
}
