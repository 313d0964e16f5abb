//! # hyperclust-core
//!
//! Post-processing of a learned low-rank representation of hyperspectral
//! pixels. A dictionary-learning run yields atoms and, per sampled pixel, a
//! weight vector over those atoms. This crate turns the weight vectors into
//! a pixel labeling and scores it against ground truth:
//!
//! 1. **Affinity**: k-NN connectivity graph over the weight vectors with an
//!    `and` / `or` / `none` symmetrization rule ([`affinity`]).
//! 2. **Spectral**: symmetric normalized Laplacian, smallest eigenvectors,
//!    k-means in the embedded space ([`spectral`], [`kmeans`]).
//! 3. **Alignment**: confusion matrix + Hungarian assignment from cluster IDs
//!    to class IDs, accuracy ([`alignment`]).
//! 4. **Smoothing**: majority vote over expanding L1 rings on the pixel grid,
//!    masked to the labeled footprint ([`smoothing`]).
//!
//! Supporting pieces: the ground-distance matrix handed to the optimizer
//! ([`cost`]), the labeled pixel sampler ([`sampling`]) and the ground-truth
//! model ([`ground_truth`]).

pub mod affinity;
pub mod alignment;
pub mod cost;
pub mod error;
pub mod ground_truth;
pub mod kmeans;
pub mod sampling;
pub mod smoothing;
pub mod spectral;
pub mod weights;

pub use error::{ClusterError, Result};

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
