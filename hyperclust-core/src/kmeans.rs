//! Lloyd k-means over dense rows.
//!
//! Used on the spectral embedding, where rows are unit vectors and clusters
//! are tight, so a handful of random restarts is enough. The run with the
//! lowest inertia wins; ties go to the earliest run.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KMeansInit {
    /// Distinct rows drawn uniformly.
    #[default]
    Random,
    /// D²-weighted seeding.
    PlusPlus,
}

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub n_clusters: usize,
    pub max_iter: usize,
    /// Stop when the summed squared centroid shift drops below this.
    pub tol: f64,
    /// Independent restarts.
    pub n_init: usize,
    pub init: KMeansInit,
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 6,
            max_iter: 300,
            tol: 1e-8,
            n_init: 10,
            init: KMeansInit::Random,
            seed: None,
        }
    }
}

impl KMeansConfig {
    pub fn with_clusters(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub iterations: usize,
}

pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansResult> {
        let n = data.len();
        let k = self.config.n_clusters;
        if k == 0 || n < k {
            return Err(ClusterError::InvalidInput(format!(
                "k-means needs 1..={} clusters, got {}",
                n, k
            )));
        }
        let dim = data[0].len();
        if data.iter().any(|r| r.len() != dim) {
            return Err(ClusterError::InvalidInput("k-means rows differ in length".into()));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut best: Option<KMeansResult> = None;
        for run in 0..self.config.n_init.max(1) {
            let result = self.single_run(data, &mut rng);
            trace!(
                "k-means run {}: inertia={:.6}, iterations={}",
                run,
                result.inertia,
                result.iterations
            );
            if best.as_ref().map_or(true, |b| result.inertia < b.inertia) {
                best = Some(result);
            }
        }

        let best = best.ok_or_else(|| ClusterError::InvalidInput("k-means produced no run".into()))?;
        debug!(
            "k-means: n={}, k={}, best inertia={:.6}",
            n, k, best.inertia
        );
        Ok(best)
    }

    fn single_run(&self, data: &[Vec<f64>], rng: &mut StdRng) -> KMeansResult {
        let k = self.config.n_clusters;
        let mut centroids = match self.config.init {
            KMeansInit::Random => rand::seq::index::sample(rng, data.len(), k)
                .iter()
                .map(|i| data[i].clone())
                .collect(),
            KMeansInit::PlusPlus => plus_plus_seeds(data, k, rng),
        };

        let mut labels = vec![0usize; data.len()];
        let mut iterations = 0;
        for it in 0..self.config.max_iter {
            iterations = it + 1;
            assign(data, &centroids, &mut labels);
            reseed_empty(data, &centroids, &mut labels, k);

            let updated = means(data, &labels, k);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| sq_dist(a, b))
                .sum();
            centroids = updated;
            if shift <= self.config.tol {
                break;
            }
        }

        assign(data, &centroids, &mut labels);
        let inertia = data
            .iter()
            .zip(&labels)
            .map(|(x, &l)| sq_dist(x, &centroids[l]))
            .sum();

        KMeansResult {
            labels,
            centroids,
            inertia,
            iterations,
        }
    }
}

#[inline]
fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(x: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = sq_dist(x, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize]) {
    for (x, label) in data.iter().zip(labels.iter_mut()) {
        *label = nearest(x, centroids).0;
    }
}

/// Move the point farthest from its centroid into each empty cluster.
fn reseed_empty(data: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize], k: usize) {
    let mut counts = vec![0usize; k];
    labels.iter().for_each(|&l| counts[l] += 1);

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = data
            .iter()
            .enumerate()
            .filter(|&(i, _)| counts[labels[i]] > 1)
            .map(|(i, x)| (i, sq_dist(x, &centroids[labels[i]])))
            .fold(None, |acc: Option<(usize, f64)>, (i, d)| match acc {
                Some((_, best)) if best >= d => acc,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
        }
    }
}

fn means(data: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let dim = data[0].len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];
    for (x, &l) in data.iter().zip(labels) {
        counts[l] += 1;
        sums[l].iter_mut().zip(x).for_each(|(s, v)| *s += v);
    }
    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            sum.iter_mut().for_each(|s| *s /= count as f64);
        }
    }
    sums
}

fn plus_plus_seeds(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![data[rng.random_range(0..data.len())].clone()];
    while centroids.len() < k {
        let weights: Vec<f64> = data.iter().map(|x| nearest(x, &centroids).1).collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            // every point coincides with a centroid already
            centroids.push(data[rng.random_range(0..data.len())].clone());
            continue;
        }
        let mut target = rng.random_range(0.0..total);
        let mut pick = data.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                pick = i;
                break;
            }
            target -= w;
        }
        centroids.push(data[pick].clone());
    }
    centroids
}
