use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use sprs::{CsMat, TriMat};

use crate::spectral::*;
use crate::ClusterError;

/// Disconnected fully connected blocks, self-loops included.
fn block_diagonal(sizes: &[usize]) -> CsMat<f64> {
    let n: usize = sizes.iter().sum();
    let mut tri = TriMat::new((n, n));
    let mut start = 0;
    for &size in sizes {
        for i in start..start + size {
            for j in start..start + size {
                tri.add_triplet(i, j, 1.0);
            }
        }
        start += size;
    }
    tri.to_csr()
}

fn block_of(sizes: &[usize], node: usize) -> usize {
    let mut acc = 0;
    for (b, &s) in sizes.iter().enumerate() {
        acc += s;
        if node < acc {
            return b;
        }
    }
    unreachable!()
}

fn assert_recovers_blocks(sizes: &[usize], labels: &[usize]) {
    // same block ⇔ same cluster
    for i in 0..labels.len() {
        for j in 0..labels.len() {
            assert_eq!(
                block_of(sizes, i) == block_of(sizes, j),
                labels[i] == labels[j],
                "nodes {i} and {j}"
            );
        }
    }
}

#[test]
fn test_laplacian_excludes_self_loop_from_degree() {
    let a = block_diagonal(&[3]);
    let l = normalized_laplacian(&a).unwrap();
    // degree 2 → off-diagonal −1/2, diagonal 1 − 1/2
    assert_abs_diff_eq!(l[(0, 1)], -0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(l[(0, 0)], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(l[(2, 1)], l[(1, 2)], epsilon = 1e-12);
}

#[test]
fn test_recovers_disconnected_components() {
    crate::init();
    for sizes in [vec![4, 4], vec![3, 5, 4], vec![6, 2, 3, 5]] {
        let a = block_diagonal(&sizes);
        let out = SpectralClustering::new(SpectralConfig::seeded(7))
            .cluster(&a, sizes.len())
            .unwrap();
        assert_eq!(out.labels.len(), sizes.iter().sum::<usize>());
        let distinct: BTreeSet<usize> = out.labels.iter().copied().collect();
        assert_eq!(distinct.len(), sizes.len());
        assert_recovers_blocks(&sizes, &out.labels);
    }
}

#[test]
fn test_eigenvalues_are_ascending() {
    let a = block_diagonal(&[3, 3, 3]);
    let out = SpectralClustering::new(SpectralConfig::seeded(1))
        .cluster(&a, 3)
        .unwrap();
    assert_eq!(out.eigenvalues.len(), 3);
    assert!(out.eigenvalues.windows(2).all(|w| w[0] <= w[1] + 1e-12));
    // block indicator eigenvalue of a 3-clique with self-loops: 1 − 3/2
    for v in &out.eigenvalues {
        assert_abs_diff_eq!(*v, -0.5, epsilon = 1e-9);
    }
}

#[test]
fn test_isolated_node_is_degenerate() {
    // node 4 only has its self-loop
    let a = block_diagonal(&[2, 2, 1]);
    let err = SpectralClustering::with_defaults().cluster(&a, 2).unwrap_err();
    assert!(matches!(err, ClusterError::DegenerateGraph(_)));
    assert!(err.is_skippable());
}

#[test]
fn test_too_many_clusters_is_degenerate() {
    let a = block_diagonal(&[2, 2]);
    let err = SpectralClustering::with_defaults().cluster(&a, 5).unwrap_err();
    assert!(matches!(err, ClusterError::DegenerateGraph(_)));
}

#[test]
fn test_same_seed_same_labels() {
    let a = block_diagonal(&[5, 4, 6]);
    let first = SpectralClustering::new(SpectralConfig::seeded(99))
        .cluster(&a, 3)
        .unwrap();
    let second = SpectralClustering::new(SpectralConfig::seeded(99))
        .cluster(&a, 3)
        .unwrap();
    assert_eq!(first.labels, second.labels);
}
