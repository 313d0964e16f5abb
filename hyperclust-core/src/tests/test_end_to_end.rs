//! Weights → affinity → spectral → alignment → smoothing on a toy scene.

use crate::affinity::{AffinityBuilder, AffinityConfig, Symmetrization};
use crate::alignment::LabelAligner;
use crate::ground_truth::{GridLabelMap, GroundTruth};
use crate::smoothing::{grid_accuracy, SpatialSmoother};
use crate::spectral::{SpectralClustering, SpectralConfig};
use crate::weights::WeightMatrix;

#[test]
fn test_two_groups_recovered() {
    crate::init();
    let weights = WeightMatrix::from_samples(&[
        vec![1.0, 0.0],
        vec![0.9, 0.1],
        vec![0.0, 1.0],
        vec![0.1, 0.9],
    ])
    .unwrap();

    let affinity = AffinityBuilder::new(AffinityConfig::new(2, Symmetrization::Or))
        .build(&weights)
        .unwrap();
    assert!(affinity.is_symmetric());
    assert_eq!(affinity.nnz, 8);

    let spectral = SpectralClustering::new(SpectralConfig::seeded(0))
        .cluster(&affinity.matrix, 2)
        .unwrap();
    let l = &spectral.labels;
    assert_eq!(l[0], l[1]);
    assert_eq!(l[2], l[3]);
    assert_ne!(l[0], l[2]);

    // pixels laid out on a 2x3 grid; the last column is unlabeled
    let truth = GroundTruth::new(
        GridLabelMap::from_rows(&[vec![1, 1, 0], vec![2, 2, 0]]).unwrap(),
        None,
    );
    let indices = [0, 1, 3, 4];
    let alignment = LabelAligner.align(l, &indices, &truth).unwrap();
    assert_eq!(alignment.labels, vec![1, 1, 2, 2]);
    assert_eq!(alignment.accuracy, 1.0);

    let sparse = alignment.scatter(2, 3, &indices).unwrap();
    let smoothed = SpatialSmoother::with_defaults()
        .smooth(&sparse, &truth.mask())
        .unwrap();
    assert_eq!(smoothed.to_rows(), vec![vec![1, 1, 0], vec![2, 2, 0]]);
    assert_eq!(grid_accuracy(&smoothed, &truth).unwrap(), 1.0);
}
