use approx::assert_relative_eq;
use hyperclust_core::affinity::Symmetrization;
use hyperclust_core::ClusterError;
use tempfile::TempDir;

use crate::records::*;
use crate::run_meta::RunParameters;

fn record(atoms: usize, neighbors: usize, accuracy: f64) -> ParameterRecord {
    ParameterRecord::new(
        RunParameters {
            atoms,
            mu: 0.001,
            reg: 0.08,
        },
        neighbors,
        accuracy,
    )
}

#[test]
fn test_file_name_uses_constraint_title() {
    assert_eq!(ResultsTable::file_name(Symmetrization::Or, "salinas"), "Or_salinas.csv");
    assert_eq!(ResultsTable::file_name(Symmetrization::And, "x"), "And_x.csv");
    assert_eq!(ResultsTable::file_name(Symmetrization::None, "x"), "None_x.csv");
}

#[test]
fn test_strip_zero_rows() {
    let mut table: ResultsTable = vec![
        record(10, 20, 0.8),
        ParameterRecord::default(),
        record(12, 20, 0.0),
        ParameterRecord::default(),
    ]
    .into_iter()
    .collect();

    assert_eq!(table.strip_zero_rows(), 2);
    assert_eq!(table.len(), 2);
    // zero accuracy alone is a real result
    assert_eq!(table.records()[1].atoms, 12);
}

#[test]
fn test_csv_round_trip() {
    crate::init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Or_toy.csv");

    let mut table = ResultsTable::new();
    table.push(record(10, 20, 0.812345));
    table.push(record(16, 25, 0.5));
    table.save_csv(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("mu,atoms,reg,neighbors,accuracy\n"));

    let loaded = ResultsTable::load_csv(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    for (a, b) in loaded.records().iter().zip(table.records()) {
        assert_eq!(a.atoms, b.atoms);
        assert_eq!(a.neighbors, b.neighbors);
        assert_relative_eq!(a.mu, b.mu);
        assert_relative_eq!(a.reg, b.reg);
        assert_relative_eq!(a.accuracy, b.accuracy, epsilon = 1e-6);
    }
}

#[test]
fn test_load_rejects_malformed() {
    let dir = TempDir::new().unwrap();

    let no_header = dir.path().join("a.csv");
    std::fs::write(&no_header, "0.1,10,0.08,20,0.5\n").unwrap();
    assert!(matches!(ResultsTable::load_csv(&no_header), Err(ClusterError::Parse(_))));

    let short_row = dir.path().join("b.csv");
    std::fs::write(&short_row, "mu,atoms,reg,neighbors,accuracy\n0.1,10,0.08\n").unwrap();
    assert!(matches!(ResultsTable::load_csv(&short_row), Err(ClusterError::Parse(_))));

    assert!(matches!(
        ResultsTable::load_csv(&dir.path().join("missing.csv")),
        Err(ClusterError::Load { .. })
    ));
}

#[test]
fn test_smoothed_scores_kept_apart() {
    let mut table = ResultsTable::new();
    table.push(record(10, 20, 0.7));
    table.push(record(12, 25, 0.9));
    table.push_smoothed(record(10, 20, 0.7), 0.85);

    assert_eq!(table.len(), 2);
    assert_eq!(table.smoothed().len(), 1);
    assert_eq!(table.smoothed()[0].record.atoms, 10);
    assert_eq!(
        ResultsTable::smoothed_file_name(Symmetrization::And, "x"),
        "And_x_smoothed.csv"
    );

    let csv = table.smoothed_to_csv();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("mu,atoms,reg,neighbors,accuracy,smoothed_accuracy")
    );
    assert!(lines.next().unwrap().ends_with(",0.850000"));
    assert_eq!(lines.next(), None);

    // the main table never carries the smoothed column
    assert!(table.to_csv().starts_with("mu,atoms,reg,neighbors,accuracy\n"));
}

#[test]
fn test_best_and_summary() {
    let table: ResultsTable = vec![record(10, 20, 0.7), record(16, 30, 0.9), record(8, 20, 0.4)]
        .into_iter()
        .collect();
    assert_eq!(table.best().unwrap().atoms, 16);
    assert!(table.summary().contains("best accuracy=0.9000"));
    assert_eq!(ResultsTable::new().summary(), "ResultsTable: empty");
}
