//! Parameter/accuracy table accumulated over a sweep.

use std::fs;
use std::path::Path;

use hyperclust_core::affinity::Symmetrization;
use hyperclust_core::{ClusterError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::run_meta::RunParameters;

const HEADER: &str = "mu,atoms,reg,neighbors,accuracy";
const SMOOTHED_HEADER: &str = "mu,atoms,reg,neighbors,accuracy,smoothed_accuracy";

/// One evaluated `(run, neighbor count)` pair. All zero for a skipped pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub mu: f64,
    pub atoms: usize,
    pub reg: f64,
    pub neighbors: usize,
    pub accuracy: f64,
}

impl ParameterRecord {
    pub fn new(params: RunParameters, neighbors: usize, accuracy: f64) -> Self {
        Self {
            mu: params.mu,
            atoms: params.atoms,
            reg: params.reg,
            neighbors,
            accuracy,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mu == 0.0
            && self.atoms == 0
            && self.reg == 0.0
            && self.neighbors == 0
            && self.accuracy == 0.0
    }

    fn to_csv_line(self) -> String {
        format!(
            "{},{},{},{},{:.6}",
            self.mu, self.atoms, self.reg, self.neighbors, self.accuracy
        )
    }

    fn from_csv_line(line: &str, line_no: usize) -> Result<Self> {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != 5 {
            return Err(ClusterError::Parse(format!(
                "line {}: expected 5 columns, got {}",
                line_no,
                cells.len()
            )));
        }
        let bad = |what: &str| ClusterError::Parse(format!("line {}: bad {}", line_no, what));
        Ok(Self {
            mu: cells[0].parse().map_err(|_| bad("mu"))?,
            atoms: cells[1].parse().map_err(|_| bad("atoms"))?,
            reg: cells[2].parse().map_err(|_| bad("reg"))?,
            neighbors: cells[3].parse().map_err(|_| bad("neighbors"))?,
            accuracy: cells[4].parse().map_err(|_| bad("accuracy"))?,
        })
    }
}

/// Footprint accuracy after spatial smoothing, next to the pair it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedScore {
    pub record: ParameterRecord,
    pub smoothed_accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsTable {
    records: Vec<ParameterRecord>,
    /// Only the pairs that passed the smoothing gate.
    smoothed: Vec<SmoothedScore>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<Constraint>_<sweep_name>.csv`, constraint title-cased.
    pub fn file_name(rule: Symmetrization, sweep_name: &str) -> String {
        format!("{}_{}.csv", rule, sweep_name)
    }

    /// `<Constraint>_<sweep_name>_smoothed.csv`.
    pub fn smoothed_file_name(rule: Symmetrization, sweep_name: &str) -> String {
        format!("{}_{}_smoothed.csv", rule, sweep_name)
    }

    pub fn push(&mut self, record: ParameterRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ParameterRecord] {
        &self.records
    }

    pub fn push_smoothed(&mut self, record: ParameterRecord, smoothed_accuracy: f64) {
        self.smoothed.push(SmoothedScore {
            record,
            smoothed_accuracy,
        });
    }

    pub fn smoothed(&self) -> &[SmoothedScore] {
        &self.smoothed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all-zero rows; returns how many were removed.
    pub fn strip_zero_rows(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !r.is_zero());
        before - self.records.len()
    }

    /// Row with the highest accuracy.
    pub fn best(&self) -> Option<&ParameterRecord> {
        self.records
            .iter()
            .max_by(|a, b| a.accuracy.total_cmp(&b.accuracy))
    }

    pub fn to_csv(&self) -> String {
        let mut csv = format!("{}\n", HEADER);
        for r in &self.records {
            csv.push_str(&r.to_csv_line());
            csv.push('\n');
        }
        csv
    }

    pub fn smoothed_to_csv(&self) -> String {
        let mut csv = format!("{}\n", SMOOTHED_HEADER);
        for s in &self.smoothed {
            csv.push_str(&format!(
                "{},{:.6}\n",
                s.record.to_csv_line(),
                s.smoothed_accuracy
            ));
        }
        csv
    }

    pub fn save_smoothed_csv(&self, path: &Path) -> Result<()> {
        fs::write(path, self.smoothed_to_csv()).map_err(|e| ClusterError::load(path, e))?;
        info!("  ✓ {} smoothed rows written to {:?}", self.smoothed.len(), path);
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_csv()).map_err(|e| ClusterError::load(path, e))?;
        info!("  ✓ {} rows written to {:?}", self.records.len(), path);
        Ok(())
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| ClusterError::load(path, e))?;
        let mut lines = raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        match lines.next() {
            Some((_, header)) if header.trim() == HEADER => {}
            other => {
                return Err(ClusterError::Parse(format!(
                    "{}: expected header {:?}, got {:?}",
                    path.display(),
                    HEADER,
                    other.map(|(_, l)| l)
                )))
            }
        }

        let records = lines
            .map(|(i, l)| ParameterRecord::from_csv_line(l, i + 1))
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} rows from {:?}", records.len(), path);
        Ok(Self {
            records,
            smoothed: Vec::new(),
        })
    }

    pub fn summary(&self) -> String {
        match self.best() {
            Some(best) => format!(
                "ResultsTable: {} rows, best accuracy={:.4} (atoms={}, mu={}, reg={}, NN={})",
                self.records.len(),
                best.accuracy,
                best.atoms,
                best.mu,
                best.reg,
                best.neighbors
            ),
            None => "ResultsTable: empty".to_string(),
        }
    }
}

impl FromIterator<ParameterRecord> for ResultsTable {
    fn from_iter<I: IntoIterator<Item = ParameterRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
            smoothed: Vec::new(),
        }
    }
}
