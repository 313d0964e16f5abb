//! Error kinds shared by every stage.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    /// Missing or unreadable file / directory.
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Content or name that does not follow the expected format.
    #[error("parse error: {0}")]
    Parse(String),

    /// Affinity graph that cannot be spectrally clustered.
    #[error("degenerate graph: {0}")]
    DegenerateGraph(String),

    /// A class could not reach its sampling quota within the attempt cap.
    #[error("sampling exhausted for class {class}: {drawn}/{quota} after {attempts} attempts")]
    SamplingExhausted {
        class: u32,
        quota: usize,
        drawn: usize,
        attempts: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClusterError {
    pub fn load(path: impl Into<PathBuf>, err: impl ToString) -> Self {
        ClusterError::Load {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Errors that only invalidate one (neighbors, directory) evaluation.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ClusterError::Load { .. } | ClusterError::Parse(_) | ClusterError::DegenerateGraph(_)
        )
    }
}
