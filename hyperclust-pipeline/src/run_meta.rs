//! Parameters of one dictionary-learning run.
//!
//! A run directory is named `<prefix>k=<atoms>_mu=<mu>_reg=<reg>`, e.g.
//! `big_sample_k=10_mu=0.001_reg=0.08`. The values are located by the
//! markers `_k=`, `_mu=` and `_reg=`, in that order, and each value runs up
//! to the next marker, so underscores or an earlier `_mu=` inside the prefix
//! are harmless.
//!
//! A `run.json` sidecar carrying the same three values takes precedence over
//! the name.

use std::fs;
use std::path::{Path, PathBuf};

use hyperclust_core::{ClusterError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

pub const SIDECAR_FILE: &str = "run.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Dictionary size.
    pub atoms: usize,
    /// Geometric regularizer.
    pub mu: f64,
    /// Entropic regularizer.
    pub reg: f64,
}

impl RunParameters {
    pub fn parse_dir_name(name: &str) -> Result<Self> {
        let first_k = name
            .find("_k=")
            .ok_or_else(|| ClusterError::Parse(format!("{:?}: no _k= marker", name)))?;
        let mu_at = name[first_k..]
            .find("_mu=")
            .map(|i| first_k + i)
            .ok_or_else(|| ClusterError::Parse(format!("{:?}: no _mu= marker after _k=", name)))?;
        // the prefix may contain `_k=` itself; the value follows the last one
        let k_at = name[..mu_at].rfind("_k=").unwrap_or(first_k);
        let reg_at = name[mu_at..]
            .find("_reg=")
            .map(|i| mu_at + i)
            .ok_or_else(|| ClusterError::Parse(format!("{:?}: no _reg= marker after _mu=", name)))?;

        let atoms_raw = &name[k_at + "_k=".len()..mu_at];
        let mu_raw = &name[mu_at + "_mu=".len()..reg_at];
        let reg_raw = &name[reg_at + "_reg=".len()..];

        let atoms = atoms_raw
            .parse::<usize>()
            .map_err(|_| ClusterError::Parse(format!("{:?}: atom count {:?}", name, atoms_raw)))?;
        let mu = parse_finite(name, "mu", mu_raw)?;
        let reg = parse_finite(name, "reg", reg_raw)?;
        Ok(Self { atoms, mu, reg })
    }

    /// Directory name under the naming contract.
    pub fn dir_name(&self, prefix: &str) -> String {
        let prefix = prefix.strip_suffix("k=").unwrap_or(prefix);
        format!("{}k={}_mu={}_reg={}", prefix, self.atoms, self.mu, self.reg)
    }

    /// `Ok(None)` when the directory has no sidecar.
    pub fn read_sidecar(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(SIDECAR_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| ClusterError::load(&path, e))?;
        let params = serde_json::from_str(&raw).map_err(|e| ClusterError::load(&path, e))?;
        Ok(Some(params))
    }

    pub fn write_sidecar(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SIDECAR_FILE);
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ClusterError::InvalidInput(e.to_string()))?;
        fs::write(&path, raw).map_err(|e| ClusterError::load(&path, e))?;
        Ok(path)
    }

    /// Sidecar first, directory name otherwise.
    pub fn resolve(dir: &Path) -> Result<Self> {
        if let Some(params) = Self::read_sidecar(dir)? {
            debug!("{:?}: parameters from {}", dir, SIDECAR_FILE);
            return Ok(params);
        }
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClusterError::Parse(format!("{:?}: no usable directory name", dir)))?;
        Self::parse_dir_name(name)
    }
}

fn parse_finite(name: &str, field: &str, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ClusterError::Parse(format!("{:?}: {} value {:?}", name, field, raw))),
    }
}
