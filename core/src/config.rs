use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bm25::Bm25Params;
use crate::error::{Error, Result};
use crate::vsm::Normalization;

/// Build-time settings. Every field may be omitted from a JSON file.
///
/// ```json
/// { "bm25": { "b": 0.75, "k": 1.75 }, "normalization": "l2" }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub bm25: Bm25Params,
    pub normalization: Normalization,
}

impl IndexConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay command-line values on top of this config.
    pub fn with_overrides(mut self, b: Option<f64>, k: Option<f64>, normalization: Option<Normalization>) -> Self {
        if let Some(b) = b {
            self.bm25.b = b;
        }
        if let Some(k) = k {
            self.bm25.k = k;
        }
        if let Some(n) = normalization {
            self.normalization = n;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bm25.b.is_nan() {
            return Err(Error::Config("b must be a number".into()));
        }
        if self.bm25.k.is_nan() {
            return Err(Error::Config("k must be a number".into()));
        }
        Ok(())
    }
}
