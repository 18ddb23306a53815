//! Model store: persisted mean-reversion parameters per symbol.
//!
//! One JSON file per symbol: `{model_dir}/{symbol}_meanrev.json`.

use std::path::{Path, PathBuf};

use intralab_core::MeanRevParams;

use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}_meanrev.json"))
    }

    /// Write `params` for `symbol`, replacing any earlier file.
    pub fn save(&self, symbol: &str, params: &MeanRevParams) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.path(symbol);
        let json = serde_json::to_string_pretty(params).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!(symbol, path = %path.display(), win = params.win, z = params.z, "saved model");
        Ok(path)
    }

    /// Saved parameters for `symbol`, or `None` if never saved.
    pub fn load(&self, symbol: &str) -> Result<Option<MeanRevParams>, StoreError> {
        let path = self.path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StoreError::Json { path, source })
    }
}
