// In-memory cache of the cleaned dataset, keyed by the identity of the two
// source files. A changed file means a full reload.
use crate::config::DashboardConfig;
use crate::error::Error;
use crate::loader::{load_dataset, DataSources};
use crate::types::Dataset;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileIdentity {
    pub fn of(path: &Path) -> Result<Self, Error> {
        let meta = std::fs::metadata(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => Error::MissingFile(path.to_path_buf()),
            _ => Error::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    key: Option<(FileIdentity, FileIdentity, DashboardConfig)>,
    dataset: Option<Dataset>,
    loads: usize,
}

impl DatasetCache {
    /// Cached dataset when neither file nor the config changed since the
    /// last load; a fresh load otherwise.
    pub fn get_or_load(&mut self, sources: &DataSources, cfg: &DashboardConfig) -> Result<&Dataset, Error> {
        let key = (
            FileIdentity::of(&sources.ledger)?,
            FileIdentity::of(&sources.mapping)?,
            cfg.clone(),
        );
        let fresh = self.key.as_ref() == Some(&key) && self.dataset.is_some();
        if !fresh {
            info!("loading {}", sources.ledger.display());
            let dataset = load_dataset(sources, cfg)?;
            self.loads += 1;
            self.key = Some(key);
            self.dataset = Some(dataset);
        } else {
            debug!("dataset cache hit");
        }
        self.dataset.as_ref().ok_or_else(|| Error::MissingFile(sources.ledger.clone()))
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.dataset = None;
    }

    pub fn cached(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Number of loads performed, cache hits excluded.
    pub fn loads(&self) -> usize {
        self.loads
    }
}
