use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::loader::load_boundaries;
use super::model::DivisionDataset;
use crate::config::FieldNames;
use crate::error::Result;

// ---------------------------------------------------------------------------
// DatasetCache – memoized boundary datasets keyed by source path
// ---------------------------------------------------------------------------

/// Loaded datasets, one per distinct source path. Entries live for the
/// lifetime of the cache; the handful of sources never warrants eviction.
#[derive(Debug, Default)]
pub struct DatasetCache {
    fields: FieldNames,
    excluded: Vec<String>,
    entries: HashMap<PathBuf, Arc<DivisionDataset>>,
}

impl DatasetCache {
    pub fn new(fields: FieldNames, excluded: Vec<String>) -> Self {
        DatasetCache {
            fields,
            excluded,
            entries: HashMap::new(),
        }
    }

    /// Return the dataset for `path`, reading it on first use only.
    /// Failed loads are not remembered.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<DivisionDataset>> {
        if let Some(ds) = self.entries.get(path) {
            log::debug!("Dataset cache hit for {}", path.display());
            return Ok(Arc::clone(ds));
        }
        let ds = Arc::new(load_boundaries(path, &self.fields, &self.excluded)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&ds));
        Ok(ds)
    }

    /// Drop one entry so the next request re-reads the source.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
