use crate::error::LibraryError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Fixed name of the index written at the root of an archive.
pub const INDEX_FILE_NAME: &str = "images.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub date: Option<String>,
    pub event: Option<String>,
    #[serde(rename = "path")]
    pub paths: Vec<String>,
    pub size: u64,
}

/// One sighting of a file, before it is folded into the index.
#[derive(Debug, Clone)]
pub struct Sighting {
    pub path: String,
    pub event: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Merged,
}

/// Content-addressed image index. Records are only ever added or merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIndex {
    records: BTreeMap<String, ImageRecord>,
}

/// Appends `path` unless the record already knows it.
pub fn merge_paths(paths: &mut Vec<String>, path: &str) -> bool {
    if paths.iter().any(|known| known == path) {
        return false;
    }
    paths.push(path.to_string());
    true
}

/// First non-null event wins.
pub fn merge_event(current: &mut Option<String>, candidate: Option<&str>) -> bool {
    match (current.as_ref(), candidate) {
        (None, Some(event)) => {
            *current = Some(event.to_string());
            true
        }
        _ => false,
    }
}

impl ContentIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, hash: &str) -> Option<&ImageRecord> {
        self.records.get(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ImageRecord)> {
        self.records.iter()
    }

    /// Folds a sighting into the index.
    ///
    /// `date` is only invoked when the hash is new; an existing record keeps
    /// the date computed on its first sighting.
    pub fn upsert<F>(&mut self, hash: &str, sighting: Sighting, date: F) -> Upsert
    where
        F: FnOnce() -> Option<String>,
    {
        match self.records.entry(hash.to_string()) {
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                merge_paths(&mut record.paths, &sighting.path);
                merge_event(&mut record.event, sighting.event.as_deref());
                Upsert::Merged
            }
            Entry::Vacant(slot) => {
                slot.insert(ImageRecord {
                    date: date(),
                    event: sighting.event,
                    paths: vec![sighting.path],
                    size: sighting.size,
                });
                Upsert::Created
            }
        }
    }

    /// Reads an index file; the caller's index is only replaced on success.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| LibraryError::io(path, err))?;
        let index = serde_json::from_str(&raw).map_err(|source| LibraryError::IndexParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(index)
    }

    /// Writes the index as sorted, pretty-printed JSON via a temp file
    /// in the target directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let data = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to stage index in {}", dir.display()))?;
        tmp.write_all(data.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
