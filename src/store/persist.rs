//! JSON file persistence for a single vector store.
//!
//! A store file is a JSON array of [`MemoryEntry`] records. Writes go to a
//! sibling `.tmp` file which is then renamed over the target, so a crash
//! mid-write leaves the previous file intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::memory::types::MemoryEntry;

/// Failure reading or writing a store file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read all entries from `path`. A missing file is an empty store, not an error.
pub fn load_entries(path: &Path) -> Result<Vec<MemoryEntry>, PersistError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read(path).map_err(|e| PersistError::io(path, e))?;
    serde_json::from_slice(&raw).map_err(|e| PersistError::json(path, e))
}

/// Write `entries` to `path` atomically (tmp file + rename), creating parent dirs.
pub fn save_entries<'a>(
    path: &Path,
    entries: impl IntoIterator<Item = &'a MemoryEntry>,
) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }

    let entries: Vec<&MemoryEntry> = entries.into_iter().collect();
    let json = serde_json::to_vec(&entries).map_err(|e| PersistError::json(path, e))?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json).map_err(|e| PersistError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| PersistError::io(path, e))?;
    Ok(())
}

/// Read-only diagnostic summary of a store file.
#[derive(Debug, Serialize)]
pub struct FileHealth {
    pub path: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub entries: usize,
    /// Entries whose embedding would be rejected by the store.
    pub malformed_embeddings: usize,
    /// Parse or read error, if the file could not be loaded at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileHealth {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.malformed_embeddings == 0
    }
}

/// Inspect a store file without modifying it.
pub fn health(path: &Path) -> FileHealth {
    let exists = path.exists();
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let (entries, malformed_embeddings, error) = match load_entries(path) {
        Ok(entries) => {
            let malformed = entries
                .iter()
                .filter(|e| super::validate_embedding(&e.embedding).is_err())
                .count();
            (entries.len(), malformed, None)
        }
        Err(e) => (0, 0, Some(e.to_string())),
    };

    FileHealth {
        path: path.to_path_buf(),
        exists,
        size_bytes,
        entries,
        malformed_embeddings,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{MemoryMetadata, MemoryTier, Source};

    fn entry(id: &str) -> MemoryEntry {
        let mut embedding = vec![0.0f32; crate::embedding::EMBEDDING_DIM];
        embedding[0] = 1.0;
        MemoryEntry {
            id: id.to_string(),
            content: format!("content {id}"),
            embedding,
            metadata: MemoryMetadata::new(
                MemoryTier::ShortTerm,
                Source::User,
                0.5,
                chrono::Utc::now(),
            ),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = load_entries(&dir.path().join("nope.json")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/short_term.json");
        let originals = vec![entry("a"), entry("b")];

        save_entries(&path, &originals).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let mut loaded = load_entries(&path).unwrap();
        loaded.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(loaded, originals);
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long_term.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = load_entries(&path).unwrap_err();
        assert!(matches!(err, PersistError::Json { .. }));

        let report = health(&path);
        assert!(report.exists);
        assert!(report.error.is_some());
        assert!(!report.is_ok());
    }

    #[test]
    fn health_counts_malformed_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short_term.json");
        let mut bad = entry("bad");
        bad.embedding.truncate(10);
        save_entries(&path, &[entry("good"), bad]).unwrap();

        let report = health(&path);
        assert_eq!(report.entries, 2);
        assert_eq!(report.malformed_embeddings, 1);
        assert!(report.size_bytes > 0);
    }
}
