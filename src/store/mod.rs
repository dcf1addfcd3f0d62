//! Brute-force vector store backed by one JSON file.
//!
//! [`VectorStore`] maps entry id → [`MemoryEntry`], scans every entry on search,
//! and rewrites its whole backing file after each mutation. Write failures are
//! logged and swallowed; the in-memory map stays authoritative for the rest of
//! the process. There is no internal locking: one owner mutates a store at a time.

pub mod persist;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::embedding::{cosine_similarity, l2_norm, EMBEDDING_DIM, UNIT_NORM_TOLERANCE};
use crate::memory::types::{MemoryEntry, MemoryMetadata};

pub use persist::{FileHealth, PersistError};

/// Invariant violations rejected by the store.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("embedding has {actual} dimensions, expected {expected}")]
    WrongDimension { expected: usize, actual: usize },

    #[error("embedding contains non-finite values")]
    NonFinite,

    #[error("embedding norm {norm} is neither 1 nor 0")]
    NotNormalized { norm: f32 },
}

/// Check that an embedding is `EMBEDDING_DIM` long, finite, and unit-length or exactly zero.
pub fn validate_embedding(embedding: &[f32]) -> Result<(), StoreError> {
    if embedding.len() != EMBEDDING_DIM {
        return Err(StoreError::WrongDimension {
            expected: EMBEDDING_DIM,
            actual: embedding.len(),
        });
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(StoreError::NonFinite);
    }
    if embedding.iter().all(|x| *x == 0.0) {
        return Ok(());
    }
    let norm = l2_norm(embedding);
    if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        return Err(StoreError::NotNormalized { norm });
    }
    Ok(())
}

/// A scored search hit. `score` is the cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: MemoryEntry,
    pub score: f64,
}

/// Id-keyed collection of memory entries with file persistence.
#[derive(Debug)]
pub struct VectorStore {
    path: Option<PathBuf>,
    entries: HashMap<String, MemoryEntry>,
}

impl VectorStore {
    /// Open the store persisted at `path`.
    ///
    /// A missing or unreadable file yields an empty store; entries with malformed
    /// embeddings are dropped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let loaded = match persist::load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store file unreadable, starting empty");
                Vec::new()
            }
        };

        let mut entries = HashMap::with_capacity(loaded.len());
        for entry in loaded {
            if let Err(e) = validate_embedding(&entry.embedding) {
                tracing::warn!(id = %entry.id, error = %e, "skipping entry with malformed embedding");
                continue;
            }
            entries.insert(entry.id.clone(), entry);
        }

        tracing::debug!(path = %path.display(), count = entries.len(), "store loaded");
        Self {
            path: Some(path),
            entries,
        }
    }

    /// A store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: HashMap::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert an entry, or overwrite it if `id` already exists. Generates a UUID v7
    /// id when none is given. Persists.
    pub fn add(
        &mut self,
        content: impl Into<String>,
        embedding: Vec<f32>,
        metadata: MemoryMetadata,
        id: Option<String>,
    ) -> Result<String, StoreError> {
        validate_embedding(&embedding)?;
        let id = id.unwrap_or_else(new_entry_id);
        self.entries.insert(
            id.clone(),
            MemoryEntry {
                id: id.clone(),
                content: content.into(),
                embedding,
                metadata,
            },
        );
        self.sync();
        Ok(id)
    }

    /// Apply `update` to the entry with `id` and persist.
    ///
    /// The change is discarded if it leaves a malformed embedding or alters the id.
    /// Returns `Ok(false)` when no such entry exists.
    pub fn update(
        &mut self,
        id: &str,
        update: impl FnOnce(&mut MemoryEntry),
    ) -> Result<bool, StoreError> {
        let Some(existing) = self.entries.get(id) else {
            return Ok(false);
        };
        let mut changed = existing.clone();
        update(&mut changed);
        validate_embedding(&changed.embedding)?;
        changed.id = id.to_string();
        self.entries.insert(id.to_string(), changed);
        self.sync();
        Ok(true)
    }

    /// Remove by id. Returns `true` if it existed. Persists on removal.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.entries.remove(id).is_some() {
            self.sync();
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &str) -> Option<&MemoryEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in no particular order.
    pub fn all_entries(&self) -> Vec<&MemoryEntry> {
        self.entries.values().collect()
    }

    /// Remove every entry. Persists.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.sync();
    }

    /// Top-`top_k` entries by cosine similarity with score ≥ `threshold`, best first.
    ///
    /// `filter` is applied before scoring so rejected entries cost nothing. Linear in
    /// the number of entries.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f64,
        filter: Option<&dyn Fn(&MemoryEntry) -> bool>,
    ) -> Vec<SearchHit> {
        let mut scored: Vec<(&MemoryEntry, f64)> = self
            .entries
            .values()
            .filter(|entry| filter.is_none_or(|f| f(entry)))
            .map(|entry| {
                let score = f64::from(cosine_similarity(query_embedding, &entry.embedding));
                (entry, score)
            })
            .filter(|(_, score)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(entry, score)| SearchHit {
                entry: entry.clone(),
                score,
            })
            .collect()
    }

    /// Record a retrieval of each id: bump `access_count`, stamp `last_accessed`.
    ///
    /// Kept in memory only; the next mutation writes it out.
    pub fn touch<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>, now: DateTime<Utc>) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.metadata.access_count = entry.metadata.access_count.saturating_add(1);
                entry.metadata.last_accessed = now;
            }
        }
    }

    /// Recompute every embedding with `embed`, persisting once at the end.
    ///
    /// Entries whose new embedding is malformed keep their old one. Returns the
    /// number of entries updated.
    pub fn replace_embeddings(
        &mut self,
        mut embed: impl FnMut(&MemoryEntry) -> Vec<f32>,
    ) -> usize {
        let mut updated = 0;
        for entry in self.entries.values_mut() {
            let fresh = embed(entry);
            match validate_embedding(&fresh) {
                Ok(()) => {
                    entry.embedding = fresh;
                    updated += 1;
                }
                Err(e) => tracing::warn!(id = %entry.id, error = %e, "re-embedding rejected"),
            }
        }
        self.sync();
        updated
    }

    /// Write the current state to the backing file.
    pub fn flush(&self) -> Result<(), PersistError> {
        match &self.path {
            Some(path) => persist::save_entries(path, self.entries.values()),
            None => Ok(()),
        }
    }

    /// Best-effort flush: failures are logged and otherwise ignored.
    fn sync(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to persist memory store; keeping in-memory state");
        }
    }
}

/// A fresh entry id: UUID v7 in simple (hyphen-free) form.
pub fn new_entry_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}
