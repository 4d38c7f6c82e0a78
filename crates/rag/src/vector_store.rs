use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chunking::ChunkMetadata;
use crate::errors::RagError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct IndexedChunk {
    embedding: Vec<f32>,
    text: String,
    metadata: ChunkMetadata,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Squared euclidean distance to the query; smaller is closer.
    pub distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VectorStoreStats {
    pub total_documents: usize,
    pub index_size: usize,
    pub dimension: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    dimension: usize,
    fingerprint: String,
    entries: Vec<IndexedChunk>,
}

/// Exact nearest-neighbour index over a flat list of embeddings.
#[derive(Clone, Debug)]
pub struct VectorStore {
    dimension: usize,
    entries: Vec<IndexedChunk>,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, entries: Vec::new() }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_documents(
        &mut self,
        embeddings: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<(), RagError> {
        if embeddings.len() != texts.len() || texts.len() != metadata.len() {
            return Err(RagError::LengthMismatch {
                embeddings: embeddings.len(),
                texts: texts.len(),
                metadata: metadata.len(),
            });
        }
        if embeddings.is_empty() {
            warn!(event_name = "rag.index.empty_batch", "no documents to add");
            return Ok(());
        }
        if let Some(bad) = embeddings.iter().find(|embedding| embedding.len() != self.dimension) {
            return Err(RagError::DimensionMismatch { expected: self.dimension, actual: bad.len() });
        }

        let added = texts.len();
        self.entries.extend(
            embeddings
                .into_iter()
                .zip(texts)
                .zip(metadata)
                .map(|((embedding, text), metadata)| IndexedChunk { embedding, text, metadata }),
        );
        info!(event_name = "rag.index.added", added, total = self.entries.len(), "indexed chunks");
        Ok(())
    }

    /// Up to `top_k` closest entries, nearest first; ties keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, RagError> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.entries.is_empty() {
            warn!(event_name = "rag.index.empty", "vector store is empty");
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .entries
            .iter()
            .map(|entry| (squared_l2(query, &entry.embedding), entry))
            .collect();
        scored.sort_by(|left, right| left.0.total_cmp(&right.0));

        Ok(scored
            .into_iter()
            .take(top_k.min(self.entries.len()))
            .map(|(distance, entry)| SearchHit {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance,
            })
            .collect())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        info!(event_name = "rag.index.cleared", "vector store cleared");
    }

    pub fn stats(&self) -> VectorStoreStats {
        VectorStoreStats {
            total_documents: self.entries.len(),
            index_size: self.entries.len(),
            dimension: self.dimension,
        }
    }

    pub async fn save(&self, path: &Path, fingerprint: &str) -> Result<(), RagError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RagError::Io { path: parent.to_path_buf(), source })?;
        }

        let persisted = PersistedIndex {
            dimension: self.dimension,
            fingerprint: fingerprint.to_string(),
            entries: self.entries.clone(),
        };
        let encoded = serde_json::to_vec(&persisted)?;
        tokio::fs::write(path, encoded)
            .await
            .map_err(|source| RagError::Io { path: path.to_path_buf(), source })?;

        info!(
            event_name = "rag.index.saved",
            path = %path.display(),
            entries = self.entries.len(),
            "vector store saved"
        );
        Ok(())
    }

    /// Replaces the contents with a saved index when it matches `fingerprint` and the dimension.
    ///
    /// Returns `false` and leaves the store untouched when the file is missing,
    /// unreadable or stale.
    pub async fn load(&mut self, path: &Path, fingerprint: &str) -> bool {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(event_name = "rag.index.not_found", path = %path.display(), "no saved vector store");
                return false;
            }
            Err(err) => {
                warn!(event_name = "rag.index.read_failed", path = %path.display(), error = %err, "could not read vector store");
                return false;
            }
        };

        let persisted: PersistedIndex = match serde_json::from_slice(&raw) {
            Ok(persisted) => persisted,
            Err(err) => {
                warn!(event_name = "rag.index.decode_failed", path = %path.display(), error = %err, "could not decode vector store");
                return false;
            }
        };

        if persisted.dimension != self.dimension || persisted.fingerprint != fingerprint {
            info!(
                event_name = "rag.index.stale",
                path = %path.display(),
                saved_dimension = persisted.dimension,
                dimension = self.dimension,
                "saved vector store does not match the current corpus"
            );
            return false;
        }
        if persisted.entries.iter().any(|entry| entry.embedding.len() != self.dimension) {
            warn!(event_name = "rag.index.corrupt", path = %path.display(), "saved vector store has malformed embeddings");
            return false;
        }

        self.entries = persisted.entries;
        info!(
            event_name = "rag.index.loaded",
            path = %path.display(),
            entries = self.entries.len(),
            "vector store loaded"
        );
        true
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| (a - b) * (a - b)).sum()
}
