use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use techpro_core::AppConfig;

use crate::chunking::{chunk_documents, Chunk};
use crate::documents::load_documents;
use crate::embeddings::Embedder;
use crate::errors::RagError;
use crate::vector_store::{SearchHit, VectorStore, VectorStoreStats};

pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub documents_dir: PathBuf,
    pub index_path: Option<PathBuf>,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            documents_dir: config.data.documents_dir.clone(),
            index_path: Some(config.rag.index_path.clone()),
            top_k: config.rag.top_k,
            chunk_size: config.rag.chunk_size,
            chunk_overlap: config.rag.chunk_overlap,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub chunks: usize,
    pub loaded_from_cache: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct RagStats {
    pub vector_store: VectorStoreStats,
    pub top_k: usize,
    pub documents_path: String,
    pub embedder: &'static str,
}

/// Document retrieval: load, chunk, embed, index, then nearest-neighbour lookup.
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    settings: PipelineSettings,
    store: RwLock<VectorStore>,
}

impl RagPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, settings: PipelineSettings) -> Self {
        let store = RwLock::new(VectorStore::new(embedder.dimension()));
        Self { embedder, settings, store }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Builds the index from the documents directory, reusing a saved index for an unchanged corpus.
    pub async fn initialize(&self) -> Result<InitReport, RagError> {
        let documents = load_documents(&self.settings.documents_dir).await;
        let chunks =
            chunk_documents(&documents, self.settings.chunk_size, self.settings.chunk_overlap);
        let fingerprint = corpus_fingerprint(self.embedder.as_ref(), &chunks);

        let mut store = self.store.write().await;
        store.clear();

        if let Some(path) = &self.settings.index_path {
            if store.load(path, &fingerprint).await {
                return Ok(InitReport { chunks: store.len(), loaded_from_cache: true });
            }
        }

        if chunks.is_empty() {
            warn!(event_name = "rag.initialize.no_documents", "no documents found to index");
            return Ok(InitReport { chunks: 0, loaded_from_cache: false });
        }

        info!(
            event_name = "rag.initialize.embedding",
            chunks = chunks.len(),
            embedder = self.embedder.name(),
            "building vector store"
        );
        let (texts, metadata): (Vec<String>, Vec<_>) =
            chunks.into_iter().map(|chunk| (chunk.text, chunk.metadata)).unzip();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let count = texts.len();
        store.add_documents(embeddings, texts, metadata)?;

        if let Some(path) = &self.settings.index_path {
            store.save(path, &fingerprint).await?;
        }

        Ok(InitReport { chunks: count, loaded_from_cache: false })
    }

    /// Nearest chunks for `query`; embedding or index failures yield no results.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Vec<SearchHit> {
        let top_k = top_k.unwrap_or(self.settings.top_k);

        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(
                    event_name = "rag.retrieve.embedding_failed",
                    error = %err,
                    "query embedding failed, returning no context"
                );
                return Vec::new();
            }
        };

        let hits = match self.store.read().await.search(&embedding, top_k) {
            Ok(hits) => hits,
            Err(err) => {
                warn!(event_name = "rag.retrieve.search_failed", error = %err, "vector search failed");
                return Vec::new();
            }
        };

        info!(
            event_name = "rag.retrieve.completed",
            results = hits.len(),
            query = %query.chars().take(50).collect::<String>(),
            "retrieved documents"
        );
        hits
    }

    pub async fn context(&self, query: &str, top_k: Option<usize>) -> String {
        format_context(&self.retrieve(query, top_k).await)
    }

    pub async fn stats(&self) -> RagStats {
        RagStats {
            vector_store: self.store.read().await.stats(),
            top_k: self.settings.top_k,
            documents_path: self.settings.documents_dir.display().to_string(),
            embedder: self.embedder.name(),
        }
    }
}

pub fn format_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RELEVANT_INFORMATION.to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(index, hit)| format!("[Source {}: {}]\n{}\n", index + 1, hit.metadata.title, hit.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Identifies the embedded corpus so a saved index is only reused for identical input.
fn corpus_fingerprint(embedder: &dyn Embedder, chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(embedder.name().as_bytes());
    hasher.update(&embedder.dimension().to_le_bytes());
    for chunk in chunks {
        hasher.update(chunk.metadata.doc_type.as_bytes());
        hasher.update(&[0]);
        hasher.update(chunk.metadata.title.as_bytes());
        hasher.update(&[0]);
        hasher.update(chunk.text.as_bytes());
        hasher.update(&[0xff]);
    }
    hasher.finalize().to_hex().to_string()
}
