pub mod chunking;
pub mod documents;
pub mod embeddings;
pub mod errors;
pub mod pipeline;
pub mod vector_store;

pub use chunking::{chunk_documents, chunk_text, Chunk, ChunkMetadata};
pub use documents::{load_documents, Document, SourceDocument};
pub use embeddings::{embedder_from_config, Embedder, HashingEmbedder, OpenAiEmbedder};
pub use errors::RagError;
pub use pipeline::{InitReport, PipelineSettings, RagPipeline, RagStats};
pub use vector_store::{SearchHit, VectorStore, VectorStoreStats};
