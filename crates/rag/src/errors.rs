use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Decode(String),
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("got {embeddings} embeddings for {texts} texts and {metadata} metadata entries")]
    LengthMismatch { embeddings: usize, texts: usize, metadata: usize },
    #[error("vector index io failed for `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not encode vector index: {0}")]
    Encode(#[from] serde_json::Error),
}
