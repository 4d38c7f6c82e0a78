use serde::{Deserialize, Serialize};

use crate::documents::SourceDocument;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_type: String,
    pub title: String,
    pub product_id: Option<u32>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Fixed windows of `chunk_size` characters, starting every `chunk_size - overlap` characters.
///
/// Every start offset below the text length yields a window, so the tail can be
/// shorter than `overlap`. Empty text yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = chunk_size.max(1);
    let step = size.saturating_sub(overlap).max(1);

    (0..chars.len())
        .step_by(step)
        .map(|start| chars[start..(start + size).min(chars.len())].iter().collect())
        .collect()
}

pub fn chunk_documents(documents: &[SourceDocument], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|source| {
            let metadata = ChunkMetadata {
                doc_type: source.doc_type.clone(),
                title: source.document.title().to_string(),
                product_id: source.document.product_id,
                category: source.document.category.clone(),
            };
            chunk_text(&source.document.text(), chunk_size, overlap)
                .into_iter()
                .map(move |text| Chunk { text, metadata: metadata.clone() })
        })
        .collect()
}
