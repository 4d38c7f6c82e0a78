use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use techpro_core::config::{AppConfig, LlmProvider};

use crate::errors::RagError;

const OPENAI_BATCH_SIZE: usize = 96;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Picks the remote embedding API when an OpenAI key is configured, else the local hashing embedder.
pub fn embedder_from_config(config: &AppConfig) -> Result<Arc<dyn Embedder>, RagError> {
    let remote_key = match config.llm.provider {
        LlmProvider::OpenAi => config.llm.api_key.clone(),
        LlmProvider::Ollama | LlmProvider::Offline => None,
    };

    match (remote_key, config.llm.base_url.as_deref()) {
        (Some(api_key), Some(base_url)) if !api_key.expose_secret().trim().is_empty() => {
            info!(
                event_name = "rag.embedder.selected",
                embedder = "openai",
                model = %config.embedding.model,
                "using remote embeddings"
            );
            Ok(Arc::new(OpenAiEmbedder::new(
                base_url,
                api_key,
                &config.embedding.model,
                Duration::from_secs(config.llm.timeout_secs),
            )?))
        }
        _ => {
            info!(
                event_name = "rag.embedder.selected",
                embedder = "hashing",
                dimension = config.embedding.local_dimension,
                "using local hashing embeddings"
            );
            Ok(Arc::new(HashingEmbedder::new(config.embedding.local_dimension)))
        }
    }
}

/// OpenAI-compatible `/embeddings` client.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            dimension: dimension_for_model(model),
        })
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&EmbeddingRequest { model: &self.model, input })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Http { status: status.as_u16(), body });
        }

        let mut payload: EmbeddingResponse = response.json().await?;
        if payload.data.len() != input.len() {
            return Err(RagError::Decode(format!(
                "requested {} embeddings, received {}",
                input.len(),
                payload.data.len()
            )));
        }
        payload.data.sort_by_key(|item| item.index);

        payload
            .data
            .into_iter()
            .map(|item| {
                if item.embedding.len() == self.dimension {
                    Ok(item.embedding)
                } else {
                    Err(RagError::DimensionMismatch {
                        expected: self.dimension,
                        actual: item.embedding.len(),
                    })
                }
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut embeddings = self.request(&[text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| RagError::Decode("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(OPENAI_BATCH_SIZE) {
            debug!(
                event_name = "rag.embedder.batch",
                embedder = "openai",
                size = batch.len(),
                "requesting embeddings"
            );
            embeddings.extend(self.request(batch).await?);
        }
        Ok(embeddings)
    }
}

pub fn dimension_for_model(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Local feature-hashing bag of words over unigrams and bigrams, L2-normalised.
///
/// Deterministic across runs and platforms, so cached indexes stay valid.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let tokens = tokenize(text);

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), 0.5);
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|value| *value /= norm);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = blake3::hash(feature);
        let bytes = hash.as_bytes();
        let mut slot = [0_u8; 8];
        slot.copy_from_slice(&bytes[..8]);
        let index = (u64::from_le_bytes(slot) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }
}
