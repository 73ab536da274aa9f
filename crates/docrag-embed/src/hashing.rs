//! Feature-hashing embedder that needs no model download.
//!
//! Each lowercase alphanumeric token is hashed with blake3; the hash picks
//! a bucket and a sign, and the token adds +-1 to that bucket. Texts that
//! share words land close together under cosine similarity, which is enough
//! for offline runs, tests, and deployments that cannot ship model weights.

use async_trait::async_trait;
use docrag_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use tracing::debug;

/// Default dimension, matching `all-MiniLM-L6-v2`.
pub const DEFAULT_DIMENSION: usize = 384;

/// Nominal token budget. Longer inputs are embedded in full.
const MAX_TOKENS: usize = 8192;

/// Deterministic bag-of-words embedder.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create a hashing embedder with the default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Create a hashing embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Result<Self, EmbedError> {
        if dimension == 0 {
            return Err(EmbedError::ModelLoad(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_one(&self, text: &str, normalize: bool) -> EmbeddingOutput {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut token_count = 0;

        for token in tokens(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
            token_count += 1;
        }

        if normalize {
            l2_normalize(&mut embedding);
        }

        EmbeddingOutput {
            embedding,
            token_count,
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        MAX_TOKENS
    }

    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        debug!("Hashing {} texts into {} dims", texts.len(), self.dimension);
        Ok(texts
            .iter()
            .map(|text| self.embed_one(text, config.normalize))
            .collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Scale `v` to unit length. The zero vector is left as is.
fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
