//! MiniLM sentence embedder using Candle.
//!
//! Uses `sentence-transformers/all-MiniLM-L6-v2`:
//! - 384 dimensions
//! - 256 max tokens (longer inputs are truncated)
//! - BERT architecture, attention-masked mean pooling

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use docrag_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Model identifier on HuggingFace Hub.
pub const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedding dimension for all-MiniLM-L6-v2.
const EMBEDDING_DIM: usize = 384;

/// Maximum sequence length the model was trained with.
const MAX_TOKENS: usize = 256;

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// MiniLM embedder. Weights are fetched and loaded on first use.
pub struct CandleEmbedder {
    /// Device to run inference on (CPU or CUDA)
    device: Device,
    /// Directory for downloaded model files
    cache_dir: PathBuf,
    loaded: OnceCell<LoadedModel>,
}

impl CandleEmbedder {
    /// Create a new embedder caching model files under `cache_dir`.
    pub fn new(cache_dir: PathBuf) -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        info!("CandleEmbedder using device: {:?}", device);
        Self::with_device(cache_dir, device)
    }

    /// Create with specific device.
    pub fn with_device(cache_dir: PathBuf, device: Device) -> Self {
        Self {
            device,
            cache_dir,
            loaded: OnceCell::new(),
        }
    }

    /// Download (if needed) and load the model. Later calls are no-ops.
    pub async fn init(&self) -> Result<(), EmbedError> {
        self.loaded().await.map(|_| ())
    }

    async fn loaded(&self) -> Result<&LoadedModel, EmbedError> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<LoadedModel, EmbedError> {
        info!("Loading embedding model {}", MODEL_ID);

        let api = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .build()
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to create HF API: {e}")))?;
        let repo = api.repo(Repo::new(MODEL_ID.to_string(), RepoType::Model));

        let mut paths = Vec::with_capacity(3);
        for file in ["tokenizer.json", "config.json", "model.safetensors"] {
            debug!("Fetching {}", file);
            let path = repo
                .get(file)
                .await
                .map_err(|e| EmbedError::ModelLoad(format!("Failed to download {file}: {e}")))?;
            paths.push(path);
        }
        let [tokenizer_path, config_path, weights_path] = <[PathBuf; 3]>::try_from(paths)
            .map_err(|_| EmbedError::ModelLoad("incomplete model download".to_string()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to load tokenizer: {e}")))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to configure truncation: {e}")))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        let config_str = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to read config: {e}")))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to parse config: {e}")))?;

        // SAFETY: the weights file is only read, and stays in the HF cache for the process lifetime.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &self.device)
                .map_err(|e| EmbedError::ModelLoad(format!("Failed to load weights: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to create BERT model: {e}")))?;

        info!("Embedding model loaded");
        Ok(LoadedModel { model, tokenizer })
    }

    /// Encode one batch. The tokenizer pads every row to the longest input.
    async fn encode_batch(
        &self,
        texts: &[&str],
        normalize: bool,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let loaded = self.loaded().await?;

        let encodings = loaded
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedError::Inference(format!("Tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.len());

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut token_counts = Vec::with_capacity(batch_size);
        for encoding in &encodings {
            input_ids.extend_from_slice(encoding.get_ids());
            attention_mask.extend_from_slice(encoding.get_attention_mask());
            token_counts.push(encoding.get_attention_mask().iter().filter(|m| **m == 1).count());
        }

        let tensor = |data: Vec<u32>, name: &str| {
            Tensor::from_vec(data, (batch_size, seq_len), &self.device)
                .map_err(|e| EmbedError::Inference(format!("Failed to create {name} tensor: {e}")))
        };
        let input_ids = tensor(input_ids, "input_ids")?;
        let attention_mask = tensor(attention_mask, "attention_mask")?;
        let token_type_ids = input_ids
            .zeros_like()
            .map_err(|e| EmbedError::Inference(format!("Failed to create token_type_ids: {e}")))?;

        let output = loaded
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| EmbedError::Inference(format!("Model forward failed: {e}")))?;

        let pooled = mean_pooling(&output, &attention_mask)?;
        let pooled = if normalize {
            l2_normalize(&pooled)?
        } else {
            pooled
        };

        let rows = pooled
            .to_vec2::<f32>()
            .map_err(|e| EmbedError::Inference(format!("Failed to convert to vec: {e}")))?;

        Ok(rows
            .into_iter()
            .zip(token_counts)
            .map(|(embedding, token_count)| EmbeddingOutput {
                embedding,
                token_count,
            })
            .collect())
    }
}

/// Mean of token embeddings, ignoring padding.
fn mean_pooling(token_embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbedError> {
    let inference = |e: candle_core::Error| EmbedError::Inference(format!("pooling failed: {e}"));

    let mask = attention_mask
        .unsqueeze(2)
        .and_then(|m| m.to_dtype(DType::F32))
        .and_then(|m| m.broadcast_as(token_embeddings.shape()))
        .map_err(inference)?;

    let sum = token_embeddings.mul(&mask).and_then(|t| t.sum(1)).map_err(inference)?;
    let count = mask
        .sum(1)
        .and_then(|c| c.clamp(1e-9, f64::MAX))
        .map_err(inference)?;

    sum.div(&count).map_err(inference)
}

fn l2_normalize(embeddings: &Tensor) -> Result<Tensor, EmbedError> {
    let inference =
        |e: candle_core::Error| EmbedError::Inference(format!("normalization failed: {e}"));

    let norm = embeddings
        .sqr()
        .and_then(|t| t.sum_keepdim(1))
        .and_then(|t| t.sqrt())
        .and_then(|t| t.clamp(1e-12, f64::MAX))
        .map_err(inference)?;

    embeddings.broadcast_div(&norm).map_err(inference)
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn model_name(&self) -> &str {
        MODEL_ID
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn max_tokens(&self) -> usize {
        MAX_TOKENS
    }

    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts with batch_size {}",
            texts.len(),
            config.batch_size
        );

        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(config.batch_size.max(1)) {
            all_results.extend(self.encode_batch(chunk, config.normalize).await?);
        }

        Ok(all_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_candle_embedder() {
        let cache_dir = tempdir().unwrap();
        let embedder = CandleEmbedder::new(cache_dir.path().to_path_buf());

        embedder.init().await.unwrap();

        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.model_name(), MODEL_ID);

        let config = EmbeddingConfig::default();
        let results = embedder
            .embed_text(&["Hello world", "This is a test"], &config)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].embedding.len(), 384);

        let norm: f32 = results[0].embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);

        let single = embedder.embed_query("This is a test", &config).await.unwrap();
        let diff: f32 = single
            .embedding
            .iter()
            .zip(&results[1].embedding)
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff < 1e-3);
    }
}
