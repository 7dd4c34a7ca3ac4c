//! Sentence-transformer embeddings computed locally with candle.
//!
//! Weights, config and tokenizer are fetched from the HuggingFace Hub on first
//! use and cached under `HF_HOME` (or the platform cache directory).

use std::fmt::Display;
use std::fs;
use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::ApiBuilder;
use tokenizers::Tokenizer;
use tracing::info;

use crate::embedding::TextEmbedder;
use crate::error::{CleanError, Result};

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

fn model_err(stage: &str, e: impl Display) -> CleanError {
    CleanError::Embedding(format!("{}: {}", stage, e))
}

fn hub_cache_dir() -> PathBuf {
    std::env::var_os("HF_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("huggingface")))
        .unwrap_or_else(|| std::env::temp_dir().join("huggingface"))
}

/// BERT encoder with mean pooling over the attention mask and L2 normalization.
pub struct CandleTextEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl CandleTextEmbedder {
    /// Load `model_name` from the Hub, downloading it when not cached.
    pub fn new(model_name: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0).map_err(|e| model_err("device setup", e))?;
        let api = ApiBuilder::new()
            .with_cache_dir(hub_cache_dir())
            .build()
            .map_err(|e| model_err("hub client", e))?;
        let repo = api.model(model_name.to_string());

        let config_path = repo.get("config.json").map_err(|e| model_err("config download", e))?;
        let config: Config = serde_json::from_str(&fs::read_to_string(config_path)?)?;

        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| model_err("weights download", e))?;
        // SAFETY: the weights file is owned by the hub cache and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| model_err("weights load", e))?
        };
        let model = BertModel::load(vb, &config).map_err(|e| model_err("model load", e))?;

        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| model_err("tokenizer download", e))?;
        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| model_err("tokenizer load", e))?;

        info!("Loaded embedding model {} on {:?}", model_name, device);
        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
        })
    }

    fn encode(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("tokenization failed: {}", e)))?;
        let ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_types = ids.zeros_like()?;

        let hidden = self.model.forward(&ids, &token_types, Some(&mask))?;
        let mask = mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
        let pooled = hidden
            .broadcast_mul(&mask)?
            .sum(1)?
            .broadcast_div(&mask.sum(1)?)?;
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        pooled.broadcast_div(&norm)?.squeeze(0)?.to_vec1::<f32>()
    }
}

impl TextEmbedder for CandleTextEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(text).map_err(|e| model_err("inference", e))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
