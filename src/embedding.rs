//! Text embeddings for semantic nearest-neighbor matching.
//!
//! [`TextEmbedder`] is the seam for any encoder. With the `embeddings-candle`
//! feature a sentence-transformer model runs locally through candle (see
//! `candle_embedder`). The built-in [`NgramEmbedder`] is the offline fallback: it
//! hashes character trigrams into a fixed-size, L2-normalized vector and needs no
//! model files. [`EmbeddingIndex`] encodes each
//! reference list once and reuses the vectors until the list is reloaded.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::catalog::{ListName, ReferenceList};
use crate::error::{CleanError, Result};
use crate::text::fold_for_match;

pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NgramEmbedder {
    dimension: usize,
    n: usize,
}

impl Default for NgramEmbedder {
    fn default() -> Self {
        Self {
            dimension: 256,
            n: 3,
        }
    }
}

impl NgramEmbedder {
    pub fn new(dimension: usize, n: usize) -> Result<Self> {
        if dimension == 0 || n == 0 {
            return Err(CleanError::Embedding(format!(
                "invalid n-gram embedder shape: dimension={}, n={}",
                dimension, n
            )));
        }
        Ok(Self { dimension, n })
    }
}

/// FNV-1a, so vectors are stable across processes.
fn fnv1a(chars: &[char]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for c in chars {
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    hash
}

impl TextEmbedder for NgramEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dimension];
        let folded = fold_for_match(text);
        if folded.is_empty() {
            return Ok(vector);
        }
        let padded: Vec<char> = format!(" {} ", folded).chars().collect();
        let n = self.n.min(padded.len());
        for gram in padded.windows(n) {
            let slot = (fnv1a(gram) % self.dimension as u64) as usize;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

type EmbedderFactory = Box<dyn Fn() -> Result<Arc<dyn TextEmbedder>> + Send + Sync>;

struct IndexedList {
    source: Arc<ReferenceList>,
    vectors: Vec<Vec<f32>>,
}

pub struct EmbeddingIndex {
    factory: EmbedderFactory,
    embedder: OnceLock<Arc<dyn TextEmbedder>>,
    init_lock: Mutex<()>,
    lists: RwLock<HashMap<ListName, Arc<IndexedList>>>,
}

impl EmbeddingIndex {
    /// The factory runs at most once, on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TextEmbedder>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            embedder: OnceLock::new(),
            init_lock: Mutex::new(()),
            lists: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_embedder(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self::new(move || Ok(embedder.clone()))
    }

    fn embedder(&self) -> Result<Arc<dyn TextEmbedder>> {
        if let Some(embedder) = self.embedder.get() {
            return Ok(embedder.clone());
        }
        let _guard = self.init_lock.lock();
        if let Some(embedder) = self.embedder.get() {
            return Ok(embedder.clone());
        }
        let embedder = (self.factory)()?;
        info!("Initialized text embedder (dimension {})", embedder.dimension());
        Ok(self.embedder.get_or_init(|| embedder).clone())
    }

    fn indexed(&self, list: &Arc<ReferenceList>) -> Result<Arc<IndexedList>> {
        if let Some(indexed) = self.lists.read().get(&list.name()) {
            if Arc::ptr_eq(&indexed.source, list) {
                return Ok(indexed.clone());
            }
        }
        let mut lists = self.lists.write();
        if let Some(indexed) = lists.get(&list.name()) {
            if Arc::ptr_eq(&indexed.source, list) {
                return Ok(indexed.clone());
            }
        }
        let embedder = self.embedder()?;
        let texts: Vec<&str> = list.entries().iter().map(String::as_str).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(CleanError::Embedding(format!(
                "embedder returned {} vectors for {} {} entries",
                vectors.len(),
                texts.len(),
                list.name()
            )));
        }
        debug!("Encoded {} list: {} vectors", list.name(), vectors.len());
        let indexed = Arc::new(IndexedList {
            source: list.clone(),
            vectors,
        });
        lists.insert(list.name(), indexed.clone());
        Ok(indexed)
    }

    /// Closest list entry to `value` by cosine similarity.
    pub fn nearest(&self, list: &Arc<ReferenceList>, value: &str) -> Result<Option<(String, f64)>> {
        if list.is_empty() {
            return Ok(None);
        }
        let indexed = self.indexed(list)?;
        let query = self.embedder()?.embed(value)?;
        let best = indexed
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query, v)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        Ok(best.map(|(i, score)| (list.entries()[i].clone(), score)))
    }
}

/// Embedder used when none is supplied: the named candle model when the crate is
/// built with `embeddings-candle`, the n-gram embedder otherwise or when the
/// model cannot be loaded.
pub fn default_embedder(model: Option<&str>) -> Arc<dyn TextEmbedder> {
    let Some(model) = model else {
        return Arc::new(NgramEmbedder::default());
    };
    #[cfg(feature = "embeddings-candle")]
    {
        match crate::candle_embedder::CandleTextEmbedder::new(model) {
            Ok(embedder) => return Arc::new(embedder),
            Err(e) => warn!("Embedding model {} unavailable, using n-gram embedder: {}", model, e),
        }
    }
    #[cfg(not(feature = "embeddings-candle"))]
    warn!(
        "Embedding model {} requested but built without embeddings-candle, using n-gram embedder",
        model
    );
    Arc::new(NgramEmbedder::default())
}
