//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a deterministic, model-free
//! implementation based on random indexing of word and character n-gram
//! features (384 dimensions, L2-normalized). The provider is created via
//! [`create_provider`] from configuration.

pub mod hashed;

use anyhow::Result;

/// Number of dimensions in the embedding vectors.
pub const EMBEDDING_DIM: usize = 384;

/// Tolerance used when checking that a vector has unit length.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`EMBEDDING_DIM`] dimensions that are
/// either L2-normalized or exactly zero (for text with no usable features).
/// Embedding never fails: every input maps to some vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Embed a batch of text strings. Implementations may override for batched work.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"hashed"` is supported.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashed" => Ok(Box::new(hashed::HashedEmbeddingProvider::new(
            config.cache_capacity,
        ))),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hashed"),
    }
}

/// Cosine similarity of two L2-normalized vectors, which is just their dot product.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// L2-normalize a vector in place. Leaves a zero vector untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 1e-10 {
        v.iter_mut().for_each(|x| *x /= norm);
    } else {
        v.iter_mut().for_each(|x| *x = 0.0);
    }
}
