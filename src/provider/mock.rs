//! Deterministic embedding provider for tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use super::{EmbedError, EmbeddingProvider};

/// Produces embeddings by spreading a hash of the input text across the
/// configured number of dimensions: identical texts map to identical vectors,
/// different texts to different ones, with no model download or network call.
/// Vectors are unit-normalized so cosine arithmetic behaves like the real
/// thing.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_embedding(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            let value = (state as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);

            let mut h = DefaultHasher::new();
            state.hash(&mut h);
            state = h.finish();
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.hash_to_embedding(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock-hash-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_embedding() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("world").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_dimensions_respected() {
        let provider = MockEmbeddingProvider::new(384);
        let embedding = provider.embed("test").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }

    #[tokio::test]
    async fn test_unit_norm() {
        let provider = MockEmbeddingProvider::new(64);
        let embedding = provider.embed("normalize me").await.unwrap();
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
