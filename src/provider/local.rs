//! fastembed-backed embedding provider.
//!
//! Wraps a local ONNX model: lazy download into a cache directory on first
//! use, dimension probing, and single-text embedding through the
//! [`EmbeddingProvider`] trait.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};

use super::{EmbedError, EmbeddingProvider};

/// Local embedding model. Uses a Mutex because fastembed's embed() requires
/// `&mut self`; the guard is never held across an await point.
pub struct LocalEmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl LocalEmbeddingModel {
    /// Load (downloading if necessary) the named model.
    ///
    /// Models are cached in the `models/` subdirectory of `cache_dir`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbedError> {
        let model_enum = Self::parse_model_name(model_name)?;

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbedError::InitFailed(format!("failed to create models directory: {}", e))
        })?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(false);

        let mut model =
            TextEmbedding::try_new(options).map_err(|e| EmbedError::InitFailed(e.to_string()))?;

        let dimensions = Self::probe_dimensions(&mut model)?;
        log::info!(
            "loaded embedding model '{}' ({} dimensions)",
            model_name,
            dimensions
        );

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbedError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-small-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGESmallENV15Q),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-base-en-v1.5-q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
            _ => Err(EmbedError::InvalidModel(format!(
                "unknown model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, \
                 bge-base-en-v1.5 (add -q suffix for quantized)",
                name
            ))),
        }
    }

    /// Probe the model with a throwaway input to learn its output width.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbedError> {
        let probe = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbedError::InitFailed(format!("failed to probe dimensions: {}", e)))?;

        probe
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbedError::InitFailed("model returned no embedding".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbedError::EmbeddingFailed(format!("model lock poisoned: {}", e)))?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbedError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::EmbeddingFailed("no embedding returned".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_name() {
        let dir = std::env::temp_dir().join("jarvis-embed-invalid");
        let result = LocalEmbeddingModel::new("nonexistent-model", dir);
        assert!(matches!(result, Err(EmbedError::InvalidModel(_))));
    }

    #[tokio::test]
    #[ignore = "requires model download"]
    async fn test_embed_produces_fixed_width_vectors() {
        let dir = std::env::temp_dir().join(format!("jarvis-embed-{}", std::process::id()));
        let model = LocalEmbeddingModel::new("all-MiniLM-L6-v2", dir.clone()).unwrap();

        assert_eq!(model.dimensions(), 384);
        let embedding = model.embed("hello world").await.unwrap();
        assert_eq!(embedding.len(), 384);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
