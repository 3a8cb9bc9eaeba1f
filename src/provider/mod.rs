//! Embedding generation behind an async trait.
//!
//! The core only consumes embeddings; where they come from is the provider's
//! business. Two implementations ship with the crate:
//!
//! - `LocalEmbeddingModel`: fastembed-backed local inference
//! - `MockEmbeddingProvider`: deterministic hash-derived vectors for tests

mod local;
mod mock;

pub use local::LocalEmbeddingModel;
pub use mock::MockEmbeddingProvider;

use async_trait::async_trait;

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("model initialization failed: {0}")]
    InitFailed(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("invalid model name: {0}")]
    InvalidModel(String),

    #[error("embedding has zero norm and cannot be normalized")]
    ZeroNorm,
}

/// Maps a text string to a fixed-length vector.
///
/// Implementations must be thread-safe so they can be shared across
/// concurrent note updates via `Arc<dyn EmbeddingProvider>`. The core
/// normalizes every returned vector to unit L2 norm before storing or
/// comparing it; providers are not required to pre-normalize.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text input.
    ///
    /// Failures propagate to the caller; a note update or query never
    /// silently degrades to empty output when the backend is down.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Model name, for logs and traceability.
    fn name(&self) -> &str;
}
