//! Semantic search core for a note-taking assistant.
//!
//! Turns free-form notes into a searchable set of embedded text fragments
//! ("blocks") and answers nearest-neighbor queries against that set.
//!
//! # Architecture
//!
//! - `chunker`: heading/code-aware splitting of a note into size-bounded blocks
//! - `provider`: embedding generation behind an async trait (fastembed or mock)
//! - `engine`: content-hash gated recompute and per-note persistence
//! - `search`: cosine similarity ranking with optional per-note grouping
//! - `extract`: length-bounded excerpts and markdown reference links
//! - `store`: persistence and note-lookup collaborator traits
//!
//! The host application owns storage, settings and the UI; it reaches the core
//! through [`SemanticEngine`] and the collaborator traits in [`store`].

pub mod chunker;
pub mod config;
pub mod engine;
pub mod extract;
pub mod model;
pub mod provider;
pub mod search;
pub mod store;
pub mod vector;

#[cfg(test)]
mod tests;

pub use chunker::{chunk_note, BlockSource};
pub use config::{AggregationMode, ConfigError, SearchConfig};
pub use engine::SemanticEngine;
pub use extract::{extract_links, extract_text};
pub use model::{content_hash, Block, Note, NoteResult, EXCLUDE_TAG};
pub use provider::{EmbedError, EmbeddingProvider, LocalEmbeddingModel, MockEmbeddingProvider};
pub use store::{BlockStore, MemoryBlockStore, MemoryNotes, NoteSource, StoreError};

/// Errors surfaced by engine-level operations.
///
/// Collaborator failures keep their own error types and are wrapped here, so a
/// host can tell a dead embedding backend apart from a storage fault.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// No embedding provider was configured. Updates and queries both refuse
    /// to run without one; this is never silently degraded to empty results.
    #[error("no embedding provider available")]
    NoProvider,

    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
