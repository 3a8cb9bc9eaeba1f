//! Content-hash gated embedding updates.
//!
//! Decides per note whether cached blocks are reusable or must be recomputed
//! through the chunker and the embedding provider, and issues the per-note
//! delete/insert pair that supersedes stale blocks. Notes are updated as an
//! unordered concurrent fan-out; concurrent updates of the *same* note are
//! last-write-wins by explicit policy, not coalesced.

use std::sync::Arc;

use futures::future::join_all;

use crate::chunker::chunk_note;
use crate::config::SearchConfig;
use crate::model::{content_hash, Block, Note, EXCLUDE_TAG};
use crate::provider::{EmbedError, EmbeddingProvider};
use crate::store::{BlockStore, NoteSource};
use crate::vector::normalize;
use crate::SearchError;

/// Coordinates chunking, embedding, caching and search over a note set.
///
/// Collaborators are trait objects so hosts can plug in their own storage and
/// inference backends. Built without a provider, every operation that needs
/// embeddings fails with [`SearchError::NoProvider`] rather than degrading to
/// empty results.
pub struct SemanticEngine {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Arc<dyn BlockStore>,
    notes: Arc<dyn NoteSource>,
    config: SearchConfig,
}

impl SemanticEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn BlockStore>,
        notes: Arc<dyn NoteSource>,
        config: SearchConfig,
    ) -> Self {
        Self {
            provider: Some(provider),
            store,
            notes,
            config,
        }
    }

    /// Build an engine with no embedding backend. Useful for hosts that
    /// discover provider availability at runtime; all embedding-dependent
    /// operations refuse to run.
    pub fn without_provider(
        store: Arc<dyn BlockStore>,
        notes: Arc<dyn NoteSource>,
        config: SearchConfig,
    ) -> Self {
        Self {
            provider: None,
            store,
            notes,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub(crate) fn notes(&self) -> &dyn NoteSource {
        self.notes.as_ref()
    }

    pub(crate) fn provider(&self) -> Result<&dyn EmbeddingProvider, SearchError> {
        self.provider
            .as_deref()
            .ok_or(SearchError::NoProvider)
    }

    /// Chunk and embed a body without touching persistence. Shared between
    /// note updates and query embedding.
    pub(crate) async fn compute_blocks(
        &self,
        note_id: &str,
        title: &str,
        body: &str,
        hash: &str,
    ) -> Result<Vec<Block>, SearchError> {
        let provider = self.provider()?;
        let sources = chunk_note(title, body, self.config.max_block_size);

        let mut blocks = Vec::with_capacity(sources.len());
        for source in sources {
            let raw = provider.embed(&source.embed_input).await?;
            let embedding = normalize(raw).ok_or(EmbedError::ZeroNorm)?;
            blocks.push(Block {
                note_id: note_id.to_string(),
                content_hash: hash.to_string(),
                line: source.line,
                body_offset: source.body_offset,
                length: source.length,
                heading_level: source.heading_level,
                title: source.title,
                embedding,
                similarity: 0.0,
            });
        }
        Ok(blocks)
    }

    /// Bring one note's blocks up to date.
    ///
    /// - conflict copies contribute no blocks and touch nothing;
    /// - notes carrying [`EXCLUDE_TAG`] get their persisted blocks deleted;
    /// - an unchanged body (hash match against `existing`) is a cache hit and
    ///   returns the prior blocks with no recompute and no writes;
    /// - otherwise the fresh block set supersedes all prior blocks for the id.
    pub async fn update_note(
        &self,
        note: &Note,
        existing: &[Block],
    ) -> Result<Vec<Block>, SearchError> {
        if note.is_conflict {
            return Ok(Vec::new());
        }

        let tags = self.notes.note_tags(&note.id).await?;
        if tags.iter().any(|t| t == EXCLUDE_TAG) {
            log::info!("note {} is excluded from search, dropping its blocks", note.id);
            self.store.delete_blocks(&note.id).await?;
            return Ok(Vec::new());
        }

        let hash = content_hash(&note.body);
        if existing
            .iter()
            .any(|b| b.note_id == note.id && b.content_hash == hash)
        {
            log::debug!("note {} unchanged, reusing cached blocks", note.id);
            return Ok(existing
                .iter()
                .filter(|b| b.note_id == note.id)
                .cloned()
                .collect());
        }

        let blocks = self
            .compute_blocks(&note.id, &note.title, &note.body, &hash)
            .await?;

        // Supersede, never merge: the old slice goes away even when the new
        // body chunks to nothing.
        self.store.delete_blocks(&note.id).await?;
        self.store.insert_blocks(&blocks).await?;
        log::debug!("note {} reindexed into {} blocks", note.id, blocks.len());

        Ok(blocks)
    }

    /// Update every given note concurrently and return the merged block list.
    ///
    /// Each note is an independent task reading the shared prior-block slice
    /// and writing only its own persisted slice. All tasks are awaited before
    /// the first error (if any) is reported, so one failing note never cuts
    /// another's update short.
    pub async fn update_all(
        &self,
        existing: &[Block],
        notes: &[Note],
    ) -> Result<Vec<Block>, SearchError> {
        let results = join_all(notes.iter().map(|n| self.update_note(n, existing))).await;

        let mut all = Vec::new();
        for result in results {
            all.extend(result?);
        }
        Ok(all)
    }
}
