//! Collaborator traits for persistence and note lookup, plus in-memory
//! implementations.
//!
//! The core never manages schemas or transactions; it issues per-note
//! delete/insert calls and reads note bodies, titles and tags through these
//! traits. The in-memory variants back the test suite and double as a
//! reference for host integrations; they count persistence calls so tests can
//! assert that cache hits stay write-free.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::{Block, Note};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Persistence collaborator. Writes are scoped per note id; superseding a
/// note's blocks is a delete followed by an insert, and atomicity of that
/// pair is the backend's responsibility.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn delete_blocks(&self, note_id: &str) -> Result<(), StoreError>;
    async fn insert_blocks(&self, blocks: &[Block]) -> Result<(), StoreError>;
}

/// Host-side note lookup: full bodies for excerpt extraction, titles for
/// grouped results, tags for exclusion checks.
#[async_trait]
pub trait NoteSource: Send + Sync {
    async fn note_body(&self, note_id: &str) -> Result<Option<String>, StoreError>;
    async fn note_title(&self, note_id: &str) -> Result<Option<String>, StoreError>;
    async fn note_tags(&self, note_id: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory [`BlockStore`] with call counters.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: Mutex<Vec<Block>>,
    delete_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_blocks(&self) -> Vec<Block> {
        self.blocks.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn blocks_for(&self, note_id: &str) -> Vec<Block> {
        self.all_blocks()
            .into_iter()
            .filter(|b| b.note_id == note_id)
            .collect()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn delete_blocks(&self, note_id: &str) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut blocks = self
            .blocks
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        blocks.retain(|b| b.note_id != note_id);
        Ok(())
    }

    async fn insert_blocks(&self, new_blocks: &[Block]) -> Result<(), StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut blocks = self
            .blocks
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        blocks.extend_from_slice(new_blocks);
        Ok(())
    }
}

/// In-memory [`NoteSource`].
#[derive(Default)]
pub struct MemoryNotes {
    notes: Mutex<HashMap<String, Note>>,
    tags: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_note(&self, note: Note) {
        if let Ok(mut notes) = self.notes.lock() {
            notes.insert(note.id.clone(), note);
        }
    }

    pub fn tag_note(&self, note_id: &str, tag: &str) {
        if let Ok(mut tags) = self.tags.lock() {
            tags.entry(note_id.to_string())
                .or_default()
                .push(tag.to_string());
        }
    }
}

#[async_trait]
impl NoteSource for MemoryNotes {
    async fn note_body(&self, note_id: &str) -> Result<Option<String>, StoreError> {
        let notes = self
            .notes
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(notes.get(note_id).map(|n| n.body.clone()))
    }

    async fn note_title(&self, note_id: &str) -> Result<Option<String>, StoreError> {
        let notes = self
            .notes
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(notes.get(note_id).map(|n| n.title.clone()))
    }

    async fn note_tags(&self, note_id: &str) -> Result<Vec<String>, StoreError> {
        let tags = self
            .tags
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(tags.get(note_id).cloned().unwrap_or_default())
    }
}
