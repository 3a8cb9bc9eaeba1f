//! Core data types: notes, blocks and ranked results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Tag that removes a note and all its blocks from the searchable set.
pub const EXCLUDE_TAG: &str = "exclude.from.jarvis";

/// A note as handed over by the host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    /// Merge/edit conflict copies contribute no blocks.
    #[serde(default)]
    pub is_conflict: bool,
}

impl Note {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            is_conflict: false,
        }
    }
}

/// A size-bounded fragment of a note, the unit of embedding and retrieval.
///
/// All blocks of one note carry the hash of the *entire* note body at the time
/// they were computed, so a body change invalidates them together. `similarity`
/// is transient: populated during a query, never persisted as ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub note_id: String,
    /// Hex SHA-256 of the full note body at computation time.
    pub content_hash: String,
    /// 1-based line number in the note. Non-code blocks carry a historical
    /// minus-2 adjustment, so values at or below zero do occur.
    pub line: i64,
    /// Character offset into the note body, `-1` when unresolvable.
    pub body_offset: i64,
    /// Character length of the block's source text.
    pub length: usize,
    /// 0 (no heading) through 6, clamped.
    pub heading_level: u8,
    /// Nearest enclosing heading title, or "<lang> code block" for code.
    pub title: String,
    /// Unit L2-norm embedding vector.
    pub embedding: Vec<f32>,
    /// Query-time similarity score. Not meaningful outside a search.
    #[serde(default)]
    pub similarity: f32,
}

/// A ranked group of blocks belonging to one note.
///
/// Ungrouped searches return a single `NoteResult` with no note identity.
#[derive(Debug, Clone)]
pub struct NoteResult {
    pub note_id: String,
    pub note_title: String,
    /// Blocks in descending similarity order.
    pub blocks: Vec<Block>,
    pub aggregate_similarity: f32,
}

/// Digest of a note's full body, used to gate recomputation.
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}
