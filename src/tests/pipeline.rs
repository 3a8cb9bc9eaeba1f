//! End-to-end pipeline tests with the deterministic mock provider:
//! update notes, search over the persisted blocks, render the output.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::extract::{extract_links, extract_text};
use crate::model::{content_hash, Note, EXCLUDE_TAG};
use crate::provider::MockEmbeddingProvider;
use crate::store::{MemoryBlockStore, MemoryNotes};
use crate::SemanticEngine;

const DIMS: usize = 64;

struct Fixture {
    engine: SemanticEngine,
    store: Arc<MemoryBlockStore>,
    notes: Arc<MemoryNotes>,
}

fn fixture(min_similarity: f32) -> Fixture {
    let store = Arc::new(MemoryBlockStore::new());
    let notes = Arc::new(MemoryNotes::new());
    let config = SearchConfig {
        min_similarity,
        ..Default::default()
    };
    let engine = SemanticEngine::new(
        Arc::new(MockEmbeddingProvider::new(DIMS)),
        store.clone(),
        notes.clone(),
        config,
    );
    Fixture {
        engine,
        store,
        notes,
    }
}

// The mock provider derives vectors from the exact input text, so a note
// titled "query" with body X embeds identically to the query X itself. That
// gives these tests one guaranteed-perfect match without a real model.

#[tokio::test]
async fn test_index_search_extract_roundtrip() {
    let f = fixture(0.99);

    let target = Note::new("memo", "query", "find me.");
    let other = Note::new("other", "Other Note", "completely unrelated words.");
    f.notes.add_note(target.clone());
    f.notes.add_note(other.clone());

    let blocks = f.engine.update_all(&[], &[target, other]).await.unwrap();
    assert_eq!(blocks.len(), 2);

    let results = f
        .engine
        .find_nearest(&f.store.all_blocks(), None, "find me.", true)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].note_id, "memo");
    assert_eq!(results[0].note_title, "query");
    assert!((results[0].blocks[0].similarity - 1.0).abs() < 1e-5);

    let text = extract_text(&results, 1000, f.notes.as_ref()).await.unwrap();
    assert_eq!(text, "# note 1: query\nfind me.\n");

    assert_eq!(extract_links(&results), "[query](:/memo)");
}

#[tokio::test]
async fn test_heading_match_links_with_anchor() {
    let f = fixture(0.99);

    let note = Note::new("memo", "query", "# My Section\nfind me.");
    f.notes.add_note(note.clone());
    f.engine.update_note(&note, &[]).await.unwrap();

    // the query chunks under the same synthetic title, so a query carrying
    // the same heading embeds to the same vector as the note's block
    let results = f
        .engine
        .find_nearest(
            &f.store.all_blocks(),
            None,
            "# My Section\nfind me.",
            true,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].blocks[0].heading_level, 1);
    assert_eq!(results[0].blocks[0].title, "My Section");
    assert_eq!(extract_links(&results), "[query](:/memo#my-section)");
}

#[tokio::test]
async fn test_edit_supersedes_and_search_follows() {
    let f = fixture(0.99);

    let v1 = Note::new("memo", "query", "old content here.");
    f.notes.add_note(v1.clone());
    let old_blocks = f.engine.update_note(&v1, &[]).await.unwrap();

    let v2 = Note::new("memo", "query", "new content here.");
    f.notes.add_note(v2.clone());
    f.engine.update_note(&v2, &old_blocks).await.unwrap();

    let persisted = f.store.blocks_for("memo");
    let new_hash = content_hash("new content here.");
    assert!(persisted.iter().all(|b| b.content_hash == new_hash));

    let results = f
        .engine
        .find_nearest(&f.store.all_blocks(), None, "new content here.", true)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].blocks[0].similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_exclusion_tag_removes_note_from_search() {
    let f = fixture(0.99);

    let note = Note::new("memo", "query", "soon to vanish.");
    f.notes.add_note(note.clone());
    f.engine.update_note(&note, &[]).await.unwrap();
    assert_eq!(f.store.blocks_for("memo").len(), 1);

    f.notes.tag_note("memo", EXCLUDE_TAG);
    let blocks = f.engine.update_note(&note, &[]).await.unwrap();
    assert!(blocks.is_empty());
    assert!(f.store.blocks_for("memo").is_empty());

    let results = f
        .engine
        .find_nearest(&f.store.all_blocks(), None, "soon to vanish.", true)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_conflict_copies_never_indexed() {
    let f = fixture(0.99);

    let mut conflict = Note::new("dup", "query", "duplicated text.");
    conflict.is_conflict = true;
    let clean = Note::new("memo", "query", "original text.");
    f.notes.add_note(conflict.clone());
    f.notes.add_note(clean.clone());

    let blocks = f.engine.update_all(&[], &[conflict, clean]).await.unwrap();

    assert_eq!(blocks.len(), 1);
    assert!(f.store.blocks_for("dup").is_empty());
    assert_eq!(f.store.blocks_for("memo").len(), 1);
}

#[tokio::test]
async fn test_flat_search_returns_single_anonymous_result() {
    let f = fixture(0.99);

    let note = Note::new("memo", "query", "find me.");
    f.notes.add_note(note.clone());
    f.engine.update_note(&note, &[]).await.unwrap();

    let results = f
        .engine
        .find_nearest(&f.store.all_blocks(), None, "find me.", false)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].note_id.is_empty());
    assert!(results[0].note_title.is_empty());
    assert_eq!(results[0].blocks.len(), 1);
}

#[tokio::test]
async fn test_search_excludes_the_asking_note() {
    let f = fixture(0.99);

    let note = Note::new("memo", "query", "find me.");
    f.notes.add_note(note.clone());
    f.engine.update_note(&note, &[]).await.unwrap();

    let results = f
        .engine
        .find_nearest(&f.store.all_blocks(), Some("memo"), "find me.", true)
        .await
        .unwrap();
    assert!(results.is_empty());
}
