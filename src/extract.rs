//! Rendering ranked results: length-bounded excerpts and reference links.

use crate::chunker::normalize_newlines;
use crate::model::NoteResult;
use crate::store::{NoteSource, StoreError};

/// Render ranked results into a single excerpt string within `max_length`
/// characters.
///
/// Blocks are visited in rank order. Each contributes a decoration line
/// (rank, note title, and the block title when it differs) followed by the
/// verbatim source slice at `[body_offset, body_offset + length)`. The first
/// block whose decorated text would push the total past the budget stops the
/// whole process; blocks with an unresolvable offset are skipped with a log
/// and cost nothing.
pub async fn extract_text(
    results: &[NoteResult],
    max_length: usize,
    notes: &dyn NoteSource,
) -> Result<String, StoreError> {
    let mut out = String::new();
    let mut total = 0usize;
    let mut rank = 0usize;

    'results: for result in results {
        for block in &result.blocks {
            rank += 1;

            if block.body_offset < 0 {
                log::debug!(
                    "skipping block of note {} with unresolved offset",
                    block.note_id
                );
                continue;
            }
            let Some(body) = notes.note_body(&block.note_id).await? else {
                log::warn!("note {} no longer exists, skipping block", block.note_id);
                continue;
            };

            let body = normalize_newlines(&body);
            let excerpt: String = body
                .chars()
                .skip(block.body_offset as usize)
                .take(block.length)
                .collect();

            let note_title = notes.note_title(&block.note_id).await?.unwrap_or_default();
            let mut decoration = format!("# note {}: {}", rank, note_title);
            if block.title != note_title {
                decoration.push_str(": ");
                decoration.push_str(&block.title);
            }

            let piece = format!("{}\n{}\n", decoration, excerpt);
            let piece_len = piece.chars().count();
            if total + piece_len > max_length {
                break 'results;
            }
            out.push_str(&piece);
            total += piece_len;
        }
    }

    Ok(out)
}

/// Render one markdown reference link per result, comma-separated.
///
/// Results whose top block sits under a heading get an anchor slug derived
/// from the block title.
pub fn extract_links(results: &[NoteResult]) -> String {
    let links: Vec<String> = results
        .iter()
        .filter_map(|result| {
            let block = result.blocks.first()?;
            let link = if block.heading_level > 0 {
                format!(
                    "[{}](:/{}#{})",
                    result.note_title,
                    result.note_id,
                    slugify(&block.title)
                )
            } else {
                format!("[{}](:/{})", result.note_title, result.note_id)
            };
            Some(link)
        })
        .collect();

    links.join(", ")
}

/// Anchor slug: lowercase, whitespace runs become single hyphens, everything
/// outside `[a-z0-9-]` is dropped, repeated hyphens collapse, edge hyphens
/// are trimmed.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_hyphen = false;

    for c in title.to_lowercase().chars() {
        let mapped = if c.is_whitespace() { '-' } else { c };
        if mapped == '-' {
            if !prev_hyphen && !out.is_empty() {
                out.push('-');
            }
            prev_hyphen = true;
        } else if mapped.is_ascii_lowercase() || mapped.is_ascii_digit() {
            out.push(mapped);
            prev_hyphen = false;
        }
        // anything else is dropped without resetting the hyphen run
    }

    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Note};
    use crate::store::MemoryNotes;

    fn block(note_id: &str, title: &str, offset: i64, length: usize, level: u8) -> Block {
        Block {
            note_id: note_id.to_string(),
            content_hash: "h".to_string(),
            line: 1,
            body_offset: offset,
            length,
            heading_level: level,
            title: title.to_string(),
            embedding: Vec::new(),
            similarity: 0.0,
        }
    }

    fn result(note_id: &str, note_title: &str, blocks: Vec<Block>) -> NoteResult {
        NoteResult {
            note_id: note_id.to_string(),
            note_title: note_title.to_string(),
            blocks,
            aggregate_similarity: 0.0,
        }
    }

    fn notes_with(id: &str, title: &str, body: &str) -> MemoryNotes {
        let notes = MemoryNotes::new();
        notes.add_note(Note::new(id, title, body));
        notes
    }

    #[tokio::test]
    async fn test_extract_text_slices_source_at_offsets() {
        let notes = notes_with("n1", "My Note", "# A\ntext one.\n## B\ntext two.");
        // "text two." lives at char offset 19
        let results = vec![result("n1", "My Note", vec![block("n1", "B", 19, 9, 2)])];

        let text = extract_text(&results, 1000, &notes).await.unwrap();
        assert_eq!(text, "# note 1: My Note: B\ntext two.\n");
    }

    #[tokio::test]
    async fn test_extract_text_omits_block_title_when_same_as_note() {
        let notes = notes_with("n1", "Same", "body text here.");
        let results = vec![result("n1", "Same", vec![block("n1", "Same", 0, 4, 0)])];

        let text = extract_text(&results, 1000, &notes).await.unwrap();
        assert_eq!(text, "# note 1: Same\nbody\n");
    }

    #[tokio::test]
    async fn test_extract_text_budget_smaller_than_first_block() {
        let notes = notes_with("n1", "My Note", "some body content here.");
        let results = vec![result("n1", "My Note", vec![block("n1", "T", 0, 23, 1)])];

        let text = extract_text(&results, 10, &notes).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_extract_text_overflow_stops_entirely() {
        let notes = notes_with("n1", "N", "aaaa bbbbbbbbbbbbbbbbbbbbbbbbbbbbbb cccc");
        let small_a = block("n1", "N", 0, 4, 0);
        let huge = block("n1", "N", 5, 30, 0);
        let small_c = block("n1", "N", 36, 4, 0);
        let results = vec![result("n1", "N", vec![small_a, huge, small_c])];

        // enough for two small pieces but not for the huge one in between
        let text = extract_text(&results, 40, &notes).await.unwrap();
        assert_eq!(text, "# note 1: N\naaaa\n");
    }

    #[tokio::test]
    async fn test_extract_text_skips_unresolved_offsets() {
        let notes = notes_with("n1", "N", "visible text.");
        let lost = block("n1", "N", -1, 13, 0);
        let found = block("n1", "N", 0, 7, 0);
        let results = vec![result("n1", "N", vec![lost, found])];

        let text = extract_text(&results, 1000, &notes).await.unwrap();
        // the unresolved block neither stops extraction nor eats budget
        assert_eq!(text, "# note 2: N\nvisible\n");
    }

    #[tokio::test]
    async fn test_extract_text_skips_missing_notes() {
        let notes = MemoryNotes::new();
        let results = vec![result("gone", "Gone", vec![block("gone", "T", 0, 4, 1)])];

        let text = extract_text(&results, 1000, &notes).await.unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_extract_links_with_and_without_anchor() {
        let with_heading = result("n1", "First Note", vec![block("n1", "My Section", 0, 1, 2)]);
        let no_heading = result("n2", "Second", vec![block("n2", "Second", 0, 1, 0)]);

        let links = extract_links(&[with_heading, no_heading]);
        assert_eq!(links, "[First Note](:/n1#my-section), [Second](:/n2)");
    }

    #[test]
    fn test_extract_links_skips_empty_results() {
        let empty = result("n1", "Empty", Vec::new());
        assert_eq!(extract_links(&[empty]), "");
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("Weird__Title"), "weirdtitle");
    }

    #[test]
    fn test_slugify_collapses_and_trims_hyphens() {
        assert_eq!(slugify("  a  -  b  "), "a-b");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("Chapter 12: Results"), "chapter-12-results");
    }
}
