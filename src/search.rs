//! Similarity search: scoring, filtering, grouping and aggregation.
//!
//! A query is chunked and embedded exactly like a note, collapsed to a single
//! representative vector (the arithmetic mean of its block vectors), and
//! scored against every candidate block by dot product. Since stored vectors
//! have unit norm this is cosine similarity.

use std::collections::HashMap;

use crate::config::AggregationMode;
use crate::engine::SemanticEngine;
use crate::model::{content_hash, Block, NoteResult};
use crate::vector::{dot, mean};
use crate::SearchError;

/// Title under which a query is chunked, as if it were a one-off note.
pub const QUERY_NOTE_TITLE: &str = "query";

impl SemanticEngine {
    /// Rank candidate blocks against a free-text query.
    ///
    /// Blocks belonging to `exclude_note_id` never appear in the output.
    /// With `grouped` set, surviving blocks are partitioned per note and each
    /// group is scored by the configured aggregation mode; otherwise the top
    /// blocks are returned in one synthetic result with no note identity.
    /// A query that chunks to nothing yields an empty result set.
    pub async fn find_nearest(
        &self,
        all_blocks: &[Block],
        exclude_note_id: Option<&str>,
        query: &str,
        grouped: bool,
    ) -> Result<Vec<NoteResult>, SearchError> {
        let hash = content_hash(query);
        let query_blocks = self
            .compute_blocks("", QUERY_NOTE_TITLE, query, &hash)
            .await?;
        if query_blocks.is_empty() {
            log::debug!("query produced no blocks, returning empty result set");
            return Ok(Vec::new());
        }

        let vectors: Vec<Vec<f32>> = query_blocks.into_iter().map(|b| b.embedding).collect();
        let representative = mean(&vectors);

        let config = self.config();
        let scored = score_blocks(
            all_blocks,
            exclude_note_id,
            &representative,
            config.min_similarity,
        );

        if !grouped {
            return Ok(flat_results(scored, config.max_hits));
        }

        let mut results = group_results(scored, config.agg_similarity, config.max_hits);
        for result in &mut results {
            result.note_title = self
                .notes()
                .note_title(&result.note_id)
                .await?
                .unwrap_or_default();
        }
        Ok(results)
    }
}

/// Score every candidate block and drop the ones below the threshold.
/// Input iteration order is preserved, which is what makes later stable
/// sorts break ties predictably.
fn score_blocks(
    blocks: &[Block],
    exclude_note_id: Option<&str>,
    representative: &[f32],
    min_similarity: f32,
) -> Vec<Block> {
    blocks
        .iter()
        .filter(|b| exclude_note_id.map_or(true, |id| b.note_id != id))
        .filter_map(|b| {
            let similarity = dot(representative, &b.embedding);
            if similarity < min_similarity {
                return None;
            }
            let mut scored = b.clone();
            scored.similarity = similarity;
            Some(scored)
        })
        .collect()
}

/// Ungrouped ranking: best blocks across all notes, wrapped in one synthetic
/// result carrying no note identity.
fn flat_results(mut scored: Vec<Block>, max_hits: usize) -> Vec<NoteResult> {
    if scored.is_empty() {
        return Vec::new();
    }
    sort_by_similarity(&mut scored);
    scored.truncate(max_hits);
    vec![NoteResult {
        note_id: String::new(),
        note_title: String::new(),
        blocks: scored,
        aggregate_similarity: 0.0,
    }]
}

/// Grouped ranking: partition by note (first-seen order), sort blocks within
/// each group, aggregate, sort groups, truncate. Note titles are left empty
/// for the caller to fill in.
fn group_results(
    scored: Vec<Block>,
    mode: AggregationMode,
    max_hits: usize,
) -> Vec<NoteResult> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Block>> = HashMap::new();
    for block in scored {
        if !groups.contains_key(&block.note_id) {
            order.push(block.note_id.clone());
        }
        groups.entry(block.note_id.clone()).or_default().push(block);
    }

    let mut results: Vec<NoteResult> = order
        .into_iter()
        .map(|note_id| {
            let mut blocks = groups.remove(&note_id).unwrap_or_default();
            sort_by_similarity(&mut blocks);
            let aggregate_similarity = aggregate(&blocks, mode);
            NoteResult {
                note_id,
                note_title: String::new(),
                blocks,
                aggregate_similarity,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.aggregate_similarity
            .partial_cmp(&a.aggregate_similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(max_hits);
    results
}

fn aggregate(blocks: &[Block], mode: AggregationMode) -> f32 {
    if blocks.is_empty() {
        return 0.0;
    }
    match mode {
        AggregationMode::Max => blocks
            .iter()
            .map(|b| b.similarity)
            .fold(f32::NEG_INFINITY, f32::max),
        AggregationMode::Avg => {
            blocks.iter().map(|b| b.similarity).sum::<f32>() / blocks.len() as f32
        }
    }
}

/// Stable descending sort; ties keep input order.
fn sort_by_similarity(blocks: &mut [Block]) {
    blocks.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
