//! Note chunking: structure-aware splitting into size-bounded blocks.
//!
//! A note is scanned into top-level segments (fenced code regions, heading
//! lines, plain prose), then each segment is split into sub-blocks whose cost
//! in word units stays within a budget. Every sub-block carries its heading
//! path, source line and character offset, and the heading-context-prefixed
//! text that gets embedded.

use once_cell::sync::Lazy;
use regex::Regex;

/// Heading path slots: index 0 is the note title, 1..=6 the heading levels.
pub const HEADING_PATH_SLOTS: usize = 7;
/// Deepest heading level tracked; deeper headings are clamped.
pub const MAX_HEADING_LEVEL: usize = 6;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#+)\s+(.*)$").expect("heading regex"));

/// A sentence: a run of non-terminator characters ending in `.`, `!`, `?`
/// or a newline. Text after the last terminator is dropped, matching the
/// historical splitter.
static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\n]*[.!?\n]").expect("sentence regex"));

/// A chunked fragment of a note, ready for embedding.
///
/// `embed_input` is what the embedding provider sees: the heading path joined
/// by `/`, a `:`, then the raw fragment text. `text` is the verbatim source
/// slice used for offset resolution and excerpt extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSource {
    pub text: String,
    pub embed_input: String,
    /// 1-based source line; non-code fragments carry a minus-2 adjustment
    /// kept for compatibility with the host's line anchoring.
    pub line: i64,
    /// Character offset into the (newline-normalized) note body, -1 when the
    /// fragment could not be located.
    pub body_offset: i64,
    /// Character length of `text`.
    pub length: usize,
    pub heading_level: u8,
    pub title: String,
    pub is_code: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum SegmentKind {
    Prose,
    Heading { level: usize, title: String },
    Code { lang: String },
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    kind: SegmentKind,
}

/// Scanner states for the segment pass.
enum ScanState {
    Prose,
    InCodeFence,
}

/// Heading context threaded through the segment walk as an explicit fold
/// value. Each step produces the next path; segments never share mutable
/// state.
#[derive(Debug, Clone)]
struct HeadingPath {
    slots: [String; HEADING_PATH_SLOTS],
    level: usize,
}

impl HeadingPath {
    fn new(note_title: &str) -> Self {
        let mut slots: [String; HEADING_PATH_SLOTS] = Default::default();
        slots[0] = note_title.to_string();
        Self { slots, level: 0 }
    }

    /// Resolve the path for one segment: a heading moves the level and
    /// rewrites its slot, a code fence rewrites the current slot with a
    /// synthesized title, prose reuses the last known level and title.
    fn advance(&self, segment: &Segment) -> Self {
        let mut next = self.clone();
        match &segment.kind {
            SegmentKind::Code { lang } => {
                next.slots[next.level] = code_block_title(lang);
            }
            SegmentKind::Heading { level, title } => {
                next.level = (*level).min(MAX_HEADING_LEVEL);
                next.slots[next.level] = title.clone();
            }
            SegmentKind::Prose => {}
        }
        next
    }

    fn title(&self) -> &str {
        &self.slots[self.level]
    }

    fn embed_prefix(&self) -> String {
        self.slots[..=self.level].join("/")
    }
}

fn code_block_title(lang: &str) -> String {
    if lang.is_empty() {
        "code block".to_string()
    } else {
        format!("{} code block", lang)
    }
}

/// Split a note into block sources.
///
/// Chunking is pure and idempotent: the same title, body and size budget
/// always yield the same fragments with the same metadata.
pub fn chunk_note(title: &str, body: &str, max_block_size: usize) -> Vec<BlockSource> {
    let body = normalize_newlines(body);
    let segments = scan_segments(&body);

    let mut blocks = Vec::new();
    let mut path = HeadingPath::new(title);

    for segment in &segments {
        path = path.advance(segment);
        let is_code = matches!(segment.kind, SegmentKind::Code { .. });

        for text in split_segment(segment, max_block_size) {
            let (line, body_offset) = locate(&body, &segment.text, &text, is_code);
            blocks.push(BlockSource {
                embed_input: format!("{}:{}", path.embed_prefix(), text),
                length: text.chars().count(),
                line,
                body_offset,
                heading_level: path.level as u8,
                title: path.title().to_string(),
                is_code,
                text,
            });
        }
    }

    blocks
}

pub(crate) fn normalize_newlines(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\r', "\n")
}

/// Segment the body line by line. Fenced code regions are opaque: heading
/// markers inside them are plain text. An unterminated fence runs to the end
/// of the note rather than raising an error.
fn scan_segments(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut state = ScanState::Prose;
    let mut fence_lang = String::new();

    let flush = |segments: &mut Vec<Segment>, buffer: &mut Vec<&str>, kind: SegmentKind| {
        let text = buffer.join("\n");
        buffer.clear();
        if !text.trim().is_empty() {
            segments.push(Segment { text, kind });
        }
    };

    for line in body.split('\n') {
        match state {
            ScanState::Prose => {
                if line.starts_with("```") {
                    flush(&mut segments, &mut buffer, SegmentKind::Prose);
                    fence_lang = line[3..].split_whitespace().next().unwrap_or("").to_string();
                    buffer.push(line);
                    state = ScanState::InCodeFence;
                } else if let Some(caps) = HEADING_RE.captures(line) {
                    flush(&mut segments, &mut buffer, SegmentKind::Prose);
                    let level = caps[1].len();
                    let title = caps[2].trim().to_string();
                    segments.push(Segment {
                        text: line.to_string(),
                        kind: SegmentKind::Heading { level, title },
                    });
                } else {
                    buffer.push(line);
                }
            }
            ScanState::InCodeFence => {
                buffer.push(line);
                if line.starts_with("```") {
                    let kind = SegmentKind::Code {
                        lang: std::mem::take(&mut fence_lang),
                    };
                    flush(&mut segments, &mut buffer, kind);
                    state = ScanState::Prose;
                }
            }
        }
    }

    // Trailing prose, or an unterminated fence treated permissively as code.
    match state {
        ScanState::Prose => flush(&mut segments, &mut buffer, SegmentKind::Prose),
        ScanState::InCodeFence => flush(
            &mut segments,
            &mut buffer,
            SegmentKind::Code { lang: fence_lang },
        ),
    }

    segments
}

/// Split one segment into size-bounded sub-block texts.
///
/// Code accumulates whole lines, prose accumulates sentences. The accumulator
/// is flushed whenever the next unit would push it over the budget, and once
/// more at end-of-segment. A segment with no measured units yields nothing.
fn split_segment(segment: &Segment, max_block_size: usize) -> Vec<String> {
    let (units, joiner): (Vec<&str>, &str) = match segment.kind {
        SegmentKind::Code { .. } => (segment.text.split('\n').collect(), "\n"),
        _ => (
            SENTENCE_RE
                .find_iter(&segment.text)
                .map(|m| m.as_str())
                .collect(),
            "",
        ),
    };

    let mut out = Vec::new();
    let mut acc: Vec<&str> = Vec::new();
    let mut cost = 0usize;

    for unit in units {
        let unit_cost = unit.split_whitespace().count();
        if !acc.is_empty() && cost + unit_cost > max_block_size {
            out.push(acc.join(joiner));
            acc.clear();
            cost = 0;
        }
        acc.push(unit);
        cost += unit_cost;
    }
    if !acc.is_empty() && cost > 0 {
        out.push(acc.join(joiner));
    }

    out
}

/// Resolve a sub-block's line number and character offset: first occurrence
/// of the segment in the body, then of the sub-block within the segment.
/// Non-code fragments keep the historical minus-2 line adjustment.
fn locate(body: &str, segment: &str, sub: &str, is_code: bool) -> (i64, i64) {
    let byte_at = body
        .find(segment)
        .and_then(|seg_at| segment.find(sub).map(|rel| seg_at + rel));

    match byte_at {
        Some(at) => {
            let line = body[..at].matches('\n').count() as i64 + 1;
            let line = if is_code { line } else { line - 2 };
            (line, body[..at].chars().count() as i64)
        }
        None => (if is_code { 1 } else { -1 }, -1),
    }
}
