//! Diff Engine: line- and word-level comparison of a base resume and its
//! optimized rewrite, plus line statistics for the compare view.
//!
//! Every segment is exactly one of unchanged / added / removed. Joining the
//! non-removed segments yields the revised text; joining the non-added
//! segments yields the original. Within a changed hunk removals come first.

mod myers;

use serde::{Deserialize, Serialize};

use self::myers::{diff_tokens, DiffOp};

/// A contiguous run of tokens sharing the same change kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub value: String,
    pub added: bool,
    pub removed: bool,
    /// Number of tokens (lines or words) merged into this segment.
    pub count: usize,
}

/// Line-count statistics over a line diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub unchanged: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub line_diff: Vec<DiffSegment>,
    pub word_diff: Vec<DiffSegment>,
    pub stats: DiffStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

/// Computes line and word diffs between `original` and `revised`.
pub fn compute_diff(original: &str, revised: &str) -> DiffResult {
    let line_diff = diff_by(tokenize_lines(original), tokenize_lines(revised));
    let word_diff = diff_by(tokenize_words(original), tokenize_words(revised));
    let stats = compute_diff_stats(&line_diff);

    DiffResult {
        line_diff,
        word_diff,
        stats,
    }
}

/// Counts lines per change kind. A segment counts as many lines as it has
/// newline characters, and at least one if it is non-empty.
pub fn compute_diff_stats(line_diff: &[DiffSegment]) -> DiffStats {
    let mut stats = DiffStats::default();

    for segment in line_diff {
        if segment.value.is_empty() {
            continue;
        }
        let lines = segment.value.matches('\n').count().max(1);
        if segment.added {
            stats.additions += lines;
        } else if segment.removed {
            stats.deletions += lines;
        } else {
            stats.unchanged += lines;
        }
    }

    stats.total = stats.additions + stats.deletions + stats.unchanged;
    stats
}

// ────────────────────────────────────────────────────────────────────────────
// Tokenization
// ────────────────────────────────────────────────────────────────────────────

/// Lines including their trailing `\n`; the last line may lack one.
fn tokenize_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Space,
    Punct,
}

impl CharClass {
    fn of(ch: char) -> Self {
        if ch.is_alphanumeric() || ch == '_' {
            CharClass::Word
        } else if ch.is_whitespace() {
            CharClass::Space
        } else {
            CharClass::Punct
        }
    }
}

/// Word runs, whitespace runs, and single punctuation characters.
fn tokenize_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut previous: Option<CharClass> = None;

    for (idx, ch) in text.char_indices() {
        let class = CharClass::of(ch);
        if let Some(prev) = previous {
            if prev != class || class == CharClass::Punct {
                tokens.push(&text[start..idx]);
                start = idx;
            }
        }
        previous = Some(class);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}

// ────────────────────────────────────────────────────────────────────────────
// Segment assembly
// ────────────────────────────────────────────────────────────────────────────

fn diff_by(old: Vec<&str>, new: Vec<&str>) -> Vec<DiffSegment> {
    let ops = diff_tokens(&old, &new);

    let mut segments: Vec<DiffSegment> = Vec::new();
    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();

    for op in ops {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                flush_hunk(&mut segments, &mut removed, &mut added);
                push_segment(
                    &mut segments,
                    &old[old_index..old_index + len],
                    SegmentKind::Unchanged,
                );
            }
            DiffOp::Delete { old_index, len } => {
                removed.extend_from_slice(&old[old_index..old_index + len])
            }
            DiffOp::Insert { new_index, len } => {
                added.extend_from_slice(&new[new_index..new_index + len])
            }
        }
    }
    flush_hunk(&mut segments, &mut removed, &mut added);

    segments
}

fn flush_hunk<'a>(
    segments: &mut Vec<DiffSegment>,
    removed: &mut Vec<&'a str>,
    added: &mut Vec<&'a str>,
) {
    if !removed.is_empty() {
        push_segment(segments, removed, SegmentKind::Removed);
        removed.clear();
    }
    if !added.is_empty() {
        push_segment(segments, added, SegmentKind::Added);
        added.clear();
    }
}

/// Appends tokens, merging into the last segment when the kind matches.
fn push_segment(segments: &mut Vec<DiffSegment>, tokens: &[&str], kind: SegmentKind) {
    if tokens.is_empty() {
        return;
    }
    let added = kind == SegmentKind::Added;
    let removed = kind == SegmentKind::Removed;

    if let Some(last) = segments.last_mut() {
        if last.added == added && last.removed == removed {
            last.value.push_str(&tokens.concat());
            last.count += tokens.len();
            return;
        }
    }

    segments.push(DiffSegment {
        value: tokens.concat(),
        added,
        removed,
        count: tokens.len(),
    });
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
