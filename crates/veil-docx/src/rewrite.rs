//! Run-boundary paragraph rewriting.
//!
//! WordprocessingML splits a paragraph's visible text across formatting runs
//! at arbitrary points, so a match can straddle run boundaries. Detection
//! runs over the concatenated paragraph text, and the rewritten text is then
//! redistributed over the original run lengths so every run keeps its
//! character count and its formatting.

use std::collections::HashMap;
use veil_core::{
    detect_matches, rewrite_text, select_matches, DetectedMatch, DetectionPattern, RewriteMode,
    SelectedOccurrence,
};

/// Result of rewriting one paragraph.
#[derive(Debug, Clone)]
pub struct ParagraphOutcome {
    /// The rewritten run texts, same count and per-run character length as
    /// the input runs.
    pub runs: Vec<String>,
    /// The rewritten concatenated paragraph text.
    pub text: String,
    /// The matches that were substituted, with paragraph-relative offsets.
    pub targets: Vec<DetectedMatch>,
}

/// Detect and rewrite over one paragraph's concatenated run texts.
///
/// Returns `None` when nothing in the paragraph needs rewriting. `counts`
/// tracks occurrence ordinals across paragraphs so a selection like "the 2nd
/// a@b.co" resolves in document order even when the occurrences live in
/// different paragraphs.
pub fn sanitize_paragraph(
    runs: &[String],
    patterns: &[DetectionPattern],
    mode: RewriteMode,
    selection: Option<&[SelectedOccurrence]>,
    counts: &mut HashMap<String, usize>,
) -> Option<ParagraphOutcome> {
    let text: String = runs.concat();
    let matches = detect_matches(&text, patterns);
    let targets = match selection {
        Some(sel) => select_matches(&matches, sel, counts),
        None => matches,
    };
    if targets.is_empty() {
        return None;
    }

    let rewritten = rewrite_text(&text, &targets, mode);
    let new_runs = redistribute(&rewritten, runs);
    Some(ParagraphOutcome {
        runs: new_runs,
        text: rewritten,
        targets,
    })
}

/// Split `text` into pieces matching the character count of each original
/// run. Substitutions are character-count preserving, so the counts line up;
/// if they ever do not, the surplus is appended to the last run rather than
/// dropped.
fn redistribute(text: &str, original: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(original.len());
    let mut rest = text;
    for run in original {
        let want = run.chars().count();
        let split = rest
            .char_indices()
            .nth(want)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (piece, tail) = rest.split_at(split);
        out.push(piece.to_string());
        rest = tail;
    }
    if !rest.is_empty() {
        log::warn!("[docx] run redistribution left {} byte(s) over", rest.len());
        match out.last_mut() {
            Some(last) => last.push_str(rest),
            None => out.push(rest.to_string()),
        }
    }
    out
}
