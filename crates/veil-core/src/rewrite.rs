//! Text rewriting around a conflict-free match list.
//!
//! Output is built in one ascending walk that copies unmatched gaps and
//! substitutions into a builder, so earlier edits never invalidate later
//! offsets and there is no repeated-slice cost.

use crate::replace::generate_safe_replacement;
use crate::types::{DetectedMatch, SelectedOccurrence};
use crate::{CoreError, Result};
use std::collections::HashMap;

/// Mask character used in hide mode.
pub const DEFAULT_MASK: char = '█';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Replace every character of the match with the mask character.
    Hide(char),
    /// Substitute a generated same-length inert value.
    Replace,
}

/// Rewrite `text`, substituting every match according to `mode`.
///
/// `matches` must be the detector's output for this exact text: sorted
/// ascending by index and non-overlapping. A match that violates that
/// contract is skipped and logged rather than corrupting the output.
pub fn rewrite_text(text: &str, matches: &[DetectedMatch], mode: RewriteMode) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for m in matches {
        if m.index < cursor || m.end() > text.len() {
            log::warn!(
                "[rewrite] match {} at {}..{} out of order or out of bounds, skipped",
                m.key,
                m.index,
                m.end()
            );
            continue;
        }
        out.push_str(&text[cursor..m.index]);
        match mode {
            RewriteMode::Hide(mask) => {
                for _ in m.value.chars() {
                    out.push(mask);
                }
            }
            RewriteMode::Replace => out.push_str(&generate_safe_replacement(m)),
        }
        cursor = m.end();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Keep only the matches whose `(signature, occurrence)` pair the caller
/// selected, counting occurrences through `counts`.
///
/// The counter is threaded in by the caller so occurrence ordinals can span
/// multiple detector runs (one per DOCX paragraph, for example) and still
/// count in document order.
pub fn select_matches(
    matches: &[DetectedMatch],
    selection: &[SelectedOccurrence],
    counts: &mut HashMap<String, usize>,
) -> Vec<DetectedMatch> {
    let mut kept = Vec::new();
    for m in matches {
        let signature = m.signature();
        let occurrence = counts
            .entry(signature.clone())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        let wanted = selection
            .iter()
            .any(|s| s.signature == signature && s.occurrence == *occurrence);
        if wanted {
            kept.push(m.clone());
        }
    }
    kept
}

/// `select_matches` over a single detector run, verifying that every
/// selection actually addressed something.
pub fn select_matches_checked(
    matches: &[DetectedMatch],
    selection: &[SelectedOccurrence],
) -> Result<Vec<DetectedMatch>> {
    let mut counts = HashMap::new();
    let kept = select_matches(matches, selection, &mut counts);
    verify_selection(&counts, selection)?;
    Ok(kept)
}

/// Check every selection against the final occurrence counts. A selection
/// that addressed nothing is an error, never silently dropped; callers that
/// thread `counts` across multiple detector runs call this once at the end.
pub fn verify_selection(
    counts: &HashMap<String, usize>,
    selection: &[SelectedOccurrence],
) -> Result<()> {
    for s in selection {
        let hit = counts
            .get(&s.signature)
            .map(|&total| s.occurrence >= 1 && s.occurrence <= total)
            .unwrap_or(false);
        if !hit {
            return Err(CoreError::InvalidSelection(format!(
                "{} (occurrence {})",
                s.signature, s.occurrence
            )));
        }
    }
    Ok(())
}
