//! Plain-text sanitation pipeline.
//!
//! Drives the full detect → select → rewrite → gate sequence over a text
//! blob. Document planners do the same dance with structure-aware rewriting;
//! this crate is the reference path and the one the extraction-only formats
//! (txt, csv-as-text) go through.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use veil_core::{
    detect_matches, rewrite_text, select_matches_checked, summarize_matches, DetectedMatch,
    DetectionSummary, RewriteMode, SelectedOccurrence, DEFAULT_MASK,
};
use veil_rules::DetectionPattern;
use veil_verify::{verify_hide, verify_replace, GateReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeMode {
    Hide,
    Replace,
}

/// Result of one sanitation pass, gate verdict included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeOutcome {
    pub text: String,
    /// The matches that were rewritten (post-selection).
    pub matches: Vec<DetectedMatch>,
    pub summary: Vec<DetectionSummary>,
    pub gate: GateReport,
}

/// Detect and rewrite `text` in one pass.
///
/// `selection` of `None` rewrites every match; `Some` restricts the rewrite
/// to the chosen `(signature, occurrence)` pairs and fails on selections
/// that address nothing.
pub fn sanitize_text(
    text: &str,
    patterns: &[DetectionPattern],
    mode: SanitizeMode,
    selection: Option<&[SelectedOccurrence]>,
) -> Result<SanitizeOutcome> {
    let detected = detect_matches(text, patterns);
    let summary = summarize_matches(&detected);

    let targets = match selection {
        Some(selection) => select_matches_checked(&detected, selection)?,
        None => detected,
    };

    let rewrite_mode = match mode {
        SanitizeMode::Hide => RewriteMode::Hide(DEFAULT_MASK),
        SanitizeMode::Replace => RewriteMode::Replace,
    };
    let sanitized = rewrite_text(text, &targets, rewrite_mode);

    let gate = match mode {
        SanitizeMode::Hide => verify_hide(&sanitized, patterns),
        SanitizeMode::Replace => verify_replace(&sanitized, &targets),
    };
    if !gate.passed() {
        log::warn!("[text] sanitation gate: {}", gate.message);
    }

    log::info!(
        "[text] sanitized {} byte(s), {} match(es) rewritten",
        text.len(),
        targets.len()
    );

    Ok(SanitizeOutcome {
        text: sanitized,
        matches: targets,
        summary,
        gate,
    })
}

/// Scan without rewriting; used by callers that present a picker first.
pub fn scan_text(text: &str, patterns: &[DetectionPattern]) -> (Vec<DetectedMatch>, Vec<DetectionSummary>) {
    let detected = detect_matches(text, patterns);
    let summary = summarize_matches(&detected);
    (detected, summary)
}

/// Guard for callers handing us a mode a document kind cannot support.
pub fn require_mode_supported(mode: SanitizeMode, replace_supported: bool) -> Result<()> {
    if mode == SanitizeMode::Replace && !replace_supported {
        bail!("replace mode is not supported for this document kind");
    }
    Ok(())
}
