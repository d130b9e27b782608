//! Match-to-span mapping.

use crate::types::{PdfExtractionContext, PdfRedactionPlan, PdfRedactionTarget};
use chrono::Utc;
use veil_core::{detect_matches, DetectedMatch, DetectionPattern};

/// Detect on the extracted text, then map the matches onto spans.
pub fn plan_document(
    text: &str,
    patterns: &[DetectionPattern],
    context: Option<&PdfExtractionContext>,
) -> PdfRedactionPlan {
    build_plan(detect_matches(text, patterns), context)
}

/// Map every match onto the spans that carry its byte interval.
///
/// A span claims a match when their intervals overlap:
/// `span.end > match.start && span.start < match.end`. A match with zero
/// overlapping spans (extraction produced no spans at all, or OCR dropped
/// that token) becomes an unresolved target, counted in
/// `unresolved_target_count` for the caller to surface.
pub fn build_plan(
    matches: Vec<DetectedMatch>,
    context: Option<&PdfExtractionContext>,
) -> PdfRedactionPlan {
    let spans = context.map(|c| c.spans.clone()).unwrap_or_default();

    let targets: Vec<PdfRedactionTarget> = matches
        .iter()
        .map(|m| {
            let mut span_indices = Vec::new();
            let mut page_numbers = Vec::new();
            for (i, span) in spans.iter().enumerate() {
                if span.end > m.index && span.start < m.end() {
                    span_indices.push(i);
                    if !page_numbers.contains(&span.page_number) {
                        page_numbers.push(span.page_number);
                    }
                }
            }
            let unresolved = span_indices.is_empty();
            if unresolved {
                log::warn!(
                    "[plan] match {} at {}..{} has no overlapping span",
                    m.key,
                    m.index,
                    m.end()
                );
            }
            PdfRedactionTarget {
                matched: m.clone(),
                span_indices,
                page_numbers,
                unresolved,
            }
        })
        .collect();

    let unresolved_target_count = targets.iter().filter(|t| t.unresolved).count();
    let match_count = matches.len();

    PdfRedactionPlan {
        matches,
        spans,
        targets,
        unresolved_target_count,
        match_count,
        generated_at: Utc::now(),
    }
}
