//! Plan and span types for PDF redaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use veil_core::DetectedMatch;

/// Region of a page in top-left-origin page coordinates (points).
/// `page_height` enables the flip into PDF's bottom-left space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page_height: f64,
}

/// One contiguous piece of extracted text and where it sits.
///
/// `start`/`end` are offsets into the page-concatenated extracted text;
/// spans partition that text without gaps other than the explicit
/// separators inserted between tokens and pages. OCR spans may lack a
/// bbox when the engine dropped geometry for a low-confidence word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfTextSpan {
    pub page_number: u32,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub bbox: Option<BBox>,
}

/// Which extraction path produced the spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ExtractionSource {
    TextLayer,
    Ocr {
        pages_scanned: usize,
        /// Mean per-word confidence reported by the engine, 0.0-1.0.
        avg_confidence: f32,
        /// Words discarded below the engine's confidence threshold.
        discarded_words: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfExtractionContext {
    pub spans: Vec<PdfTextSpan>,
    pub source: ExtractionSource,
}

/// OCR confidence below this gets called out in result messaging.
pub const OCR_CONFIDENCE_WARN: f32 = 0.60;

impl PdfExtractionContext {
    /// A human-readable caveat about extraction quality, if one applies.
    pub fn extraction_warning(&self) -> Option<String> {
        match &self.source {
            ExtractionSource::TextLayer => None,
            ExtractionSource::Ocr {
                pages_scanned,
                avg_confidence,
                discarded_words,
            } => {
                if *avg_confidence < OCR_CONFIDENCE_WARN {
                    Some(format!(
                        "OCR confidence is low ({:.0}% over {} page(s)); matches may be incomplete",
                        avg_confidence * 100.0,
                        pages_scanned
                    ))
                } else if *discarded_words > 0 {
                    Some(format!(
                        "OCR discarded {} low-confidence word(s); matches may be incomplete",
                        discarded_words
                    ))
                } else {
                    None
                }
            }
        }
    }
}

/// Where one match lands on the page(s).
///
/// `unresolved` means no span overlapped the match's interval: the PII is
/// known to exist in the text but cannot be visually located. That is a
/// correctness gap to surface, never a silent success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfRedactionTarget {
    #[serde(rename = "match")]
    pub matched: DetectedMatch,
    pub span_indices: Vec<usize>,
    pub page_numbers: Vec<u32>,
    pub unresolved: bool,
}

/// Immutable plan built once per document + selection, consumed by
/// [`crate::apply_plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfRedactionPlan {
    pub matches: Vec<DetectedMatch>,
    pub spans: Vec<PdfTextSpan>,
    pub targets: Vec<PdfRedactionTarget>,
    pub unresolved_target_count: usize,
    pub match_count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionStatus {
    Redacted,
    Unsupported,
}

/// Support descriptor returned by the apply step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionResult {
    pub status: RedactionStatus,
    /// Always `"overlay"`: occlusion, not object-level removal.
    pub method: &'static str,
    pub message: String,
    pub boxes_drawn: usize,
    pub match_count: usize,
    /// The original text stream is untouched and recoverable by a
    /// sufficiently motivated extractor; a documented limitation.
    pub text_layer_intact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_warning_low_confidence() {
        let ctx = PdfExtractionContext {
            spans: Vec::new(),
            source: ExtractionSource::Ocr {
                pages_scanned: 3,
                avg_confidence: 0.41,
                discarded_words: 0,
            },
        };
        let warning = ctx.extraction_warning().unwrap();
        assert!(warning.contains("41%"));
        assert!(warning.contains("3 page(s)"));
    }

    #[test]
    fn test_ocr_warning_discarded_words() {
        let ctx = PdfExtractionContext {
            spans: Vec::new(),
            source: ExtractionSource::Ocr {
                pages_scanned: 1,
                avg_confidence: 0.93,
                discarded_words: 7,
            },
        };
        assert!(ctx.extraction_warning().unwrap().contains("7"));
    }

    #[test]
    fn test_text_layer_no_warning() {
        let ctx = PdfExtractionContext {
            spans: Vec::new(),
            source: ExtractionSource::TextLayer,
        };
        assert!(ctx.extraction_warning().is_none());
    }
}
