//! Core detection and replacement pipeline.
//!
//! Everything in this crate is a synchronous, pure transformation over
//! in-memory text: detect PII occurrences, synthesize inert replacement
//! values, and rewrite text around a conflict-free match list. Document
//! planners (`veil-pdf`, `veil-docx`) and the safety gate (`veil-verify`)
//! build on these primitives.

pub mod budget;
pub mod detect;
pub mod replace;
pub mod rewrite;
pub mod types;

pub use detect::{detect_matches, manual_candidates, summarize_matches};
pub use replace::generate_safe_replacement;
pub use rewrite::{
    rewrite_text, select_matches, select_matches_checked, verify_selection, RewriteMode,
    DEFAULT_MASK,
};
pub use types::{DetectedMatch, DetectionSummary, ManualCandidate, SelectedOccurrence};
pub use veil_rules::{DetectionPattern, Severity};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("stage '{stage}' exceeded its {budget_ms} ms budget")]
    Timeout { stage: &'static str, budget_ms: u64 },
    #[error("stage '{stage}' failed: {message}")]
    StageFailed { stage: &'static str, message: String },
    #[error("unknown occurrence selection: {0}")]
    InvalidSelection(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
