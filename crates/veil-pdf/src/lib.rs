//! PDF redaction planning and overlay apply.
//!
//! The planner maps detector matches back onto the text spans the extraction
//! path produced (native text layer or OCR), and the apply step draws opaque
//! rectangles over the spans' regions. This is overlay redaction: pixel and
//! vector occlusion, not object-level text removal. The result descriptor
//! says so explicitly so callers can warn that the underlying text stream
//! may still be recoverable.

mod apply;
mod plan;
mod types;

pub use apply::apply_plan;
pub use plan::{build_plan, plan_document};
pub use types::{
    BBox, ExtractionSource, PdfExtractionContext, PdfRedactionPlan, PdfRedactionTarget,
    PdfTextSpan, RedactionResult, RedactionStatus,
};

pub type Result<T> = std::result::Result<T, PdfError>;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("pdf object error: {0}")]
    Object(#[from] lopdf::Error),
    #[error("page {0} not present in document")]
    MissingPage(u32),
}
