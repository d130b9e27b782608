//! DOCX sanitization.
//!
//! Rewrites the text of a .docx package in place of exporting a flattened
//! copy: formatting runs, styles, tables, and images all survive, only the
//! detected values change. The package is treated as hostile input; entries
//! carrying active content cause the whole file to be refused.

mod package;
mod rewrite;
mod xml;

pub use package::{
    sanitize_package, sanitize_package_with_budget, scan_package, DocxOutcome, DocxReport,
    PackageScan,
};
pub use rewrite::{sanitize_paragraph, ParagraphOutcome};
pub use xml::{rewrite_part_xml, scrub_core_properties, PartOutcome};

pub type Result<T> = std::result::Result<T, DocxError>;

#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("part {0} is not valid UTF-8")]
    Encoding(String),
    #[error("archive entry {0} carries active content; package refused")]
    DisallowedEntry(String),
    #[error(transparent)]
    Core(#[from] veil_core::CoreError),
}
