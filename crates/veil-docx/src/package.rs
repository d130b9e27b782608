//! ZIP package sanitization.
//!
//! A .docx file is an OPC package: a ZIP of XML parts. Sanitization walks
//! every entry, rewrites the text-bearing parts, scrubs author metadata, and
//! copies everything else byte-for-byte. Packages carrying active content
//! (macros, OLE payloads, ActiveX controls) are refused before any output
//! is produced; a sanitized copy of such a file would still be dangerous to
//! share.

use crate::xml::{rewrite_part_xml, scrub_core_properties};
use crate::{DocxError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use veil_core::{
    budget, verify_selection, DetectedMatch, DetectionPattern, RewriteMode, SelectedOccurrence,
};
use veil_verify::{verify_hide, GateReport, GateVerdict, ResidualFinding};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// The package parts whose `<w:t>` content is user-visible document text.
fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || name == "word/footnotes.xml"
        || name == "word/endnotes.xml"
        || name == "word/comments.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

/// Entries that make the whole package unshareable regardless of text
/// content: VBA macros, embedded OLE objects, ActiveX controls.
fn is_disallowed_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("vbaproject")
        || lower.contains("vbadata")
        || lower.contains("oleobject")
        || lower.starts_with("word/activex")
        || lower.starts_with("word/embeddings/")
}

/// Entry listing of a package, with any disallowed entries called out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageScan {
    pub entries: Vec<String>,
    pub disallowed: Vec<String>,
}

impl PackageScan {
    pub fn clean(&self) -> bool {
        self.disallowed.is_empty()
    }
}

/// List a package's entries without rewriting anything.
pub fn scan_package(input: &[u8]) -> Result<PackageScan> {
    let mut archive = ZipArchive::new(Cursor::new(input))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        entries.push(archive.by_index(i)?.name().to_string());
    }
    let disallowed = entries
        .iter()
        .filter(|name| is_disallowed_entry(name))
        .cloned()
        .collect();
    Ok(PackageScan { entries, disallowed })
}

/// Everything a caller needs after sanitizing one package.
#[derive(Debug)]
pub struct DocxOutcome {
    /// The rewritten package, a complete .docx file.
    pub bytes: Vec<u8>,
    /// All substituted matches across all parts.
    pub matches: Vec<DetectedMatch>,
    /// Names of the parts that changed.
    pub parts_rewritten: Vec<String>,
    pub gate: GateReport,
}

impl DocxOutcome {
    /// Serializable view without the package bytes.
    pub fn report(&self) -> DocxReport {
        DocxReport {
            match_count: self.matches.len(),
            parts_rewritten: self.parts_rewritten.clone(),
            gate: self.gate.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocxReport {
    pub match_count: usize,
    pub parts_rewritten: Vec<String>,
    pub gate: GateReport,
}

/// Sanitize a complete .docx package.
///
/// Text parts are rewritten paragraph by paragraph, `docProps/core.xml`
/// loses its author fields, and every other entry is copied unchanged. The
/// occurrence counter is shared across parts, so selections count through
/// the body, headers, and footers in entry order; a selection that
/// addresses nothing is an error. In hide mode the gate re-detects over the
/// complete sanitized text of every part, untouched paragraphs included.
pub fn sanitize_package(
    input: &[u8],
    patterns: &[DetectionPattern],
    mode: RewriteMode,
    selection: Option<&[SelectedOccurrence]>,
) -> Result<DocxOutcome> {
    let scan = scan_package(input)?;
    if let Some(name) = scan.disallowed.first() {
        log::warn!("[docx] refusing package with active content: {name}");
        return Err(DocxError::DisallowedEntry(name.clone()));
    }

    let mut archive = ZipArchive::new(Cursor::new(input))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut matches = Vec::new();
    let mut parts_rewritten = Vec::new();
    let mut part_texts: Vec<String> = Vec::new();
    let mut noops = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut raw = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut raw)?;

        let data = if is_text_part(&name) {
            let xml = String::from_utf8(raw).map_err(|_| DocxError::Encoding(name.clone()))?;
            let outcome = rewrite_part_xml(&xml, patterns, mode, selection, &mut counts)?;
            if !outcome.rewritten.is_empty() {
                log::info!(
                    "[docx] {}: substituted {} match(es)",
                    name,
                    outcome.rewritten.len()
                );
                parts_rewritten.push(name.clone());
            }
            matches.extend(outcome.rewritten);
            part_texts.push(outcome.text);
            noops.extend(outcome.noop_replacements);
            outcome.xml.into_bytes()
        } else if name == "docProps/core.xml" {
            let xml = String::from_utf8(raw).map_err(|_| DocxError::Encoding(name.clone()))?;
            parts_rewritten.push(name.clone());
            scrub_core_properties(&xml)?.into_bytes()
        } else {
            raw
        };

        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }

    if let Some(selection) = selection {
        verify_selection(&counts, selection)?;
    }

    let bytes = writer.finish()?.into_inner();
    // the gate re-detects over every text part, rewritten paragraphs or not
    let gate = match mode {
        RewriteMode::Hide(_) => verify_hide(&part_texts.join("\n"), patterns),
        RewriteMode::Replace => replace_gate(noops),
    };

    Ok(DocxOutcome {
        bytes,
        matches,
        parts_rewritten,
        gate,
    })
}

/// `sanitize_package` with the built-in rule catalogue, under the rewrite
/// stage's time budget.
pub fn sanitize_package_with_budget(
    input: Vec<u8>,
    mode: RewriteMode,
    selection: Option<Vec<SelectedOccurrence>>,
) -> Result<DocxOutcome> {
    budget::run_with_budget("docx-rewrite", budget::DOCX_REWRITE_BUDGET, move || {
        sanitize_package(
            &input,
            veil_rules::default_patterns(),
            mode,
            selection.as_deref(),
        )
    })?
}

fn replace_gate(noops: Vec<DetectedMatch>) -> GateReport {
    if noops.is_empty() {
        return GateReport {
            verdict: GateVerdict::Pass,
            residual: Vec::new(),
            message: "all selected values were substituted".to_string(),
        };
    }
    log::warn!(
        "[gate] {} replacement(s) were no-ops; export blocked pending override",
        noops.len()
    );
    GateReport {
        message: format!(
            "{} selected value(s) survived substitution; export blocked (override available)",
            noops.len()
        ),
        verdict: GateVerdict::BlockedOverridable,
        residual: noops
            .into_iter()
            .map(|m| ResidualFinding {
                index: m.index,
                length: m.length,
                key: m.key,
                label: m.label,
            })
            .collect(),
    }
}
