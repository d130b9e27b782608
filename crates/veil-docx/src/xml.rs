//! Streaming rewrite of WordprocessingML parts.
//!
//! The part is read into an event list once, `<w:t>` text nodes are grouped
//! by their enclosing `<w:p>`, each paragraph is rewritten at run
//! granularity, and the events are re-emitted verbatim except for the
//! substituted text nodes. Element structure, attributes, and formatting
//! runs all survive byte-for-byte.

use crate::rewrite::sanitize_paragraph;
use crate::{DocxError, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use veil_core::{DetectedMatch, DetectionPattern, RewriteMode, SelectedOccurrence};

/// Result of rewriting one XML part.
#[derive(Debug)]
pub struct PartOutcome {
    pub xml: String,
    /// Matches substituted in this part. Offsets are paragraph-relative.
    pub rewritten: Vec<DetectedMatch>,
    /// The part's complete sanitized paragraph text, rewritten or not,
    /// newline-joined. The package gate re-detects over this, so a match
    /// left in an untouched paragraph still reaches the gate.
    pub text: String,
    /// Replace mode only: substitutions that degenerated to a no-op.
    pub noop_replacements: Vec<DetectedMatch>,
}

/// Rewrite every paragraph of a WordprocessingML part.
///
/// `counts` carries occurrence ordinals across parts so selections resolve
/// in document order through headers, body, and footers alike.
pub fn rewrite_part_xml(
    xml: &str,
    patterns: &[DetectionPattern],
    mode: RewriteMode,
    selection: Option<&[SelectedOccurrence]>,
    counts: &mut HashMap<String, usize>,
) -> Result<PartOutcome> {
    let mut reader = Reader::from_str(xml);
    let mut events: Vec<Event<'static>> = Vec::new();
    // each paragraph is the list of event indices of its text nodes
    let mut paragraphs: Vec<Vec<usize>> = Vec::new();
    let mut current: Option<Vec<usize>> = None;
    let mut in_text_node = false;

    loop {
        let ev = reader.read_event()?;
        if matches!(ev, Event::Eof) {
            break;
        }
        match &ev {
            Event::Start(e) if e.name().as_ref() == b"w:p" => current = Some(Vec::new()),
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                if let Some(group) = current.take() {
                    if !group.is_empty() {
                        paragraphs.push(group);
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_node = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text_node = false,
            Event::Text(_) if in_text_node => {
                let idx = events.len();
                match current.as_mut() {
                    Some(group) => group.push(idx),
                    // text node outside any paragraph: treat as its own
                    None => paragraphs.push(vec![idx]),
                }
            }
            _ => {}
        }
        events.push(ev.into_owned());
    }

    let mut rewritten = Vec::new();
    let mut part_texts: Vec<String> = Vec::new();
    let mut noop_replacements = Vec::new();

    for group in &paragraphs {
        let runs: Vec<String> = group.iter().map(|&i| text_of(&events[i])).collect();
        let outcome = match sanitize_paragraph(&runs, patterns, mode, selection, counts) {
            Some(outcome) => outcome,
            None => {
                part_texts.push(runs.concat());
                continue;
            }
        };

        if mode == RewriteMode::Replace {
            for t in &outcome.targets {
                let survived = outcome
                    .text
                    .get(t.index..t.end())
                    .map(|slice| slice == t.value)
                    .unwrap_or(false);
                if survived {
                    noop_replacements.push(t.clone());
                }
            }
        }

        for (&i, new_run) in group.iter().zip(&outcome.runs) {
            events[i] = Event::Text(BytesText::from_escaped(escape_xml(new_run)));
        }
        rewritten.extend(outcome.targets);
        part_texts.push(outcome.text);
    }

    let mut writer = Writer::new(Vec::new());
    for ev in events {
        writer.write_event(ev)?;
    }
    let xml = String::from_utf8(writer.into_inner())
        .map_err(|_| DocxError::Encoding("rewritten part".to_string()))?;

    Ok(PartOutcome {
        xml,
        rewritten,
        text: part_texts.join("\n"),
        noop_replacements,
    })
}

/// Empty the text of author-bearing fields in `docProps/core.xml`. The
/// elements themselves stay so the part remains schema-valid.
pub fn scrub_core_properties(xml: &str) -> Result<String> {
    fn is_scrubbed(name: &[u8]) -> bool {
        name == b"dc:creator" || name == b"cp:lastModifiedBy"
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut in_scrubbed = false;

    loop {
        let ev = reader.read_event()?;
        if matches!(ev, Event::Eof) {
            break;
        }
        let skip = in_scrubbed && matches!(ev, Event::Text(_));
        match &ev {
            Event::Start(e) if is_scrubbed(e.name().as_ref()) => in_scrubbed = true,
            Event::End(e) if is_scrubbed(e.name().as_ref()) => in_scrubbed = false,
            _ => {}
        }
        if !skip {
            writer.write_event(ev.into_owned())?;
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|_| DocxError::Encoding("docProps/core.xml".to_string()))
}

fn text_of(ev: &Event<'_>) -> String {
    match ev {
        Event::Text(t) => match std::str::from_utf8(t) {
            Ok(raw) => unescape_xml(raw),
            Err(_) => String::new(),
        },
        _ => String::new(),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
