//! Overlay drawing into page content streams.

use crate::types::{PdfRedactionPlan, RedactionResult, RedactionStatus};
use crate::{PdfError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use std::collections::BTreeMap;

/// Padding in points added around every drawn box.
const BOX_PADDING: f64 = 1.5;

/// Rectangle in PDF bottom-left coordinates, ready to draw.
#[derive(Debug, Clone, Copy)]
struct DrawRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Draw an opaque rectangle over every resolved target's span boxes.
///
/// This is overlay redaction: the page is visually occluded but the text
/// stream underneath is untouched. Zero drawable boxes yields an
/// `unsupported` result carrying the match count so the caller can block
/// export. All pages are validated before the first mutation, so a bad plan
/// never leaves the document half-applied.
pub fn apply_plan(doc: &mut Document, plan: &PdfRedactionPlan) -> Result<RedactionResult> {
    let mut rects_by_page: BTreeMap<u32, Vec<DrawRect>> = BTreeMap::new();

    for target in plan.targets.iter().filter(|t| !t.unresolved) {
        for &span_index in &target.span_indices {
            let span = match plan.spans.get(span_index) {
                Some(span) => span,
                None => continue,
            };
            if let Some(bbox) = span.bbox {
                // flip from top-left page coords into PDF space, padded
                rects_by_page.entry(span.page_number).or_default().push(DrawRect {
                    x: bbox.x - BOX_PADDING,
                    y: bbox.page_height - bbox.y - bbox.height - BOX_PADDING,
                    width: bbox.width + 2.0 * BOX_PADDING,
                    height: bbox.height + 2.0 * BOX_PADDING,
                });
            }
        }
    }

    let boxes_total: usize = rects_by_page.values().map(Vec::len).sum();
    if boxes_total == 0 {
        log::warn!(
            "[apply] no drawable region for {} match(es); overlay redaction unsupported here",
            plan.match_count
        );
        return Ok(RedactionResult {
            status: RedactionStatus::Unsupported,
            method: "overlay",
            message: format!(
                "no locatable page regions for {} detected match(es); export must remain blocked",
                plan.match_count
            ),
            boxes_drawn: 0,
            match_count: plan.match_count,
            text_layer_intact: true,
        });
    }

    // validate every page before mutating anything
    let pages = doc.get_pages();
    for page_number in rects_by_page.keys() {
        if !pages.contains_key(page_number) {
            return Err(PdfError::MissingPage(*page_number));
        }
    }

    let page_count = rects_by_page.len();
    for (page_number, rects) in &rects_by_page {
        let page_id = pages[page_number];
        let overlay = build_overlay_stream(rects)?;
        let overlay_id = doc.add_object(overlay);
        attach_content(doc, page_id, overlay_id)?;
        log::info!(
            "[apply] page {}: drew {} overlay box(es)",
            page_number,
            rects.len()
        );
    }

    Ok(RedactionResult {
        status: RedactionStatus::Redacted,
        method: "overlay",
        message: format!(
            "drew {} overlay box(es) across {} page(s); the underlying text stream is \
             occluded, not removed, and remains recoverable from the file",
            boxes_total, page_count
        ),
        boxes_drawn: boxes_total,
        match_count: plan.match_count,
        text_layer_intact: true,
    })
}

fn build_overlay_stream(rects: &[DrawRect]) -> Result<Stream> {
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
        ),
    ];
    for rect in rects {
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x as f32),
                Object::Real(rect.y as f32),
                Object::Real(rect.width as f32),
                Object::Real(rect.height as f32),
            ],
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    let data = Content { operations }.encode()?;
    Ok(Stream::new(Dictionary::new(), data))
}

/// Append the overlay stream after the page's existing content so it paints
/// on top.
fn attach_content(
    doc: &mut Document,
    page_id: lopdf::ObjectId,
    overlay_id: lopdf::ObjectId,
) -> Result<()> {
    let existing = match doc.get_object(page_id)? {
        Object::Dictionary(dict) => dict.get(b"Contents").ok().cloned(),
        _ => None,
    };

    let new_contents = match existing {
        Some(Object::Reference(r)) => {
            Object::Array(vec![Object::Reference(r), Object::Reference(overlay_id)])
        }
        Some(Object::Array(mut items)) => {
            items.push(Object::Reference(overlay_id));
            Object::Array(items)
        }
        _ => Object::Reference(overlay_id),
    };

    if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
        dict.set("Contents", new_contents);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use crate::types::{BBox, ExtractionSource, PdfExtractionContext, PdfTextSpan};
    use lopdf::dictionary;
    use veil_core::{DetectedMatch, Severity};

    fn one_page_doc() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn ssn_match() -> DetectedMatch {
        DetectedMatch {
            key: "ssn".to_string(),
            label: "Social Security Number".to_string(),
            severity: Severity::Critical,
            value: "123-45-6789".to_string(),
            index: 0,
            length: 11,
        }
    }

    fn span_on_page(page: u32) -> PdfTextSpan {
        PdfTextSpan {
            page_number: page,
            start: 0,
            end: 11,
            text: "123-45-6789".to_string(),
            bbox: Some(BBox {
                x: 72.0,
                y: 96.0,
                width: 110.0,
                height: 12.0,
                page_height: 792.0,
            }),
        }
    }

    #[test]
    fn test_apply_draws_boxes() {
        let ctx = PdfExtractionContext {
            spans: vec![span_on_page(1)],
            source: ExtractionSource::TextLayer,
        };
        let plan = build_plan(vec![ssn_match()], Some(&ctx));
        let mut doc = one_page_doc();
        let result = apply_plan(&mut doc, &plan).unwrap();

        assert_eq!(result.status, RedactionStatus::Redacted);
        assert_eq!(result.boxes_drawn, 1);
        assert!(result.text_layer_intact);

        // the page's Contents became [original, overlay]
        let pages = doc.get_pages();
        let page = match doc.get_object(pages[&1]).unwrap() {
            Object::Dictionary(dict) => dict,
            other => panic!("expected page dictionary, got {other:?}"),
        };
        match page.get(b"Contents").unwrap() {
            Object::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected content array, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_spans_is_unsupported() {
        let ctx = PdfExtractionContext {
            spans: Vec::new(),
            source: ExtractionSource::TextLayer,
        };
        let plan = build_plan(vec![ssn_match()], Some(&ctx));
        assert_eq!(plan.unresolved_target_count, plan.match_count);

        let mut doc = one_page_doc();
        let result = apply_plan(&mut doc, &plan).unwrap();
        assert_eq!(result.status, RedactionStatus::Unsupported);
        assert_eq!(result.match_count, 1);
        assert_eq!(result.boxes_drawn, 0);
    }

    #[test]
    fn test_span_without_bbox_cannot_be_drawn() {
        let mut span = span_on_page(1);
        span.bbox = None;
        let ctx = PdfExtractionContext {
            spans: vec![span],
            source: ExtractionSource::TextLayer,
        };
        let plan = build_plan(vec![ssn_match()], Some(&ctx));
        // resolved in the plan, but nothing drawable at apply time
        assert_eq!(plan.unresolved_target_count, 0);

        let mut doc = one_page_doc();
        let result = apply_plan(&mut doc, &plan).unwrap();
        assert_eq!(result.status, RedactionStatus::Unsupported);
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let ctx = PdfExtractionContext {
            spans: vec![span_on_page(9)],
            source: ExtractionSource::TextLayer,
        };
        let plan = build_plan(vec![ssn_match()], Some(&ctx));
        let mut doc = one_page_doc();
        assert!(matches!(
            apply_plan(&mut doc, &plan),
            Err(PdfError::MissingPage(9))
        ));
    }
}
