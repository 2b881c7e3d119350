//! Best-by label rewriting
//!
//! A matched span is replaced in place: its text-showing operators are
//! turned into plain pen moves, an opaque white box is painted over its
//! area and the new label is drawn in Helvetica at the span's anchor,
//! rotated with it when the span reads bottom to top.

use std::collections::{BTreeMap, HashMap};
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId};
use log::{debug, info};

use crate::date::{best_by_label, compute_best_by};
use crate::error::{Error, Result};
use crate::layout::{Matrix, Orientation, PageFrame, Rect};
use crate::pdf::metadata::count_pages;
use crate::pdf::resources::{add_font_to_page_resources, replace_page_content};
use crate::pdf::text::{find_matches, page_frame, page_ids, page_operations, TextSpanMatch, LEAD_IN_PHRASES};

/// Resource name of the replacement label font
pub const LABEL_FONT: &[u8] = b"BestByHelv";

/// Add the replacement label font (Helvetica, WinAnsi) to the document
pub fn add_label_font(doc: &mut Document) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Pending edits to one page's content
#[derive(Debug)]
pub struct PageEditor {
    page_index: usize,
    page_id: ObjectId,
    frame: PageFrame,
    operations: Vec<Operation>,
    /// Original operator index → operators that take its place
    replacements: HashMap<usize, Vec<Operation>>,
    /// Drawn after the original content
    overlay: Vec<Operation>,
}

impl PageEditor {
    pub fn open(doc: &Document, page_index: usize, page_id: ObjectId) -> Result<Self> {
        Ok(Self {
            page_index,
            page_id,
            frame: page_frame(doc, page_id),
            operations: page_operations(doc, page_id)?,
            replacements: HashMap::new(),
            overlay: Vec::new(),
        })
    }

    /// Erase `span` and draw `new_text` in its place
    pub fn rewrite(&mut self, span: &TextSpanMatch, new_text: &str) -> Result<()> {
        if span.page_index != self.page_index {
            return Err(Error::General(format!(
                "span on page {} cannot be rewritten on page {}",
                span.page_index + 1,
                self.page_index + 1
            )));
        }

        for piece in &span.pieces {
            let original = self.operations.get(piece.op_index).ok_or_else(|| {
                Error::Decode(format!(
                    "page {} has no operator {}",
                    self.page_index + 1,
                    piece.op_index
                ))
            })?;
            self.replacements
                .insert(piece.op_index, blank_out(original, piece.displacement));
        }

        self.overlay.extend(white_box(&self.frame, &span.bbox));
        self.overlay.extend(label_text(&self.frame, span, new_text));
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Write the edited content back into the page
    pub fn commit(self, doc: &mut Document, font_id: ObjectId) -> Result<()> {
        if !self.is_modified() {
            return Ok(());
        }
        let page_id = self.page_id;
        let content = self.into_content()?;
        replace_page_content(doc, page_id, content)?;
        add_font_to_page_resources(doc, page_id, LABEL_FONT, font_id)
    }

    /// Original content wrapped in `q ... Q`, followed by the overlay
    fn into_content(self) -> Result<Vec<u8>> {
        let PageEditor { operations, mut replacements, overlay, .. } = self;

        let mut edited = Vec::with_capacity(operations.len() + overlay.len() + 2);
        edited.push(Operation::new("q", vec![]));
        for (index, op) in operations.into_iter().enumerate() {
            match replacements.remove(&index) {
                Some(substitute) => edited.extend(substitute),
                None => edited.push(op),
            }
        }
        // Close whatever the original left open, then our own q
        for _ in 0..=unclosed_saves(&edited[1..]) {
            edited.push(Operation::new("Q", vec![]));
        }
        edited.extend(overlay);

        Ok(Content { operations: edited }.encode()?)
    }
}

/// Number of `q` operators left without a matching `Q`
fn unclosed_saves(operations: &[Operation]) -> usize {
    operations.iter().fold(0usize, |depth, op| match op.operator.as_str() {
        "q" => depth + 1,
        "Q" => depth.saturating_sub(1),
        _ => depth,
    })
}

/// Replacement for a text-showing operator: same pen movement, no glyphs
fn blank_out(original: &Operation, displacement: f32) -> Vec<Operation> {
    let advance = Operation::new("TJ", vec![Object::Array(vec![Object::Real(displacement)])]);
    match original.operator.as_str() {
        "'" => vec![Operation::new("T*", vec![]), advance],
        "\"" => {
            let mut ops = Vec::with_capacity(4);
            if let (Some(aw), Some(ac)) = (original.operands.first(), original.operands.get(1)) {
                ops.push(Operation::new("Tw", vec![aw.clone()]));
                ops.push(Operation::new("Tc", vec![ac.clone()]));
            }
            ops.push(Operation::new("T*", vec![]));
            ops.push(advance);
            ops
        }
        _ => vec![advance],
    }
}

/// Opaque white rectangle covering `bbox`
fn white_box(frame: &PageFrame, bbox: &Rect) -> Vec<Operation> {
    let x = bbox.x0 + frame.left;
    let y = frame.top - bbox.y1;
    vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![Object::Integer(1), Object::Integer(1), Object::Integer(1)]),
        Operation::new(
            "re",
            vec![Object::Real(x), Object::Real(y), Object::Real(bbox.width()), Object::Real(bbox.height())],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Black label text starting at the span's anchor
fn label_text(frame: &PageFrame, span: &TextSpanMatch, text: &str) -> Vec<Operation> {
    let anchor = frame.to_user(span.bbox.anchor(span.orientation));
    let quarter_turns = match span.orientation {
        Orientation::Normal => 0,
        Orientation::Rotated90 => 1,
    };
    let m = Matrix::rotation_at(quarter_turns, anchor.x, anchor.y);

    vec![
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        Operation::new("Tf", vec![Object::Name(LABEL_FONT.to_vec()), Object::Real(span.font_size)]),
        Operation::new(
            "Tm",
            [m.a, m.b, m.c, m.d, m.e, m.f].into_iter().map(Object::Real).collect(),
        ),
        Operation::new("Tj", vec![Object::string_literal(win_ansi_bytes(text))]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Encode text for a WinAnsi font; characters outside Latin-1 become `?`
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Replace every lead-in span in `doc` with `label`
///
/// Returns the spans that were replaced. The document is left untouched
/// when nothing matches.
pub fn replace_lead_in_spans(doc: &mut Document, label: &str) -> Result<Vec<TextSpanMatch>> {
    let matches: Vec<TextSpanMatch> = find_matches(doc, &LEAD_IN_PHRASES).collect::<Result<_>>()?;
    if matches.is_empty() {
        return Ok(matches);
    }

    let pages = page_ids(doc);
    let mut by_page: BTreeMap<usize, Vec<&TextSpanMatch>> = BTreeMap::new();
    for found in &matches {
        by_page.entry(found.page_index).or_default().push(found);
    }

    let font_id = add_label_font(doc);
    for (page_index, page_matches) in by_page {
        let page_id = *pages
            .get(page_index)
            .ok_or_else(|| Error::Decode(format!("page {} disappeared", page_index + 1)))?;
        let mut editor = PageEditor::open(doc, page_index, page_id)?;
        for found in page_matches {
            editor.rewrite(found, label)?;
            info!(
                "Replaced on page {}: '{}' -> '{}' (rotation={})",
                page_index + 1,
                found.original_text,
                label,
                found.orientation.degrees()
            );
        }
        editor.commit(doc, font_id)?;
    }

    Ok(matches)
}

/// A document after the best-by pass
#[derive(Debug)]
pub struct DocumentRewrite {
    /// Whether at least one span was replaced
    pub changed: bool,
    pub document: Document,
    pub best_by: NaiveDate,
    pub matches: Vec<TextSpanMatch>,
}

/// Rewrite every best-by span of a loaded document
///
/// The best-by date is computed once; all spans get the same label.
pub fn rewrite_document(mut document: Document, today: NaiveDate, shelf_life_days: u32) -> Result<DocumentRewrite> {
    let best_by = compute_best_by(today, shelf_life_days)?;
    let label = best_by_label(&best_by);
    let matches = replace_lead_in_spans(&mut document, &label)?;
    Ok(DocumentRewrite {
        changed: !matches.is_empty(),
        document,
        best_by,
        matches,
    })
}

/// Result of rewriting serialized PDF content
#[derive(Debug, Clone)]
pub struct PdfRewrite {
    pub changed: bool,
    /// New content, or the input bytes unchanged when nothing matched
    pub content: Vec<u8>,
    pub best_by: NaiveDate,
    pub replaced: usize,
}

/// Rewrite the best-by spans of serialized PDF content
///
/// `name` identifies the document in errors. Content that is not a PDF, or
/// a PDF without pages, is rejected before anything is rewritten.
pub fn rewrite_pdf(content: &[u8], name: &str, today: NaiveDate, shelf_life_days: u32) -> Result<PdfRewrite> {
    let document = Document::load_mem(content)
        .map_err(|e| Error::Decode(format!("{}: {}", name, e)))?;
    count_pages(&document, name)?;

    let rewrite = rewrite_document(document, today, shelf_life_days)?;
    if !rewrite.changed {
        debug!("{}: no best-by label found", name);
        return Ok(PdfRewrite {
            changed: false,
            content: content.to_vec(),
            best_by: rewrite.best_by,
            replaced: 0,
        });
    }

    let mut document = rewrite.document;
    document.prune_objects();
    document.compress();
    let mut output = Vec::new();
    document.save_to(&mut output)?;

    Ok(PdfRewrite {
        changed: true,
        content: output,
        best_by: rewrite.best_by,
        replaced: rewrite.matches.len(),
    })
}
