//! Text layout extraction and lead-in phrase matching
//!
//! Page content streams are interpreted just far enough to know where every
//! shown string lands: the graphics state stack, the CTM, the text matrices
//! and the text state parameters that affect advance widths. Consecutive
//! strings in the same font and size that continue the same baseline are
//! merged into one span, which is the unit the phrase locator matches on.

use std::collections::{HashMap, VecDeque};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use log::debug;

use crate::error::{Error, Result};
use crate::layout::{Matrix, Orientation, PageFrame, Point, Rect};
use crate::pdf::fonts::FontInfo;
use crate::pdf::resources::{get_resolved, number, page_media_box, page_resources, resolve};

/// Lead-in phrases that identify the best-by field, matched case-sensitively
pub const LEAD_IN_PHRASES: [&str; 2] = ["Best if used by:", "Best if Used By:"];

/// A text-showing operator that contributed to a span
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpanPiece {
    /// Index of the operator in the decoded page content
    pub op_index: usize,
    /// `TJ` adjustment (thousandths of text space) equal to the operator's advance
    pub displacement: f32,
}

/// A run of text sharing one font and size along one baseline
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Em box above the baseline, in page space
    pub bbox: Rect,
    /// Effective font size after text and CTM scaling
    pub font_size: f32,
    /// Font resource name used by the span
    pub font: String,
    pub(crate) pieces: Vec<SpanPiece>,
}

/// A span whose text starts with one of the lead-in phrases
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpanMatch {
    /// Zero-based page index
    pub page_index: usize,
    pub bbox: Rect,
    pub font_size: f32,
    pub orientation: Orientation,
    pub matched_phrase: String,
    pub original_text: String,
    pub(crate) pieces: Vec<SpanPiece>,
}

/// Decoded content and text layout of one page
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_id: ObjectId,
    pub frame: PageFrame,
    pub operations: Vec<Operation>,
    pub spans: Vec<TextSpan>,
}

/// Page ids in page order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Decode a page's content streams into operations
pub fn page_operations(doc: &Document, page_id: ObjectId) -> Result<Vec<Operation>> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)
        .map_err(|e| Error::Decode(format!("content stream of page {:?}: {}", page_id, e)))?;
    Ok(content.operations)
}

/// Coordinate frame of a page (MediaBox, or US Letter if missing)
pub fn page_frame(doc: &Document, page_id: ObjectId) -> PageFrame {
    page_media_box(doc, page_id)
        .map(PageFrame::from_media_box)
        .unwrap_or_else(PageFrame::letter)
}

/// Lay out all text on a page
pub fn page_layout(doc: &Document, page_id: ObjectId) -> Result<PageLayout> {
    let operations = page_operations(doc, page_id)?;
    let frame = page_frame(doc, page_id);
    let fonts = page_fonts(doc, page_id);
    let spans = extract_spans(&operations, &fonts, frame);
    Ok(PageLayout { page_id, frame, operations, spans })
}

/// Font resources available to a page, keyed by resource name
fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontInfo> {
    let resources = page_resources(doc, page_id);
    let mut fonts = HashMap::new();
    if let Some(Object::Dictionary(font_dict)) = get_resolved(doc, &resources, b"Font") {
        for (name, value) in font_dict.iter() {
            if let Object::Dictionary(font) = resolve(doc, value) {
                fonts.insert(name.clone(), FontInfo::from_dict(doc, font));
            }
        }
    }
    fonts
}

/// Text state parameters (part of the graphics state)
#[derive(Debug, Clone)]
struct TextState {
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
    font: Vec<u8>,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: Vec::new(),
            font_size: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// A span being assembled
struct SpanBuilder {
    text: String,
    bbox: Rect,
    font: Vec<u8>,
    font_size: f32,
    direction: Point,
    /// Pen position after the last piece, in user space
    end: Point,
    pieces: Vec<SpanPiece>,
}

impl SpanBuilder {
    /// Whether a run starting at `start` continues this span's baseline
    fn continues(&self, font: &[u8], font_size: f32, direction: Point, start: Point) -> bool {
        if self.font != font || (self.font_size - font_size).abs() > 0.01 * font_size.max(1.0) {
            return false;
        }
        let alignment = self.direction.x * direction.x + self.direction.y * direction.y;
        if alignment < 0.99 {
            return false;
        }
        let (dx, dy) = (start.x - self.end.x, start.y - self.end.y);
        let along = dx * self.direction.x + dy * self.direction.y;
        let across = (dx * self.direction.y - dy * self.direction.x).abs();
        across < 0.25 * font_size && along > -0.5 * font_size && along < 1.5 * font_size
    }

    /// Gap between the span end and `start`, along the baseline
    fn gap_to(&self, start: Point) -> f32 {
        (start.x - self.end.x) * self.direction.x + (start.y - self.end.y) * self.direction.y
    }

    fn finish(self) -> TextSpan {
        TextSpan {
            text: self.text,
            bbox: self.bbox,
            font_size: self.font_size,
            font: String::from_utf8_lossy(&self.font).into_owned(),
            pieces: self.pieces,
        }
    }
}

/// One string shown by an operator, measured
struct ShownRun {
    text: String,
    /// Total advance in text space (horizontal)
    advance: f32,
}

struct Interpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, FontInfo>,
    default_font: FontInfo,
    frame: PageFrame,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    current: Option<SpanBuilder>,
    spans: Vec<TextSpan>,
}

/// Interpret decoded operations into spans, in scan order
pub(crate) fn extract_spans(
    operations: &[Operation],
    fonts: &HashMap<Vec<u8>, FontInfo>,
    frame: PageFrame,
) -> Vec<TextSpan> {
    let mut interp = Interpreter {
        fonts,
        default_font: FontInfo::helvetica(),
        frame,
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: Matrix::identity(),
        line_matrix: Matrix::identity(),
        current: None,
        spans: Vec::new(),
    };

    for (index, op) in operations.iter().enumerate() {
        interp.execute(index, op);
    }

    interp.flush();
    interp.spans
}

impl Interpreter<'_> {
    fn execute(&mut self, index: usize, op: &Operation) {
        let nums: Vec<f32> = op.operands.iter().filter_map(number).collect();

        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" if nums.len() == 6 => {
                let m = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                self.state.ctm = m.then(&self.state.ctm);
            }
            "BT" => {
                self.text_matrix = Matrix::identity();
                self.line_matrix = Matrix::identity();
            }
            "Tc" if !nums.is_empty() => self.state.text.char_spacing = nums[0],
            "Tw" if !nums.is_empty() => self.state.text.word_spacing = nums[0],
            "Tz" if !nums.is_empty() => self.state.text.horizontal_scaling = nums[0] / 100.0,
            "TL" if !nums.is_empty() => self.state.text.leading = nums[0],
            "Ts" if !nums.is_empty() => self.state.text.rise = nums[0],
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (op.operands.first(), op.operands.get(1).and_then(number))
                {
                    self.state.text.font = name.clone();
                    self.state.text.font_size = size;
                }
            }
            "Td" if nums.len() == 2 => self.move_line(nums[0], nums[1]),
            "TD" if nums.len() == 2 => {
                self.state.text.leading = -nums[1];
                self.move_line(nums[0], nums[1]);
            }
            "Tm" if nums.len() == 6 => {
                let m = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                self.text_matrix = m;
                self.line_matrix = m;
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(string @ Object::String(..)) = op.operands.first() {
                    self.show(index, std::slice::from_ref(string));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    self.show(index, items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(string @ Object::String(..)) = op.operands.first() {
                    self.show(index, std::slice::from_ref(string));
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(string @ Object::String(..)) = op.operands.get(2) {
                    self.show(index, std::slice::from_ref(string));
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Advance the text matrix over `items` (strings and TJ adjustments) and
    /// record the shown text against the current span
    fn show(&mut self, index: usize, items: &[Object]) {
        let text_state = self.state.text.clone();
        let font = self.fonts.get(&text_state.font).unwrap_or(&self.default_font);
        let start_matrix = self.text_matrix;
        let size = text_state.font_size;
        let scale = text_state.horizontal_scaling;

        let mut run = ShownRun { text: String::new(), advance: 0.0 };
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    for glyph in font.decode(bytes) {
                        let mut tx = glyph.width / 1000.0 * size + text_state.char_spacing;
                        if glyph.is_word_space {
                            tx += text_state.word_spacing;
                        }
                        run.advance += tx * scale;
                        run.text.push_str(&glyph.text);
                    }
                }
                other => {
                    if let Some(adjust) = number(other) {
                        let tx = -adjust / 1000.0 * size * scale;
                        // A visible gap inside one TJ reads as a word break
                        if tx > 0.2 * size && !run.text.is_empty() && !run.text.ends_with(' ') {
                            run.text.push(' ');
                        }
                        run.advance += tx;
                    }
                }
            }
        }

        self.text_matrix = Matrix::translation(run.advance, 0.0).then(&start_matrix);
        self.record(index, run, start_matrix, &text_state);
    }

    fn record(&mut self, index: usize, run: ShownRun, start_matrix: Matrix, text_state: &TextState) {
        // Glyph-free runs only move the pen
        if run.text.is_empty() {
            return;
        }
        let size = text_state.font_size;
        let rendering = start_matrix.then(&self.state.ctm);

        let vertical = rendering.transform_vector(0.0, 1.0).length();
        let effective_size = size * vertical;
        let horizontal = rendering.transform_vector(1.0, 0.0);
        let length = horizontal.length();
        if !(effective_size.is_finite() && length.is_finite())
            || effective_size <= 0.0
            || length <= 0.0
        {
            return;
        }
        let direction = Point { x: horizontal.x / length, y: horizontal.y / length };

        let displacement = if size * text_state.horizontal_scaling != 0.0 {
            -run.advance * 1000.0 / (size * text_state.horizontal_scaling)
        } else {
            0.0
        };
        let piece = SpanPiece { op_index: index, displacement };

        let rise = text_state.rise;
        let corners = [
            (0.0, rise),
            (run.advance, rise),
            (0.0, rise + size),
            (run.advance, rise + size),
        ];
        let points: Vec<Point> = corners
            .iter()
            .map(|(x, y)| self.frame.to_page(rendering.transform_point(*x, *y)))
            .collect();
        let bbox = Rect::bounding(&points);
        if !bbox.is_finite() {
            debug!("skipping text run with non-finite geometry: {:?}", run.text);
            return;
        }
        let start = rendering.transform_point(0.0, 0.0);
        let end = rendering.transform_point(run.advance, 0.0);

        let continues = self
            .current
            .as_ref()
            .is_some_and(|span| span.continues(&text_state.font, effective_size, direction, start));

        if continues {
            if let Some(span) = self.current.as_mut() {
                let gap = span.gap_to(start);
                if gap > 0.2 * effective_size
                    && !span.text.ends_with(char::is_whitespace)
                    && !run.text.starts_with(char::is_whitespace)
                {
                    span.text.push(' ');
                }
                span.text.push_str(&run.text);
                span.bbox = span.bbox.union(&bbox);
                span.end = end;
                span.pieces.push(piece);
            }
            return;
        }

        // Whitespace alone never starts a span
        if run.text.trim().is_empty() {
            return;
        }

        self.flush();
        self.current = Some(SpanBuilder {
            text: run.text,
            bbox,
            font: text_state.font.clone(),
            font_size: effective_size,
            direction,
            end,
            pieces: vec![piece],
        });
    }

    fn flush(&mut self) {
        if let Some(span) = self.current.take() {
            self.spans.push(span.finish());
        }
    }
}

/// Match spans against lead-in phrases (prefix match on trimmed text)
pub fn match_spans<S: AsRef<str>>(page_index: usize, spans: &[TextSpan], phrases: &[S]) -> Vec<TextSpanMatch> {
    spans
        .iter()
        .filter_map(|span| {
            let text = span.text.trim();
            let phrase = phrases.iter().map(AsRef::as_ref).find(|p| text.starts_with(p))?;
            Some(TextSpanMatch {
                page_index,
                bbox: span.bbox,
                font_size: span.font_size,
                orientation: span.bbox.orientation(),
                matched_phrase: phrase.to_string(),
                original_text: text.to_string(),
                pieces: span.pieces.clone(),
            })
        })
        .collect()
}

/// Lazy, page-by-page scan of a document for lead-in phrases
///
/// Each call to [`find_matches`] starts a fresh scan.
pub struct PhraseLocator<'a> {
    doc: &'a Document,
    phrases: Vec<String>,
    pages: std::iter::Enumerate<std::vec::IntoIter<ObjectId>>,
    pending: VecDeque<TextSpanMatch>,
}

impl Iterator for PhraseLocator<'_> {
    type Item = Result<TextSpanMatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(found) = self.pending.pop_front() {
                return Some(Ok(found));
            }
            let (page_index, page_id) = self.pages.next()?;
            match page_layout(self.doc, page_id) {
                Ok(layout) => {
                    let matches = match_spans(page_index, &layout.spans, &self.phrases);
                    for m in &matches {
                        debug!(
                            "page {}: '{}' at {} size {:.1} ({}°)",
                            page_index + 1,
                            m.original_text,
                            m.bbox,
                            m.font_size,
                            m.orientation.degrees()
                        );
                    }
                    self.pending.extend(matches);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Scan every page of `doc` for spans starting with one of `phrases`
pub fn find_matches<'a, S: AsRef<str>>(doc: &'a Document, phrases: &[S]) -> PhraseLocator<'a> {
    PhraseLocator {
        doc,
        phrases: phrases.iter().map(|p| p.as_ref().to_string()).collect(),
        pages: page_ids(doc).into_iter().enumerate(),
        pending: VecDeque::new(),
    }
}
