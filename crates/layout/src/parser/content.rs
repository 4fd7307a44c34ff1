//! Content-stream walker.
//!
//! Replays one page's operators through a simplified PDF graphics and text
//! state machine and produces the [`PageContent`] the layout engine works
//! on: positioned text runs in top-origin coordinates plus the vector path
//! instructions that may draw table rulings.
//!
//! | Operator            | Action                                   |
//! |---------------------|------------------------------------------|
//! | `q` / `Q`           | save / restore the CTM, forwarded         |
//! | `cm`                | concatenate onto the CTM, forwarded       |
//! | `m` `l` `re` `h`    | forwarded as path instructions            |
//! | `s` `b` `b*`        | forwarded as a close-path                 |
//! | `BT` ... `ET`       | text state machine                        |
//! | `Tj` `TJ` `'` `"`   | emit a [`GlyphRecord`]                    |

use log::{debug, warn};

use super::backend::{decode_text_simple, get_number_from_value, ContentOp, PageId, PdfBackend, PdfValue};
use crate::geometry::transform::{apply, multiply, Matrix, IDENTITY_MATRIX};
use crate::{GlyphRecord, LayoutError, PageContent, VectorOp};

/// Approximate glyph advance as a fraction of the font size. No font
/// metrics are read, so every character gets the same width.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// A `TJ` kerning displacement wider than this fraction of one character
/// is read as a word gap.
const TJ_GAP_RATIO: f32 = 0.3;

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource key (`/F1`), used for decoding.
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: Matrix,
    /// Start of the current line; set by BT, Tm and the line-moving operators.
    line_matrix: Matrix,
    /// Horizontal scaling (Tz / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn char_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Move to a new line offset from the start of the current one.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&self.line_matrix, &[1.0, 0.0, 0.0, 1.0, tx, ty]);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Advance past `text` as if it had been painted.
    fn advance_after_show(&mut self, text: &str) {
        let dx: f32 = text
            .chars()
            .map(|ch| {
                let space = if ch == ' ' { self.word_spacing } else { 0.0 };
                self.char_width() + self.char_spacing + space
            })
            .sum();
        self.advance_x(dx);
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

struct ContentWalker<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    page_height: f32,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    text: TextState,
    glyphs: Vec<GlyphRecord>,
    ops: Vec<VectorOp>,
}

impl<'a> ContentWalker<'a> {
    fn new(backend: &'a dyn PdfBackend, page_id: PageId, page_height: f32) -> Self {
        Self {
            backend,
            page_id,
            page_height,
            ctm: IDENTITY_MATRIX,
            ctm_stack: Vec::new(),
            text: TextState::default(),
            glyphs: Vec::new(),
            ops: Vec::new(),
        }
    }

    fn handle(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            // -- Graphics state -----------------------------------------
            "q" => {
                self.ctm_stack.push(self.ctm);
                self.ops.push(VectorOp::Save);
            }
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
                self.ops.push(VectorOp::Restore);
            }
            "cm" => {
                if let Some(m) = numbers::<6>(op) {
                    self.ctm = multiply(&self.ctm, &m);
                    self.ops.push(VectorOp::Transform(m));
                }
            }

            // -- Path construction --------------------------------------
            "m" => {
                if let Some([x, y]) = numbers::<2>(op) {
                    self.ops.push(VectorOp::MoveTo(x, y));
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(op) {
                    self.ops.push(VectorOp::LineTo(x, y));
                }
            }
            "re" => {
                if let Some([x, y, w, h]) = numbers::<4>(op) {
                    self.ops.push(VectorOp::Rectangle(x, y, w, h));
                }
            }
            "h" | "s" | "b" | "b*" => self.ops.push(VectorOp::ClosePath),

            // -- Text object --------------------------------------------
            "BT" => {
                self.text.text_matrix = IDENTITY_MATRIX;
                self.text.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}
            "Tf" => self.set_font(&op.operands),
            "Tm" => {
                if let Some(m) = numbers::<6>(op) {
                    self.text.text_matrix = m;
                    self.text.line_matrix = m;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(op) {
                    self.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(op) {
                    self.text.leading = -ty;
                    self.text.translate_line(tx, ty);
                }
            }
            "T*" => self.text.next_line(),
            "TL" => {
                if let Some([v]) = numbers::<1>(op) {
                    self.text.leading = v;
                }
            }
            "Tc" => {
                if let Some([v]) = numbers::<1>(op) {
                    self.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some([v]) = numbers::<1>(op) {
                    self.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some([v]) = numbers::<1>(op) {
                    self.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some([v]) = numbers::<1>(op) {
                    self.text.text_rise = v;
                }
            }

            // -- Text showing -------------------------------------------
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    self.show_string(operand);
                }
            }
            "TJ" => match op.operands.first() {
                Some(PdfValue::Array(elements)) => self.show_array(elements),
                _ => warn!("TJ without an array operand"),
            },
            "'" => {
                self.text.next_line();
                if let Some(operand) = op.operands.first() {
                    self.show_string(operand);
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        self.text.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        self.text.char_spacing = ac;
                    }
                    self.text.next_line();
                    self.show_string(&op.operands[2]);
                }
            }

            _ => {}
        }
    }

    fn set_font(&mut self, operands: &[PdfValue]) {
        let (Some(PdfValue::Name(key)), Some(size)) = (
            operands.first(),
            operands.get(1).and_then(get_number_from_value),
        ) else {
            warn!("malformed Tf operands: {operands:?}");
            return;
        };
        self.text.font_key = key.clone();
        self.text.font_size = size;
    }

    fn decode(&self, operand: &PdfValue) -> String {
        match operand {
            PdfValue::Str(bytes) => {
                let decoded = self
                    .backend
                    .decode_text(self.page_id, &self.text.font_key, bytes);
                if decoded.is_empty() {
                    decode_text_simple(bytes)
                } else {
                    decoded
                }
            }
            _ => String::new(),
        }
    }

    fn show_string(&mut self, operand: &PdfValue) {
        let text = self.decode(operand);
        let start = self.text.text_matrix;
        self.text.advance_after_show(&text);
        let end = self.text.text_matrix;
        self.emit(text, start, end);
    }

    /// `TJ`: strings interleaved with kerning adjustments in thousandths of
    /// a text-space unit. The whole array becomes one run; a kerning gap
    /// wide enough to separate words inserts a space.
    fn show_array(&mut self, elements: &[PdfValue]) {
        let mut buf = String::new();
        let mut start: Option<Matrix> = None;
        let mut end = self.text.text_matrix;

        for element in elements {
            if let PdfValue::Str(_) = element {
                let fragment = self.decode(element);
                start.get_or_insert(self.text.text_matrix);
                buf.push_str(&fragment);
                self.text.advance_after_show(&fragment);
                end = self.text.text_matrix;
            } else if let Some(adj) = get_number_from_value(element) {
                let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
                if dx > self.text.char_width() * TJ_GAP_RATIO && !buf.is_empty() {
                    buf.push(' ');
                }
                self.text.advance_x(dx);
            }
        }

        if let Some(start) = start {
            self.emit(buf, start, end);
        }
    }

    /// Record a text run painted from text matrix `start` to `end`.
    fn emit(&mut self, text: String, start: Matrix, end: Matrix) {
        if text.trim().is_empty() {
            return;
        }

        let rise = self.text.text_rise;
        let start_rm = multiply(&self.ctm, &start);
        let end_rm = multiply(&self.ctm, &end);
        let (x0, baseline) = apply(&start_rm, 0.0, rise);
        let (x1, _) = apply(&end_rm, 0.0, rise);

        let vertical_scale = (start_rm[2].powi(2) + start_rm[3].powi(2)).sqrt();
        let height = (self.text.font_size * vertical_scale).abs();
        let y_top = self.page_height - baseline - height;

        self.glyphs.push(GlyphRecord::new(
            text.trim_end(),
            x0.min(x1),
            y_top,
            (x1 - x0).abs(),
            height,
        ));
    }
}

/// The first `N` operands as numbers; logs and returns `None` when they are
/// missing or not numeric.
fn numbers<const N: usize>(op: &ContentOp) -> Option<[f32; N]> {
    let values = op.numbers::<N>();
    if values.is_none() {
        warn!(
            "skipping `{}` with unusable operands: {:?}",
            op.operator, op.operands
        );
    }
    values
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk one page's content stream into a [`PageContent`].
pub fn extract_page_content(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<PageContent, LayoutError> {
    let (_, page_height) = backend.page_size(page_id)?;
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let annotations = backend.page_annotations(page_id).unwrap_or_else(|e| {
        warn!("ignoring annotations of page {page_id:?}: {e}");
        Vec::new()
    });

    let mut walker = ContentWalker::new(backend, page_id, page_height);
    for op in &ops {
        walker.handle(op);
    }
    debug!(
        "page {page_id:?}: {} glyph runs, {} vector instructions",
        walker.glyphs.len(),
        walker.ops.len()
    );

    Ok(PageContent {
        page_height,
        glyphs: walker.glyphs,
        ops: walker.ops,
        annotations,
    })
}
