//! Line assembly for free-standing (non-table) glyphs.

use super::cleanup::{collapse_whitespace, normalize_glyph_text};
use crate::types::{GlyphRecord, TextLine};

/// Group glyphs into lines by vertical proximity.
///
/// Glyphs are sorted by `(y_top, x)`. A glyph opens a new line when its top
/// differs from the current line's anchor by more than `eps`; the anchor is
/// the first glyph of the line and is never averaged. Items inside each
/// line are ordered left to right.
pub fn group_into_lines(glyphs: &[GlyphRecord], eps: f32) -> Vec<TextLine> {
    let mut sorted: Vec<&GlyphRecord> = glyphs.iter().collect();
    sorted.sort_by(|a, b| {
        a.y_top
            .partial_cmp(&b.y_top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    for glyph in sorted {
        match lines.last_mut() {
            Some(line) if (glyph.y_top - line.y).abs() <= eps => line.items.push(glyph.clone()),
            _ => lines.push(TextLine {
                y: glyph.y_top,
                items: vec![glyph.clone()],
            }),
        }
    }

    for line in &mut lines {
        sort_by_x(&mut line.items);
    }
    lines
}

/// Join a line's glyphs into readable text.
///
/// A space goes between two glyphs only when the gap from the end of one to
/// the start of the next exceeds `line_gap`; closer glyphs are kerned pieces
/// of the same word and are concatenated directly.
pub fn build_line_text(glyphs: &[GlyphRecord], line_gap: f32) -> String {
    let mut ordered: Vec<&GlyphRecord> = glyphs.iter().collect();
    ordered.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let mut text = String::new();
    let mut prev_right: Option<f32> = None;
    for glyph in ordered {
        if prev_right.is_some_and(|right| glyph.x - right > line_gap) {
            text.push(' ');
        }
        text.push_str(&normalize_glyph_text(&glyph.text));
        prev_right = Some(glyph.right());
    }

    collapse_whitespace(&text)
}

fn sort_by_x(items: &mut [GlyphRecord]) {
    items.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
}
