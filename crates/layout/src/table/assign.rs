use std::collections::HashSet;

use crate::types::{GlyphRecord, Table};

/// Distribute glyphs into table cells by midpoint containment.
///
/// Tables are tried in order and the first one whose outer bounds contain a
/// glyph's midpoint (within `eps`) owns it; inside that table the first cell
/// in row-major order that contains the midpoint receives the glyph. Every
/// assigned glyph index is added to `consumed`, and glyphs already in
/// `consumed` are skipped.
pub fn assign_glyphs(
    tables: &mut [Table],
    glyphs: &[GlyphRecord],
    consumed: &mut HashSet<usize>,
    eps: f32,
) {
    for (idx, glyph) in glyphs.iter().enumerate() {
        if consumed.contains(&idx) {
            continue;
        }
        let (mx, my) = (glyph.mid_x(), glyph.mid_y());

        for table in tables.iter_mut() {
            if !within(mx, my, (table.left, table.top, table.right, table.bottom), eps) {
                continue;
            }
            if let Some((r, c)) = owning_cell(table, mx, my, eps) {
                table.grid[r][c].glyphs.push(glyph.clone());
                consumed.insert(idx);
                break;
            }
        }
    }
}

/// First cell, scanning row-major, whose bounds contain the point.
fn owning_cell(table: &Table, mx: f32, my: f32, eps: f32) -> Option<(usize, usize)> {
    (0..table.rows)
        .flat_map(|r| (0..table.cols).map(move |c| (r, c)))
        .find(|&(r, c)| within(mx, my, table.cell_bounds(r, c), eps))
}

fn within(x: f32, y: f32, (left, top, right, bottom): (f32, f32, f32, f32), eps: f32) -> bool {
    x >= left - eps && x <= right + eps && y >= top - eps && y <= bottom + eps
}
