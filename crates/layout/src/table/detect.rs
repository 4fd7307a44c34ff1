//! Ruled table detection.
//!
//! ```text
//! segments -> rulings -> grid -> present cells -> regions -> tables
//!             split       cluster  edge coverage   flood fill
//! ```

use std::collections::{HashSet, VecDeque};

use log::debug;

use super::assign::assign_glyphs;
use crate::config::LayoutConfig;
use crate::geometry::grid::{infer_grid, split_rulings, RulingGrid, Rulings};
use crate::types::{GlyphRecord, Segment, Table, TableCell};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Direction an edge runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Edge along x at a fixed y.
    Horizontal,
    /// Edge along y at a fixed x.
    Vertical,
}

/// A connected block of present cells, as inclusive grid index ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegion {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
    /// Number of present cells in the component.
    pub cells: usize,
}

/// Tables found on a page and the glyphs they absorbed.
#[derive(Debug, Clone, Default)]
pub struct TableDetection {
    pub tables: Vec<Table>,
    /// Indices into the page's glyph list.
    pub consumed: HashSet<usize>,
}

/// Dense boolean matrix indexed by `(row, col)`.
#[derive(Debug, Clone)]
pub struct CellMatrix {
    rows: usize,
    cols: usize,
    data: Vec<bool>,
}

impl CellMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![false; rows * cols],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.data[row * self.cols + col] = value;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Detect ruled tables and distribute `glyphs` into their cells.
pub fn detect_tables(
    segments: &[Segment],
    glyphs: &[GlyphRecord],
    config: &LayoutConfig,
) -> TableDetection {
    let rulings = split_rulings(segments, config.eps);
    let Some(grid) = infer_grid(&rulings, config.eps) else {
        return TableDetection::default();
    };

    let present = present_cells(&grid, &rulings, config);
    let regions = find_regions(&present, config.min_table_cells);
    debug!(
        "grid {}x{}: {} table region(s)",
        grid.rows(),
        grid.cols(),
        regions.len()
    );

    let mut tables: Vec<Table> = regions
        .iter()
        .map(|region| materialize(region, &grid))
        .collect();

    let mut consumed = HashSet::new();
    assign_glyphs(&mut tables, glyphs, &mut consumed, config.eps);

    TableDetection { tables, consumed }
}

// ---------------------------------------------------------------------------
// Edge coverage
// ---------------------------------------------------------------------------

/// Return `true` when the rulings lying on `fixed` cover `[start, end]`.
///
/// Candidate rulings are sorted by their start and a reached frontier is
/// extended greedily. Gaps up to `edge_eps` are bridged, so a border drawn
/// as several abutting strokes still counts.
pub fn has_edge(
    rulings: &[Segment],
    start: f32,
    end: f32,
    fixed: f32,
    axis: Axis,
    eps: f32,
    edge_eps: f32,
) -> bool {
    let mut spans: Vec<(f32, f32)> = rulings
        .iter()
        .filter_map(|s| {
            let (pos, a, b) = match axis {
                Axis::Horizontal => ((s.y0 + s.y1) / 2.0, s.x0, s.x1),
                Axis::Vertical => ((s.x0 + s.x1) / 2.0, s.y0, s.y1),
            };
            ((pos - fixed).abs() <= eps).then(|| (a.min(b), a.max(b)))
        })
        .collect();

    spans.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let target = end - edge_eps;
    let mut reached = start;
    for (lo, hi) in spans {
        if lo > reached + edge_eps {
            break;
        }
        reached = reached.max(hi);
        if reached >= target {
            return true;
        }
    }
    false
}

/// Mark every grid cell whose four sides are covered by rulings.
pub fn present_cells(grid: &RulingGrid, rulings: &Rulings, config: &LayoutConfig) -> CellMatrix {
    let (eps, edge_eps) = (config.eps, config.edge_eps);
    let mut present = CellMatrix::new(grid.rows(), grid.cols());

    for r in 0..grid.rows() {
        let (top, bottom) = (grid.ys[r], grid.ys[r + 1]);
        for c in 0..grid.cols() {
            let (left, right) = (grid.xs[c], grid.xs[c + 1]);
            let h = &rulings.horizontal;
            let v = &rulings.vertical;
            let ok = has_edge(h, left, right, top, Axis::Horizontal, eps, edge_eps)
                && has_edge(h, left, right, bottom, Axis::Horizontal, eps, edge_eps)
                && has_edge(v, top, bottom, left, Axis::Vertical, eps, edge_eps)
                && has_edge(v, top, bottom, right, Axis::Vertical, eps, edge_eps);
            present.set(r, c, ok);
        }
    }

    present
}

// ---------------------------------------------------------------------------
// Connected regions
// ---------------------------------------------------------------------------

/// 4-connected components of present cells with at least `min_cells` cells.
///
/// Uses an explicit worklist and a visited matrix sized to the grid.
pub fn find_regions(present: &CellMatrix, min_cells: usize) -> Vec<TableRegion> {
    let (rows, cols) = (present.rows(), present.cols());
    let mut visited = CellMatrix::new(rows, cols);
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut regions = Vec::new();

    for r0 in 0..rows {
        for c0 in 0..cols {
            if !present.get(r0, c0) || visited.get(r0, c0) {
                continue;
            }

            let mut region = TableRegion {
                row_min: r0,
                row_max: r0,
                col_min: c0,
                col_max: c0,
                cells: 0,
            };
            visited.set(r0, c0, true);
            queue.push_back((r0, c0));

            while let Some((r, c)) = queue.pop_front() {
                region.cells += 1;
                region.row_min = region.row_min.min(r);
                region.row_max = region.row_max.max(r);
                region.col_min = region.col_min.min(c);
                region.col_max = region.col_max.max(c);

                let mut neighbours = Vec::with_capacity(4);
                if r > 0 {
                    neighbours.push((r - 1, c));
                }
                if r + 1 < rows {
                    neighbours.push((r + 1, c));
                }
                if c > 0 {
                    neighbours.push((r, c - 1));
                }
                if c + 1 < cols {
                    neighbours.push((r, c + 1));
                }

                for (nr, nc) in neighbours {
                    if present.get(nr, nc) && !visited.get(nr, nc) {
                        visited.set(nr, nc, true);
                        queue.push_back((nr, nc));
                    }
                }
            }

            if region.cells >= min_cells {
                regions.push(region);
            } else {
                debug!("discarding {}-cell region at ({r0}, {c0})", region.cells);
            }
        }
    }

    regions
}

/// Build a dense table over the region's bounding rectangle.
///
/// Interior cells that were not individually present still get a slot;
/// they are treated as merged cells or missing rulings.
pub fn materialize(region: &TableRegion, grid: &RulingGrid) -> Table {
    let rows = region.row_max - region.row_min + 1;
    let cols = region.col_max - region.col_min + 1;
    let row_edges = grid.ys[region.row_min..=region.row_max + 1].to_vec();
    let col_edges = grid.xs[region.col_min..=region.col_max + 1].to_vec();

    Table {
        top: row_edges[0],
        left: col_edges[0],
        bottom: row_edges[rows],
        right: col_edges[cols],
        rows,
        cols,
        row_edges,
        col_edges,
        grid: vec![vec![TableCell::default(); cols]; rows],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
