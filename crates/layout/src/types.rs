use serde::{Deserialize, Serialize};

/// Number of data columns in a quarter table: four quarters plus the total.
pub const QUARTER_COLUMNS: usize = 5;

// ---------------------------------------------------------------------------
// Decoder output
// ---------------------------------------------------------------------------

/// One positioned run of decoded text, in top-origin page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphRecord {
    pub text: String,
    pub x: f32,
    /// Top edge of the run; y grows downward from the top of the page.
    pub y_top: f32,
    pub width: f32,
    pub height: f32,
}

impl GlyphRecord {
    pub fn new(text: impl Into<String>, x: f32, y_top: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y_top,
            width,
            height,
        }
    }

    pub fn mid_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        self.y_top + self.height / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A single low-level vector drawing instruction.
///
/// Coordinates are in untransformed user space with the PDF bottom-left
/// origin; the transform tracker resolves them to page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorOp {
    Save,
    Restore,
    /// Affine matrix `[a, b, c, d, e, f]` concatenated onto the current one.
    Transform([f32; 6]),
    MoveTo(f32, f32),
    LineTo(f32, f32),
    /// `x, y, width, height`.
    Rectangle(f32, f32, f32, f32),
    ClosePath,
    /// Anything the decoder forwards that the tracker does not understand.
    Other(String),
}

/// A link annotation with its bounding box `[x0, y0, x1, y1]` in PDF space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub url: String,
    pub rect: [f32; 4],
}

/// Everything the layout engine needs to know about one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub page_height: f32,
    pub glyphs: Vec<GlyphRecord>,
    pub ops: Vec<VectorOp>,
    pub annotations: Vec<Annotation>,
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A straight line segment in absolute top-origin page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Segment {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn is_horizontal(&self, eps: f32) -> bool {
        (self.y0 - self.y1).abs() <= eps
    }

    pub fn is_vertical(&self, eps: f32) -> bool {
        (self.x0 - self.x1).abs() <= eps
    }

    pub fn length(&self) -> f32 {
        ((self.x1 - self.x0).powi(2) + (self.y1 - self.y0).powi(2)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Layout output
// ---------------------------------------------------------------------------

/// Glyphs sharing a vertical band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Anchor y: the top of the first glyph that opened the line.
    pub y: f32,
    pub items: Vec<GlyphRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub glyphs: Vec<GlyphRecord>,
}

/// A ruled table materialized from a connected region of grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub rows: usize,
    pub cols: usize,
    /// Ruling positions bounding the rows, `rows + 1` values.
    pub row_edges: Vec<f32>,
    /// Ruling positions bounding the columns, `cols + 1` values.
    pub col_edges: Vec<f32>,
    /// Dense `rows x cols` cell matrix.
    pub grid: Vec<Vec<TableCell>>,
}

impl Table {
    /// Bounds of cell `(row, col)` as `(left, top, right, bottom)`.
    pub fn cell_bounds(&self, row: usize, col: usize) -> (f32, f32, f32, f32) {
        (
            self.col_edges[col],
            self.row_edges[row],
            self.col_edges[col + 1],
            self.row_edges[row + 1],
        )
    }
}

/// The borderless quarter-plus-total numeric layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterTable {
    pub y: f32,
    pub headers: [String; QUARTER_COLUMNS],
    /// Leading label of the value line.
    pub label: String,
    /// One entry per header column; missing values stay empty.
    pub values: [String; QUARTER_COLUMNS],
}

/// One renderable unit of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Table(Table),
    QuarterTable(QuarterTable),
    TextLine(TextLine),
}

impl Block {
    /// Top y-coordinate used for reading order.
    pub fn y(&self) -> f32 {
        match self {
            Block::Table(t) => t.top,
            Block::QuarterTable(q) => q.y,
            Block::TextLine(l) => l.y,
        }
    }
}

/// Result of reconstructing a single page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLayout {
    pub blocks: Vec<Block>,
    /// Rendered markup, one fragment per non-empty block.
    pub fragments: Vec<String>,
    /// Assembled text of every non-table line, top to bottom.
    pub lines: Vec<String>,
    pub annotations: Vec<Annotation>,
}
