use html_escape::encode_text;

use crate::config::LayoutConfig;
use crate::text::lines::{build_line_text, group_into_lines};
use crate::text::quarter::is_numeric_literal;
use crate::types::{Block, QuarterTable, Table, TableCell};

const TABLE_OPEN: &str =
    r#"<table border="1" cellspacing="0" cellpadding="4" style="border-collapse:collapse">"#;
const NUMERIC_STYLE: &str = "text-align:right;white-space:nowrap";
const TEXT_STYLE: &str = "text-align:left";

/// Sort blocks top to bottom. Ties keep their discovery order.
pub fn order_blocks(blocks: &mut [Block]) {
    blocks.sort_by(|a, b| a.y().partial_cmp(&b.y()).unwrap_or(std::cmp::Ordering::Equal));
}

/// Render each block to an HTML fragment, skipping blocks with no output.
pub fn render_blocks(blocks: &[Block], config: &LayoutConfig) -> Vec<String> {
    blocks
        .iter()
        .filter_map(|block| render_block(block, config))
        .collect()
}

pub fn render_block(block: &Block, config: &LayoutConfig) -> Option<String> {
    match block {
        Block::Table(table) => Some(render_table(table, config)),
        Block::QuarterTable(quarter) => Some(render_quarter_table(quarter)),
        Block::TextLine(line) => {
            let text = build_line_text(&line.items, config.line_gap);
            (!text.is_empty()).then(|| format!("<p>{}</p>", encode_text(&text)))
        }
    }
}

pub fn render_table(table: &Table, config: &LayoutConfig) -> String {
    let mut out = String::from(TABLE_OPEN);
    for row in &table.grid {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&render_cell(&cell_text(cell, config)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

pub fn render_quarter_table(quarter: &QuarterTable) -> String {
    let mut out = String::from(TABLE_OPEN);

    out.push_str("<tr>");
    out.push_str(&render_cell(""));
    for header in &quarter.headers {
        out.push_str(&render_cell(header));
    }
    out.push_str("</tr><tr>");
    out.push_str(&render_cell(&quarter.label));
    for value in &quarter.values {
        out.push_str(&render_cell(value));
    }
    out.push_str("</tr></table>");
    out
}

/// Text of a table cell: its glyphs assembled line by line.
pub fn cell_text(cell: &TableCell, config: &LayoutConfig) -> String {
    group_into_lines(&cell.glyphs, config.eps)
        .iter()
        .map(|line| build_line_text(&line.items, config.line_gap))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_cell(text: &str) -> String {
    let style = if is_numeric_literal(text) {
        NUMERIC_STYLE
    } else {
        TEXT_STYLE
    };
    format!(r#"<td style="{style}">{}</td>"#, encode_text(text))
}
