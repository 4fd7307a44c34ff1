//! Per-page reconstruction: vector segments, ruled tables, free text lines
//! and the quarter-table fallback merged into one ordered block list.

use log::debug;

use crate::config::LayoutConfig;
use crate::geometry::transform::extract_segments;
use crate::render::html::{order_blocks, render_blocks};
use crate::table::detect::detect_tables;
use crate::text::lines::{build_line_text, group_into_lines};
use crate::text::quarter::detect_quarter_table;
use crate::types::{Block, GlyphRecord, PageContent, PageLayout};

/// Run the whole layout pipeline over one decoded page.
///
/// Glyphs placed into a ruled table never reach the line assembler. The
/// quarter-table fallback is only tried when the page has no ruled table,
/// and on a match its header and value lines are replaced by the synthetic
/// block.
pub fn reconstruct_page(page: &PageContent, config: &LayoutConfig) -> PageLayout {
    let segments = extract_segments(&page.ops, page.page_height, config);
    let detection = detect_tables(&segments, &page.glyphs, config);

    let free: Vec<GlyphRecord> = page
        .glyphs
        .iter()
        .enumerate()
        .filter(|(idx, _)| !detection.consumed.contains(idx))
        .map(|(_, glyph)| glyph.clone())
        .collect();
    let lines = group_into_lines(&free, config.eps);

    let line_texts: Vec<String> = lines
        .iter()
        .map(|line| build_line_text(&line.items, config.line_gap))
        .filter(|text| !text.is_empty())
        .collect();

    let quarter = if detection.tables.is_empty() {
        detect_quarter_table(&lines, config)
    } else {
        debug!(
            "{} ruled table(s) found, skipping quarter-table fallback",
            detection.tables.len()
        );
        None
    };

    let mut blocks: Vec<Block> = detection.tables.into_iter().map(Block::Table).collect();
    let mut replaced: Vec<usize> = Vec::new();
    if let Some(found) = quarter {
        replaced = vec![found.header_line, found.value_line];
        blocks.push(Block::QuarterTable(found.table));
    }
    blocks.extend(
        lines
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !replaced.contains(idx))
            .map(|(_, line)| Block::TextLine(line)),
    );

    order_blocks(&mut blocks);
    let fragments = render_blocks(&blocks, config);

    PageLayout {
        blocks,
        fragments,
        lines: line_texts,
        annotations: page.annotations.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VectorOp;

    const PAGE_HEIGHT: f32 = 800.0;

    fn glyph(text: &str, x: f32, y_top: f32, width: f32) -> GlyphRecord {
        GlyphRecord::new(text, x, y_top, width, 10.0)
    }

    /// Ruled 2x2 grid spanning x 100..300 and top-origin y 100..160, drawn
    /// as one outer rectangle plus a middle horizontal and vertical ruling.
    fn two_by_two_rulings() -> Vec<VectorOp> {
        // PDF space: top-origin y 100 is 700, y 130 is 670, y 160 is 640.
        vec![
            VectorOp::Rectangle(100.0, 640.0, 200.0, 60.0),
            VectorOp::MoveTo(100.0, 670.0),
            VectorOp::LineTo(300.0, 670.0),
            VectorOp::MoveTo(200.0, 640.0),
            VectorOp::LineTo(200.0, 700.0),
        ]
    }

    fn table_page() -> PageContent {
        PageContent {
            page_height: PAGE_HEIGHT,
            glyphs: vec![
                glyph("Total: 10", 100.0, 200.0, 45.0),
                glyph("D", 240.0, 140.0, 6.0),
                glyph("A", 140.0, 110.0, 6.0),
                glyph("C", 140.0, 140.0, 6.0),
                glyph("B", 240.0, 110.0, 6.0),
            ],
            ops: two_by_two_rulings(),
            annotations: vec![],
        }
    }

    #[test]
    fn ruled_table_then_paragraph() {
        let layout = reconstruct_page(&table_page(), &LayoutConfig::default());

        assert_eq!(layout.fragments.len(), 2);
        let table = &layout.fragments[0];
        assert!(table.starts_with("<table"));
        let positions: Vec<usize> = ["A", "B", "C", "D"]
            .iter()
            .map(|t| table.find(&format!(">{t}</td>")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(table.matches("<tr>").count(), 2);
        assert_eq!(layout.fragments[1], "<p>Total: 10</p>");
        assert_eq!(layout.lines, vec!["Total: 10"]);
    }

    #[test]
    fn table_glyphs_never_reach_text_lines() {
        let layout = reconstruct_page(&table_page(), &LayoutConfig::default());

        let table_texts: Vec<&str> = layout
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .flat_map(|t| t.grid.iter().flatten())
            .flat_map(|cell| cell.glyphs.iter().map(|g| g.text.as_str()))
            .collect();
        assert_eq!(table_texts.len(), 4);

        for block in &layout.blocks {
            if let Block::TextLine(line) = block {
                assert!(line
                    .items
                    .iter()
                    .all(|g| !table_texts.contains(&g.text.as_str())));
            }
        }
    }

    #[test]
    fn plain_prose_page() {
        let page = PageContent {
            page_height: PAGE_HEIGHT,
            glyphs: vec![
                glyph("second", 50.0, 120.0, 30.0),
                glyph("first", 50.0, 100.0, 25.0),
            ],
            ops: vec![],
            annotations: vec![],
        };
        let layout = reconstruct_page(&page, &LayoutConfig::default());
        assert_eq!(layout.fragments, vec!["<p>first</p>", "<p>second</p>"]);
    }

    #[test]
    fn single_ruled_box_is_not_a_table() {
        let page = PageContent {
            page_height: PAGE_HEIGHT,
            glyphs: vec![glyph("framed", 120.0, 110.0, 30.0)],
            ops: vec![VectorOp::Rectangle(100.0, 640.0, 200.0, 60.0)],
            annotations: vec![],
        };
        let layout = reconstruct_page(&page, &LayoutConfig::default());
        assert_eq!(layout.fragments, vec!["<p>framed</p>"]);
    }

    #[test]
    fn quarter_fallback_replaces_its_lines() {
        let header_y = 100.0;
        let value_y = 120.0;
        let page = PageContent {
            page_height: PAGE_HEIGHT,
            glyphs: vec![
                glyph("Resumen", 50.0, 80.0, 40.0),
                glyph("1T", 95.0, header_y, 10.0),
                glyph("2T", 155.0, header_y, 10.0),
                glyph("3T", 215.0, header_y, 10.0),
                glyph("4T", 275.0, header_y, 10.0),
                glyph("Total", 350.0, header_y, 20.0),
                glyph("Importe", 20.0, value_y, 35.0),
                glyph("1.234,56", 80.0, value_y, 40.0),
                glyph("2.000,00", 340.0, value_y, 40.0),
                glyph("Fin", 50.0, 160.0, 15.0),
            ],
            ops: vec![],
            annotations: vec![],
        };

        let layout = reconstruct_page(&page, &LayoutConfig::default());
        assert_eq!(layout.fragments.len(), 3);
        assert_eq!(layout.fragments[0], "<p>Resumen</p>");
        assert!(layout.fragments[1].starts_with("<table"));
        assert_eq!(layout.fragments[2], "<p>Fin</p>");

        match &layout.blocks[1] {
            Block::QuarterTable(q) => {
                assert_eq!(q.values, ["1.234,56", "", "", "", "2.000,00"].map(String::from));
            }
            other => panic!("expected quarter table, got {:?}", other),
        }
    }

    #[test]
    fn ruled_table_disables_quarter_fallback() {
        let mut page = table_page();
        page.glyphs.extend([
            glyph("1T", 95.0, 250.0, 10.0),
            glyph("2T", 155.0, 250.0, 10.0),
            glyph("3T", 215.0, 250.0, 10.0),
            glyph("4T", 275.0, 250.0, 10.0),
            glyph("Total", 350.0, 250.0, 20.0),
            glyph("Importe", 20.0, 270.0, 35.0),
            glyph("1,00", 90.0, 270.0, 20.0),
        ]);

        let layout = reconstruct_page(&page, &LayoutConfig::default());
        assert!(layout
            .blocks
            .iter()
            .all(|b| !matches!(b, Block::QuarterTable(_))));
        assert!(layout.fragments[0].starts_with("<table"));
        assert_eq!(
            layout.fragments[1..],
            ["<p>Total: 10</p>", "<p>1T 2T 3T 4T Total</p>", "<p>Importe 1,00</p>"]
        );
    }

    #[test]
    fn annotations_pass_through() {
        let page = PageContent {
            page_height: PAGE_HEIGHT,
            annotations: vec![crate::types::Annotation {
                url: "mailto:info@example.com".to_string(),
                rect: [1.0, 2.0, 3.0, 4.0],
            }],
            ..PageContent::default()
        };
        let layout = reconstruct_page(&page, &LayoutConfig::default());
        assert!(layout.fragments.is_empty());
        assert_eq!(layout.annotations, page.annotations);
    }
}
