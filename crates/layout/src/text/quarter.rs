//! Borderless quarter table heuristic.
//!
//! Some statements print a quarterly breakdown without any rulings:
//!
//! ```text
//!            1T        2T        3T        4T       Total
//! Importe    1.234,56            800,00    12,00    2.046,56
//! ```
//!
//! When a quarter has no value the column is simply blank, so the numbers
//! cannot be mapped by position in the line. Each number is instead placed
//! under the header label whose horizontal midpoint is nearest.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::cleanup::normalize_glyph_text;
use super::lines::build_line_text;
use crate::config::{LayoutConfig, QuarterTableConfig};
use crate::types::{GlyphRecord, QuarterTable, TextLine, QUARTER_COLUMNS};

/// A recognized header/value line pair and the table built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterMatch {
    /// Index of the header line in the input sequence.
    pub header_line: usize,
    /// Index of the value line in the input sequence.
    pub value_line: usize,
    pub table: QuarterTable,
}

/// The normalized text of one glyph and its horizontal midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub mid_x: f32,
}

/// Below this many resolved header labels a column position cannot be
/// trusted.
const MIN_ANCHORS: usize = 2;

/// Return `true` for numbers written with `.` grouping and `,` decimals,
/// e.g. `1.234,56`, `-800,00` or `12`.
pub fn is_numeric_literal(text: &str) -> bool {
    static RE_NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = RE_NUMBER
        .get_or_init(|| Regex::new(r"^-?(?:\d{1,3}(?:\.\d{3})+|\d+)(?:,\d+)?$").unwrap());
    re.is_match(text.trim())
}

/// Find the first quarter table in `lines`.
///
/// Only the first header followed by a matching value line is used.
pub fn detect_quarter_table(lines: &[TextLine], config: &LayoutConfig) -> Option<QuarterMatch> {
    let quarter = &config.quarter;
    let header_re = header_pattern(quarter)?;
    let texts: Vec<String> = lines
        .iter()
        .map(|l| build_line_text(&l.items, config.line_gap))
        .collect();

    for (i, text) in texts.iter().enumerate() {
        if !header_re.is_match(text) {
            continue;
        }

        let anchors = resolve_anchors(&lines[i].items, quarter);
        let resolved = anchors.iter().filter(|a| a.is_some()).count();
        if resolved < quarter.min_anchors.max(MIN_ANCHORS) {
            debug!("quarter header at y={} has only {resolved} anchor(s)", lines[i].y);
            continue;
        }

        let Some(j) = (i + 1..lines.len()).find(|&j| !texts[j].is_empty()) else {
            continue;
        };
        let Some(label) = leading_label(&texts[j], &quarter.value_label) else {
            continue;
        };

        let numbers: Vec<Token> = tokens(&lines[j].items)
            .into_iter()
            .filter(|t| is_numeric_literal(&t.text))
            .collect();
        if numbers.is_empty() {
            continue;
        }

        debug!(
            "quarter table: header y={}, {} value(s), {resolved} anchor(s)",
            lines[i].y,
            numbers.len()
        );
        return Some(QuarterMatch {
            header_line: i,
            value_line: j,
            table: QuarterTable {
                y: lines[i].y,
                headers: quarter.headers.clone(),
                label,
                values: assign_to_columns(&anchors, &numbers),
            },
        });
    }

    None
}

/// Place each value under the nearest resolved anchor.
///
/// Columns without an anchor are never chosen and columns that receive no
/// value stay empty. When two values land in the same column the first one
/// (leftmost) is kept.
pub fn assign_to_columns(
    anchors: &[Option<f32>; QUARTER_COLUMNS],
    values: &[Token],
) -> [String; QUARTER_COLUMNS] {
    let mut out: [String; QUARTER_COLUMNS] = Default::default();

    for value in values {
        let nearest = anchors
            .iter()
            .enumerate()
            .filter_map(|(col, a)| a.map(|x| (col, (x - value.mid_x).abs())))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(col, _)| col);

        match nearest {
            Some(col) if out[col].is_empty() => out[col] = value.text.clone(),
            Some(col) => debug!("dropping {} for already filled column {col}", value.text),
            None => {}
        }
    }

    out
}

/// One token per glyph, left to right: its trimmed, normalized text at the
/// glyph's own midpoint. A glyph holding several words stays one token, so
/// no position is ever guessed from inside a run.
pub fn tokens(glyphs: &[GlyphRecord]) -> Vec<Token> {
    let mut out: Vec<Token> = glyphs
        .iter()
        .map(|glyph| Token {
            text: normalize_glyph_text(&glyph.text).trim().to_string(),
            mid_x: glyph.mid_x(),
        })
        .filter(|t| !t.text.is_empty())
        .collect();
    out.sort_by(|a, b| a.mid_x.partial_cmp(&b.mid_x).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Midpoint of each header label that has a glyph of its own.
fn resolve_anchors(
    glyphs: &[GlyphRecord],
    quarter: &QuarterTableConfig,
) -> [Option<f32>; QUARTER_COLUMNS] {
    let toks = tokens(glyphs);
    let mut used = vec![false; toks.len()];
    let mut anchors = [None; QUARTER_COLUMNS];

    for (col, label) in quarter.headers.iter().enumerate() {
        let hit = toks
            .iter()
            .enumerate()
            .find(|(k, t)| !used[*k] && t.text.eq_ignore_ascii_case(label));
        if let Some((k, t)) = hit {
            used[k] = true;
            anchors[col] = Some(t.mid_x);
        }
    }
    anchors
}

/// Ordered match of all five header labels as whole words.
fn header_pattern(quarter: &QuarterTableConfig) -> Option<Regex> {
    let body = quarter
        .headers
        .iter()
        .map(|h| format!(r"\b{}\b", regex::escape(h)))
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i){body}")).ok()
}

/// The value line's label as printed, if the line opens with it.
fn leading_label(text: &str, label: &str) -> Option<String> {
    let n = label.chars().count();
    let head: String = text.chars().take(n).collect();
    if !head.eq_ignore_ascii_case(label) && head.to_lowercase() != label.to_lowercase() {
        return None;
    }
    match text.chars().nth(n) {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(head),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centred(text: &str, mid_x: f32, y: f32) -> GlyphRecord {
        GlyphRecord::new(text, mid_x - 10.0, y, 20.0, 8.0)
    }

    fn header_line(mids: [f32; 5], y: f32) -> TextLine {
        let labels = ["1T", "2T", "3T", "4T", "Total"];
        TextLine {
            y,
            items: labels
                .iter()
                .zip(mids)
                .map(|(l, m)| centred(l, m, y))
                .collect(),
        }
    }

    fn value_line(label: &str, values: &[(&str, f32)], y: f32) -> TextLine {
        let mut items = vec![GlyphRecord::new(label, 10.0, y, 40.0, 8.0)];
        items.extend(values.iter().map(|(v, m)| centred(v, *m, y)));
        TextLine { y, items }
    }

    const MIDS: [f32; 5] = [100.0, 160.0, 220.0, 280.0, 360.0];

    // -- is_numeric_literal ------------------------------------------------

    #[test]
    fn numeric_literal_accepts_localized_numbers() {
        for s in ["1.234,56", "2.000,00", "-800,00", "12", "0,5", "1.000.000"] {
            assert!(is_numeric_literal(s), "{s}");
        }
    }

    #[test]
    fn numeric_literal_rejects_other_text() {
        for s in ["1,234.56", "12.34", "abc", "", "-", "1.23,4,5", "Total"] {
            assert!(!is_numeric_literal(s), "{s}");
        }
    }

    // -- assign_to_columns ---------------------------------------------------

    #[test]
    fn missing_quarter_does_not_shift_columns() {
        let anchors = MIDS.map(Some);
        let values: Vec<Token> = [100.0, 220.0, 280.0, 360.0]
            .iter()
            .map(|&m| Token {
                text: format!("v@{m}"),
                mid_x: m,
            })
            .collect();
        let out = assign_to_columns(&anchors, &values);
        assert_eq!(out, ["v@100", "", "v@220", "v@280", "v@360"]);
    }

    #[test]
    fn unresolved_columns_are_never_chosen() {
        let anchors = [Some(100.0), None, None, None, Some(360.0)];
        let values = vec![Token {
            text: "5".to_string(),
            mid_x: 170.0,
        }];
        let out = assign_to_columns(&anchors, &values);
        assert_eq!(out, ["5", "", "", "", ""]);
    }

    #[test]
    fn collision_keeps_first_value() {
        let anchors = MIDS.map(Some);
        let values = vec![
            Token {
                text: "a".to_string(),
                mid_x: 95.0,
            },
            Token {
                text: "b".to_string(),
                mid_x: 105.0,
            },
        ];
        let out = assign_to_columns(&anchors, &values);
        assert_eq!(out[0], "a");
        assert!(out[1..].iter().all(String::is_empty));
    }

    // -- tokens ---------------------------------------------------------------

    #[test]
    fn tokens_keep_multi_word_glyphs_whole() {
        let toks = tokens(&[
            GlyphRecord::new(" 2T ", 60.0, 0.0, 20.0, 8.0),
            GlyphRecord::new("ab cd", 0.0, 0.0, 50.0, 8.0),
            GlyphRecord::new("   ", 90.0, 0.0, 10.0, 8.0),
        ]);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].text, "ab cd");
        assert!((toks[0].mid_x - 25.0).abs() < 1e-4);
        assert_eq!(toks[1].text, "2T");
        assert!((toks[1].mid_x - 70.0).abs() < 1e-4);
    }

    // -- detect_quarter_table --------------------------------------------------

    #[test]
    fn detects_table_with_all_anchors() {
        let lines = vec![
            header_line(MIDS, 100.0),
            value_line("Importe", &[("1.234,56", 100.0), ("2.000,00", 360.0)], 120.0),
        ];
        let m = detect_quarter_table(&lines, &LayoutConfig::default()).unwrap();
        assert_eq!((m.header_line, m.value_line), (0, 1));
        assert_eq!(m.table.values, ["1.234,56", "", "", "", "2.000,00"]);
        assert_eq!(m.table.label, "Importe");
        assert_eq!(m.table.y, 100.0);
        assert_eq!(m.table.headers[4], "Total");
    }

    #[test]
    fn value_label_is_case_insensitive_and_blank_lines_are_skipped() {
        let lines = vec![
            header_line(MIDS, 100.0),
            TextLine {
                y: 110.0,
                items: vec![GlyphRecord::new("  ", 10.0, 110.0, 5.0, 8.0)],
            },
            value_line("IMPORTE:", &[("-12,00", 220.0)], 120.0),
        ];
        let m = detect_quarter_table(&lines, &LayoutConfig::default()).unwrap();
        assert_eq!(m.value_line, 2);
        assert_eq!(m.table.values, ["", "", "-12,00", "", ""]);
        assert_eq!(m.table.label, "IMPORTE");
    }

    #[test]
    fn requires_two_resolvable_anchors() {
        // The whole header is a single run, so no label has its own glyph.
        let lines = vec![
            TextLine {
                y: 100.0,
                items: vec![GlyphRecord::new("1T 2T 3T 4T Total", 50.0, 100.0, 320.0, 8.0)],
            },
            value_line("Importe", &[("5,00", 360.0)], 120.0),
        ];
        assert!(detect_quarter_table(&lines, &LayoutConfig::default()).is_none());

        // One label glyph next to a run holding the rest is still too few.
        let lines = vec![
            TextLine {
                y: 100.0,
                items: vec![
                    GlyphRecord::new("1T 2T 3T 4T", 50.0, 100.0, 250.0, 8.0),
                    centred("Total", 360.0, 100.0),
                ],
            },
            value_line("Importe", &[("10,00", 360.0)], 120.0),
        ];
        assert!(detect_quarter_table(&lines, &LayoutConfig::default()).is_none());
    }

    #[test]
    fn min_anchors_below_two_is_raised() {
        let mut config = LayoutConfig::default();
        config.quarter.min_anchors = 0;
        let lines = vec![
            TextLine {
                y: 100.0,
                items: vec![
                    GlyphRecord::new("1T 2T 3T 4T", 50.0, 100.0, 250.0, 8.0),
                    centred("Total", 360.0, 100.0),
                ],
            },
            value_line("Importe", &[("10,00", 360.0)], 120.0),
        ];
        assert!(detect_quarter_table(&lines, &config).is_none());

        config.quarter.min_anchors = 1;
        assert!(detect_quarter_table(&lines, &config).is_none());
    }

    #[test]
    fn value_line_must_open_with_label() {
        let lines = vec![
            header_line(MIDS, 100.0),
            value_line("Importes", &[("10,00", 100.0)], 120.0),
        ];
        assert!(detect_quarter_table(&lines, &LayoutConfig::default()).is_none());

        let lines = vec![
            header_line(MIDS, 100.0),
            value_line("Saldo", &[("10,00", 100.0)], 120.0),
        ];
        assert!(detect_quarter_table(&lines, &LayoutConfig::default()).is_none());
    }

    #[test]
    fn value_line_needs_a_number() {
        let lines = vec![
            header_line(MIDS, 100.0),
            value_line("Importe", &[("n/a", 100.0)], 120.0),
        ];
        assert!(detect_quarter_table(&lines, &LayoutConfig::default()).is_none());
    }

    #[test]
    fn header_labels_must_be_in_order() {
        let mut header = header_line(MIDS, 100.0);
        header.items.swap(0, 4);
        header.items[0].x = 90.0;
        header.items[4].x = 350.0;
        let lines = vec![header, value_line("Importe", &[("1,00", 100.0)], 120.0)];
        assert!(detect_quarter_table(&lines, &LayoutConfig::default()).is_none());
    }
}
