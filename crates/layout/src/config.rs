use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::QUARTER_COLUMNS;
use crate::LayoutError;

/// Tuning knobs for the layout reconstruction pipeline.
///
/// All distances are in page units (PDF points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Clustering and containment tolerance. Also classifies segments as
    /// horizontal or vertical and splits glyphs into lines.
    pub eps: f32,
    /// Largest gap tolerated inside a ruling built from several strokes.
    /// Looser than `eps` so dashed borders still count as edges.
    pub edge_eps: f32,
    /// Horizontal gap above which a space is inserted between glyphs.
    pub line_gap: f32,
    /// `closePath` only emits a closing segment longer than this.
    pub close_path_min: f32,
    /// Connected regions with fewer present cells are not tables.
    pub min_table_cells: usize,
    pub quarter: QuarterTableConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            eps: 3.0,
            edge_eps: 6.0,
            line_gap: 1.5,
            close_path_min: 0.5,
            min_table_cells: 2,
            quarter: QuarterTableConfig::default(),
        }
    }
}

impl LayoutConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, LayoutError> {
        toml::from_str(text).map_err(|e| LayoutError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

/// Labels recognized by the borderless quarter-table heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarterTableConfig {
    /// Column labels in reading order: four quarters and the total.
    pub headers: [String; QUARTER_COLUMNS],
    /// Token that must open the value line (case-insensitive).
    pub value_label: String,
    /// Minimum number of header labels that must resolve to their own
    /// glyph. Values below 2 are treated as 2.
    pub min_anchors: usize,
}

impl Default for QuarterTableConfig {
    fn default() -> Self {
        Self {
            headers: [
                "1T".to_string(),
                "2T".to_string(),
                "3T".to_string(),
                "4T".to_string(),
                "Total".to_string(),
            ],
            value_label: "Importe".to_string(),
            min_anchors: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = LayoutConfig::default();
        assert_eq!(cfg.eps, 3.0);
        assert!(cfg.edge_eps > cfg.eps);
        assert_eq!(cfg.line_gap, 1.5);
        assert_eq!(cfg.close_path_min, 0.5);
        assert_eq!(cfg.min_table_cells, 2);
        assert_eq!(cfg.quarter.headers[4], "Total");
        assert_eq!(cfg.quarter.min_anchors, 2);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = LayoutConfig::from_toml(
            r#"
            eps = 2.5

            [quarter]
            value_label = "Base"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.eps, 2.5);
        assert_eq!(cfg.edge_eps, 6.0);
        assert_eq!(cfg.quarter.value_label, "Base");
        assert_eq!(cfg.quarter.headers[0], "1T");
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = LayoutConfig::from_toml("eps = \"wide\"").unwrap_err();
        assert!(matches!(err, LayoutError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = LayoutConfig::load("/nonexistent/pagegrid.toml").unwrap_err();
        assert!(matches!(err, LayoutError::Io(_)));
    }
}
