use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

pub mod config;
pub mod geometry;
pub mod page;
pub mod parser;
pub mod render;
pub mod table;
pub mod text;
pub mod types;

pub use config::*;
pub use page::reconstruct_page;
pub use types::*;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("PDF decoding error: {0}")]
    Decode(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page not found: {0}")]
    PageNotFound(u32),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A PDF whose pages have all been run through the layout pipeline.
///
/// Pages are decoded and reconstructed strictly in page order; each page is
/// finished before the next one is read.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pages: Vec<PageLayout>,
}

impl ParsedDocument {
    pub fn from_bytes(bytes: &[u8], config: &LayoutConfig) -> Result<Self, LayoutError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        Self::from_backend(&backend, config)
    }

    /// Reconstruct every page served by `backend`.
    pub fn from_backend(
        backend: &dyn PdfBackend,
        config: &LayoutConfig,
    ) -> Result<Self, LayoutError> {
        let mut pages = Vec::new();
        for (&number, &page_id) in &backend.pages() {
            let content = parser::content::extract_page_content(backend, page_id)?;
            let layout = reconstruct_page(&content, config);
            log::debug!("page {number}: {} fragment(s)", layout.fragments.len());
            pages.push(layout);
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[PageLayout] {
        &self.pages
    }

    /// A single page by its 1-based number.
    pub fn page(&self, number: u32) -> Result<&PageLayout, LayoutError> {
        number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx as usize))
            .ok_or(LayoutError::PageNotFound(number))
    }

    /// Every page's fragments in order, with no page-break markers.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|page| page.fragments.iter().map(String::as_str))
    }

    /// Assembled text of every non-table line, page after page.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|page| page.lines.iter().map(String::as_str))
    }

    /// All fragments joined by newlines.
    pub fn render_html(&self) -> String {
        self.fragments().collect::<Vec<_>>().join("\n")
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Render a PDF to HTML with the default configuration.
pub fn render(bytes: &[u8]) -> Result<String, LayoutError> {
    Ok(ParsedDocument::from_bytes(bytes, &LayoutConfig::default())?.render_html())
}

/// Number of pages without running the layout pipeline.
pub fn page_count(bytes: &[u8]) -> Result<usize, LayoutError> {
    Ok(LopdfBackend::load_bytes(bytes)?.page_count())
}
