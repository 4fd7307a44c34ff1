#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Page {page} is out of range, the document has {count} page(s)")]
    PageOutOfRange { page: u32, count: usize },

    #[error("Layout task failed: {0}")]
    Task(String),
}
