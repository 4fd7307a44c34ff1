use std::path::{Path, PathBuf};

use layout::{Block, LayoutConfig, ParsedDocument};

use crate::prelude::{println, *};
use crate::Global;

#[derive(Debug, serde::Serialize)]
struct PageBlocks<'a> {
    page: u32,
    blocks: &'a [Block],
}

pub async fn render(path: PathBuf, global: Global) -> Result<()> {
    let doc = load(&path, &global).await?;
    for fragment in doc.fragments() {
        println!("{fragment}");
    }
    Ok(())
}

pub async fn blocks(path: PathBuf, page: Option<u32>, global: Global) -> Result<()> {
    let doc = load(&path, &global).await?;

    let selected: Vec<PageBlocks> = match page {
        Some(number) => {
            let layout = doc.page(number).map_err(|_| Error::PageOutOfRange {
                page: number,
                count: doc.pages().len(),
            })?;
            vec![PageBlocks {
                page: number,
                blocks: &layout.blocks,
            }]
        }
        None => doc
            .pages()
            .iter()
            .zip(1..)
            .map(|(layout, number)| PageBlocks {
                page: number,
                blocks: &layout.blocks,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&selected)?);
    Ok(())
}

pub async fn lines(path: PathBuf, global: Global) -> Result<()> {
    let doc = load(&path, &global).await?;
    for line in doc.lines() {
        println!("{line}");
    }
    Ok(())
}

fn load_config(global: &Global) -> Result<LayoutConfig> {
    match &global.config {
        Some(path) => {
            log::debug!("loading layout config from {}", path.display());
            LayoutConfig::load(path).context(format!("Failed to load config {}", path.display()))
        }
        None => Ok(LayoutConfig::default()),
    }
}

/// Read the file and run the layout pipeline off the async runtime.
async fn load(path: &Path, global: &Global) -> Result<ParsedDocument> {
    let config = load_config(global)?;
    let bytes = tokio::fs::read(path)
        .await
        .context(format!("Failed to read {}", path.display()))?;

    tokio::task::spawn_blocking(move || ParsedDocument::from_bytes(&bytes, &config))
        .await
        .map_err(|e| Error::Task(e.to_string()))?
        .map_err(|e| eyre!(e))
}
