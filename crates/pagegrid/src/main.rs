use crate::prelude::*;
use clap::Parser;

mod commands;
mod error;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Rebuild paragraphs and ruled tables from PDF pages"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file with layout tolerances and quarter-table labels
    #[clap(long, env = "PAGEGRID_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommands {
    /// Print the HTML fragments of every page
    Render {
        /// Path to the PDF file
        path: std::path::PathBuf,
    },
    /// Print the detected blocks as JSON
    Blocks {
        /// Path to the PDF file
        path: std::path::PathBuf,
        /// Only this page (1-based)
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Print the assembled text lines outside ruled tables
    Lines {
        /// Path to the PDF file
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Render { path } => commands::render(path, app.global).await,
        SubCommands::Blocks { path, page } => commands::blocks(path, page, app.global).await,
        SubCommands::Lines { path } => commands::lines(path, app.global).await,
    }
}
