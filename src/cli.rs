use clap::{Args, Parser, Subcommand};

use crate::insights::AnalyzerEngine;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    Analyze(AnalyzeArgs),
    Export(ExportArgs),
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ImportCommand {
    Pdf(ImportPdfArgs),
    Images(ImportImagesArgs),
}

#[derive(Debug, Subcommand)]
pub enum LibraryCommand {
    List(LibraryListArgs),
    Delete(LibraryDeleteArgs),
}

#[derive(Debug, Args)]
pub struct ImportPdfArgs {
    /// PDF file to rasterize into pages.
    #[arg(long)]
    pub file: String,

    /// Document title (default: the file name).
    #[arg(long)]
    pub title: Option<String>,

    /// Path to the `pdftoppm` binary.
    #[arg(long, default_value = "pdftoppm")]
    pub pdftoppm: String,

    /// Library data directory.
    #[arg(long, default_value = "flipfolio-data")]
    pub library: String,
}

#[derive(Debug, Args)]
pub struct ImportImagesArgs {
    /// Document title.
    #[arg(long)]
    pub title: String,

    /// Library data directory.
    #[arg(long, default_value = "flipfolio-data")]
    pub library: String,

    /// Image files, in page order.
    #[arg(required = true)]
    pub files: Vec<String>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Document id (from `import` or `library list`).
    #[arg(long)]
    pub id: uuid::Uuid,

    /// Analysis engine.
    #[arg(long, value_enum, default_value_t = AnalyzerEngine::Noop)]
    pub engine: AnalyzerEngine,

    /// OpenAI-compatible API base URL.
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Model name.
    #[arg(long, default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Sampling temperature.
    #[arg(long, default_value_t = 0.2)]
    pub temperature: f32,

    /// Library data directory.
    #[arg(long, default_value = "flipfolio-data")]
    pub library: String,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Document id (from `import` or `library list`).
    #[arg(long)]
    pub id: uuid::Uuid,

    /// Output file path (default: derived from the document title).
    #[arg(long)]
    pub out: Option<String>,

    /// Overwrite the output file if it exists.
    #[arg(long)]
    pub force: bool,

    /// Library data directory.
    #[arg(long, default_value = "flipfolio-data")]
    pub library: String,
}

#[derive(Debug, Args)]
pub struct LibraryListArgs {
    /// Library data directory.
    #[arg(long, default_value = "flipfolio-data")]
    pub library: String,
}

#[derive(Debug, Args)]
pub struct LibraryDeleteArgs {
    /// Document id to delete.
    #[arg(long)]
    pub id: uuid::Uuid,

    /// Library data directory.
    #[arg(long, default_value = "flipfolio-data")]
    pub library: String,
}
