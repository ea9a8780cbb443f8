use std::path::{Path, PathBuf};

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

use crate::cli::{ImportImagesArgs, ImportPdfArgs};
use crate::document::Document;
use crate::library::{Library as _, LocalFsLibrary};

pub mod images;
pub mod pdf;

pub use pdf::{PdfRenderer, PdftoppmRenderer};

/// Why ingestion produced no document. On any of these the caller keeps its
/// previous state; a half-populated page sequence is never handed out.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source is corrupt or password-protected: {path}: {detail}")]
    CorruptOrProtected { path: PathBuf, detail: String },
    #[error("no input files were provided")]
    NoInput,
    #[error("unsupported image format: {path}")]
    UnsupportedImage { path: PathBuf },
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("pdf renderer failed: {0}")]
    Renderer(String),
}

pub async fn import_pdf(args: ImportPdfArgs) -> anyhow::Result<()> {
    let path = Path::new(&args.file);
    let title = match args.title {
        Some(title) => title,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("cannot derive a title from: {}", args.file))?,
    };

    let renderer = PdftoppmRenderer::new(&args.pdftoppm);
    let pages = renderer
        .render(path)
        .await
        .with_context(|| format!("rasterize pdf: {}", args.file))?;

    let document = Document::new(title, pages);
    let library = LocalFsLibrary::new(&args.library);
    library.save(&document).await.context("save document")?;

    tracing::info!(id = %document.id, pages = document.page_count(), "imported pdf");
    println!("{}", document.id);
    Ok(())
}

pub async fn import_images(args: ImportImagesArgs) -> anyhow::Result<()> {
    let paths: Vec<PathBuf> = args.files.iter().map(PathBuf::from).collect();
    let pages = images::to_data_urls(&paths).await.context("read images")?;

    let document = Document::new(args.title, pages);
    let library = LocalFsLibrary::new(&args.library);
    library.save(&document).await.context("save document")?;

    tracing::info!(id = %document.id, pages = document.page_count(), "imported images");
    println!("{}", document.id);
    Ok(())
}

/// MIME type for the raster formats the viewer can embed.
pub(crate) fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

pub(crate) fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}
