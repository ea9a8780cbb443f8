use std::path::{Path, PathBuf};

use crate::document::PageImage;
use crate::ingest::{IngestError, data_url, mime_for_extension};

/// Converts ordered image files into inline page images, one per file, in
/// the order given. Zero inputs is an error so the caller never transitions
/// on an empty selection.
pub async fn to_data_urls(paths: &[PathBuf]) -> Result<Vec<PageImage>, IngestError> {
    if paths.is_empty() {
        return Err(IngestError::NoInput);
    }

    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        pages.push(read_one(path).await?);
    }
    Ok(pages)
}

async fn read_one(path: &Path) -> Result<PageImage, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| IngestError::UnsupportedImage {
            path: path.to_path_buf(),
        })?;
    let mime = mime_for_extension(ext).ok_or_else(|| IngestError::UnsupportedImage {
        path: path.to_path_buf(),
    })?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(PageImage(data_url(mime, &bytes)))
}
