use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::document::PageImage;
use crate::ingest::{IngestError, data_url};

/// Raster resolution for PDF pages, chosen once per document.
const RASTER_DPI: u32 = 150;

/// PDF rasterization as a black box: a file in, ordered page images out.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, path: &Path) -> Result<Vec<PageImage>, IngestError>;
}

/// Default renderer shelling out to poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    pdftoppm: String,
}

impl PdftoppmRenderer {
    pub fn new(pdftoppm: impl Into<String>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
        }
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

#[async_trait]
impl PdfRenderer for PdftoppmRenderer {
    async fn render(&self, path: &Path) -> Result<Vec<PageImage>, IngestError> {
        let work_dir = tempfile::tempdir()
            .map_err(|err| IngestError::Renderer(format!("create raster dir: {err}")))?;
        let prefix = work_dir.path().join("page");

        tracing::info!(pdf = %path.display(), dpi = RASTER_DPI, "rasterizing pdf");
        let output = Command::new(&self.pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg(RASTER_DPI.to_string())
            .arg(path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => {
                    IngestError::Renderer(format!("{} not found on PATH", self.pdftoppm))
                }
                _ => IngestError::Renderer(format!("run {}: {err}", self.pdftoppm)),
            })?;

        if !output.status.success() {
            // pdftoppm exits non-zero for unparseable and password-protected
            // inputs alike.
            return Err(IngestError::CorruptOrProtected {
                path: path.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let rasters = collect_rasters(work_dir.path()).await?;
        if rasters.is_empty() {
            return Err(IngestError::CorruptOrProtected {
                path: path.to_path_buf(),
                detail: "renderer produced no pages".to_string(),
            });
        }

        let mut pages = Vec::with_capacity(rasters.len());
        for raster in rasters {
            let bytes = tokio::fs::read(&raster)
                .await
                .map_err(|source| IngestError::Io {
                    path: raster.clone(),
                    source,
                })?;
            pages.push(PageImage(data_url("image/png", &bytes)));
        }
        Ok(pages)
    }
}

/// `pdftoppm` names outputs `page-1.png`, `page-2.png`, ... zero-padded to a
/// uniform width. Order by the parsed page number, not lexicographically.
async fn collect_rasters(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut numbered = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        })?
    {
        let path = entry.path();
        if let Some(number) = raster_page_number(&path) {
            numbered.push((number, path));
        }
    }
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

fn raster_page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("page-")?;
    digits.parse().ok()
}
