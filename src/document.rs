use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single rasterized page, carried as a `data:` URL so the document is
/// self-describing and the export artifact can embed it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageImage(pub String);

impl PageImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An image reference the viewer/exporter cannot show. The page still
    /// occupies its slot so numbering never shifts.
    pub fn is_usable(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

/// One ingested collection of ordered pages plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: uuid::Uuid,
    pub title: String,
    pub pages: Vec<PageImage>,
    pub created_at: DateTime<Utc>,
    pub summary: Option<String>,
}

impl Document {
    pub fn new(title: impl Into<String>, pages: Vec<PageImage>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            title: title.into(),
            pages,
            created_at: Utc::now(),
            summary: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Replaces one page in place. This is the only mutation the page
    /// sequence supports; pages are never reordered or renumbered.
    pub fn replace_page(&mut self, index: usize, image: PageImage) -> anyhow::Result<()> {
        let total = self.pages.len();
        let slot = self
            .pages
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("page index {index} out of range (total {total})"))?;
        *slot = image;
        Ok(())
    }
}

/// Filename for the export artifact: the title with any trailing
/// extension-like suffix stripped, plus `.html`.
pub fn artifact_filename(title: &str) -> String {
    let stem = strip_extension_suffix(title.trim());
    if stem.is_empty() {
        return "flipbook.html".to_string();
    }
    format!("{stem}.html")
}

fn strip_extension_suffix(title: &str) -> &str {
    let Some(dot) = title.rfind('.') else {
        return title;
    };
    // Only a *trailing* extension-like run counts: non-empty, with no
    // further separators after the dot.
    let suffix = &title[dot + 1..];
    if suffix.is_empty() || suffix.contains('/') || suffix.contains('.') {
        return title;
    }
    &title[..dot]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_filename_strips_trailing_extension() {
        assert_eq!(artifact_filename("report.pdf"), "report.html");
        assert_eq!(artifact_filename("summer album"), "summer album.html");
        assert_eq!(artifact_filename("archive.tar.gz"), "archive.tar.html");
    }

    #[test]
    fn artifact_filename_defaults_when_title_is_empty() {
        assert_eq!(artifact_filename(""), "flipbook.html");
        assert_eq!(artifact_filename("   "), "flipbook.html");
    }

    #[test]
    fn artifact_filename_treats_dotfile_titles_as_empty() {
        assert_eq!(artifact_filename(".hidden"), "flipbook.html");
    }

    #[test]
    fn replace_page_swaps_one_slot_only() {
        let mut doc = Document::new(
            "t",
            vec![
                PageImage("data:image/png;base64,a".into()),
                PageImage("data:image/png;base64,b".into()),
            ],
        );
        doc.replace_page(1, PageImage("data:image/png;base64,c".into()))
            .unwrap();
        assert_eq!(doc.pages[0].as_str(), "data:image/png;base64,a");
        assert_eq!(doc.pages[1].as_str(), "data:image/png;base64,c");
    }

    #[test]
    fn replace_page_rejects_out_of_range_index() {
        let mut doc = Document::new("t", vec![PageImage("data:x".into())]);
        let err = doc
            .replace_page(3, PageImage("data:y".into()))
            .unwrap_err()
            .to_string();
        assert!(err.contains("out of range"));
    }
}
