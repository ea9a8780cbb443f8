use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::cli::{LibraryDeleteArgs, LibraryListArgs};
use crate::document::Document;

pub async fn run_list(args: LibraryListArgs) -> anyhow::Result<()> {
    let library = LocalFsLibrary::new(&args.library);
    for document in library.list_all().await? {
        println!(
            "{}\t{}\t{} pages\t{}",
            document.id,
            document.title,
            document.page_count(),
            document.created_at.to_rfc3339(),
        );
    }
    Ok(())
}

pub async fn run_delete(args: LibraryDeleteArgs) -> anyhow::Result<()> {
    let library = LocalFsLibrary::new(&args.library);
    if !library.delete(args.id).await? {
        anyhow::bail!("no such document: {}", args.id);
    }
    tracing::info!(id = %args.id, "deleted document");
    Ok(())
}

/// Persistent collection of saved documents. Saving is always an explicit
/// caller action; nothing in the viewer writes here.
#[async_trait]
pub trait Library: Send + Sync {
    async fn save(&self, document: &Document) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Document>>;
    /// All saved documents, most recently created first.
    async fn list_all(&self) -> anyhow::Result<Vec<Document>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Library over local JSON files, one directory per document.
#[derive(Debug, Clone)]
pub struct LocalFsLibrary {
    base_dir: PathBuf,
}

impl LocalFsLibrary {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn documents_dir(&self) -> PathBuf {
        self.base_dir.join("documents")
    }

    fn document_dir(&self, id: Uuid) -> PathBuf {
        self.documents_dir().join(id.to_string())
    }

    fn document_json_path(&self, id: Uuid) -> PathBuf {
        self.document_dir(id).join("document.json")
    }
}

#[async_trait]
impl Library for LocalFsLibrary {
    async fn save(&self, document: &Document) -> anyhow::Result<()> {
        write_json_atomic(&self.document_json_path(document.id), document)
            .await
            .context("write document.json")?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Document>> {
        let path = self.document_json_path(id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Document>> {
        let dir = self.documents_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read library dir: {}", dir.display()));
            }
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("read library dir: {}", dir.display()))?
        {
            let path = entry.path().join("document.json");
            // A corrupt entry is skipped, not fatal: the rest of the library
            // stays listable.
            match read_json::<Document>(&path).await {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), err = format!("{err:#}"), "skipping unreadable library entry");
                }
            }
        }

        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let dir = self.document_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("delete library entry: {}", dir.display())),
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
