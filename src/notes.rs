use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

/// Per-page free-text notes for one document, persisted write-through: the
/// in-memory map and the backing file are never out of sync after a `set`.
///
/// Absence of a key means "no note"; an empty string is a distinct "note
/// cleared" state. Malformed or missing persisted data loads as an empty
/// mapping and never blocks viewing.
#[derive(Debug)]
pub struct NoteStore {
    path: PathBuf,
    notes: BTreeMap<usize, String>,
}

impl NoteStore {
    /// Opens the note mapping for the given namespace (document identity),
    /// rehydrating whatever was previously persisted.
    pub fn open(base_dir: impl Into<PathBuf>, namespace: &str) -> Self {
        let path = base_dir.into().join("notes").join(format!("{namespace}.json"));
        let notes = load_notes(&path);
        Self { path, notes }
    }

    pub fn get(&self, page_index: usize) -> Option<&str> {
        self.notes.get(&page_index).map(String::as_str)
    }

    pub fn set(&mut self, page_index: usize, text: impl Into<String>) {
        self.notes.insert(page_index, text.into());
        // Write-through, best effort: a failed write must not unwind the
        // viewer, but the in-memory state already reflects the note.
        if let Err(err) = self.persist() {
            tracing::warn!(path = %self.path.display(), ?err, "failed to persist notes");
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.notes.iter().map(|(idx, text)| (*idx, text.as_str()))
    }

    fn persist(&self) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("note path has no parent: {}", self.path.display()))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create notes dir: {}", parent.display()))?;

        let tmp_path = self
            .path
            .with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
        let data = serde_json::to_vec_pretty(&self.notes).context("serialize notes")?;
        std::fs::write(&tmp_path, &data)
            .with_context(|| format!("write tmp notes: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("rename tmp notes to final: {}", self.path.display()))?;
        Ok(())
    }
}

fn load_notes(path: &Path) -> BTreeMap<usize, String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), ?err, "failed to read notes; starting empty");
            return BTreeMap::new();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(notes) => notes,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "malformed notes file; starting empty");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NoteStore::open(dir.path(), "doc-a");
        store.set(3, "hello");
        assert_eq!(store.get(3), Some("hello"));
        assert_eq!(store.get(4), None);
    }

    #[test]
    fn notes_survive_a_fresh_load() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = NoteStore::open(dir.path(), "doc-a");
            store.set(0, "first page");
            store.set(7, "");
        }
        let store = NoteStore::open(dir.path(), "doc-a");
        assert_eq!(store.get(0), Some("first page"));
        assert_eq!(store.get(7), Some(""));
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn namespaces_do_not_leak_into_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = NoteStore::open(dir.path(), "doc-a");
        a.set(0, "from a");
        let b = NoteStore::open(dir.path(), "doc-b");
        assert_eq!(b.get(0), None);
    }

    #[test]
    fn malformed_persisted_notes_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let notes_dir = dir.path().join("notes");
        std::fs::create_dir_all(&notes_dir).unwrap();
        std::fs::write(notes_dir.join("doc-a.json"), b"{not json").unwrap();

        let store = NoteStore::open(dir.path(), "doc-a");
        assert!(store.is_empty());
    }
}
