use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::document::{document_id_for_path, DocumentId};

/// Everything persisted per document: the two reserved entries plus the
/// user's named bookmarks.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DocumentBookmarks {
    pub last_page: usize,
    pub page_offset: i64,
    #[serde(default)]
    pub bookmarks: BTreeMap<String, usize>,
}

impl DocumentBookmarks {
    /// Adds `id`, or moves it to `page` if it already exists. Returns true
    /// when an existing bookmark was updated.
    pub fn set(&mut self, id: &str, page: usize) -> bool {
        self.bookmarks.insert(id.to_string(), page).is_some()
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.bookmarks.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.bookmarks.remove(id).is_some()
    }
}

pub trait BookmarkStore: Send + Sync {
    fn load(&self, document: &Path) -> Result<Option<DocumentBookmarks>>;
    fn save(&self, document: &Path, bookmarks: &DocumentBookmarks) -> Result<()>;
}

/// One JSON file per document under `root`, named after the document id.
pub struct FileBookmarkStore {
    root: PathBuf,
}

impl FileBookmarkStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create bookmark directory at {:?}", root))?;
        Ok(Self { root })
    }

    fn bookmark_path(&self, id: DocumentId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

impl BookmarkStore for FileBookmarkStore {
    fn load(&self, document: &Path) -> Result<Option<DocumentBookmarks>> {
        let path = self.bookmark_path(document_id_for_path(document));
        if !path.exists() {
            return Ok(None);
        }
        let mut file =
            File::open(&path).with_context(|| format!("failed to open bookmark file {:?}", path))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let bookmarks = serde_json::from_str(&buf)
            .with_context(|| format!("failed to decode bookmark file {:?}", path))?;
        Ok(Some(bookmarks))
    }

    fn save(&self, document: &Path, bookmarks: &DocumentBookmarks) -> Result<()> {
        let path = self.bookmark_path(document_id_for_path(document));
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(bookmarks)?;
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp bookmark file {:?}", tmp))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace bookmark file {:?}", path))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBookmarkStore {
    inner: Mutex<HashMap<DocumentId, DocumentBookmarks>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookmarkStore for MemoryBookmarkStore {
    fn load(&self, document: &Path) -> Result<Option<DocumentBookmarks>> {
        Ok(self
            .inner
            .lock()
            .get(&document_id_for_path(document))
            .cloned())
    }

    fn save(&self, document: &Path, bookmarks: &DocumentBookmarks) -> Result<()> {
        self.inner
            .lock()
            .insert(document_id_for_path(document), bookmarks.clone());
        Ok(())
    }
}
