use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::DocumentError;

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("3f0c9a4e-6d2b-5b8e-9c71-2a54d8e0b6f3").expect("valid namespace UUID")
});

/// Stable identifier derived from the canonical form of `path`.
pub fn document_id_for_path(path: &Path) -> DocumentId {
    let resolved = path
        .canonicalize()
        .or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                std::env::current_dir().map(|cwd| cwd.join(path))
            }
        })
        .unwrap_or_else(|_| path.to_path_buf());
    let rendered = resolved.to_string_lossy();
    Uuid::new_v5(&DOCUMENT_NAMESPACE, rendered.as_bytes())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub author: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl DocumentMetadata {
    /// Labelled non-empty entries, in display order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("Author", &self.author),
            ("Title", &self.title),
            ("Subject", &self.subject),
            ("Keywords", &self.keywords),
            ("Creator", &self.creator),
            ("Producer", &self.producer),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub path: PathBuf,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned rectangle. In page space the origin is the bottom-left corner
/// of the page; after [`crate::render::remap_rectangle`] it is in canvas
/// pixels with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderImage {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels.get(idx..idx + 4)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Page(usize),
    Uri(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub area: Rectangle,
    pub target: LinkTarget,
}

/// One outline entry in document order; `depth` starts at 1 for top-level
/// entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: String,
    pub page: Option<usize>,
    pub depth: usize,
}

pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn page_size(&self, page: usize) -> Result<PageSize>;
    fn page_label(&self, page: usize) -> Result<Option<String>>;
    /// Rasterizes the unrotated page at `scale` (1.0 = one pixel per point).
    fn rasterize(&self, page: usize, scale: f64) -> Result<RenderImage>;
    fn find_text(&self, page: usize, query: &str) -> Result<Vec<Rectangle>>;
    fn links(&self, page: usize) -> Result<Vec<Link>>;
    fn outline(&self) -> Result<Vec<OutlineEntry>>;
    fn save(&self, path: &Path) -> Result<()>;
    /// Writes embedded images into `dir`, returning how many were written.
    fn export_images(&self, dir: &Path, stem: &str) -> Result<usize>;
    fn export_attachments(&self, dir: &Path) -> Result<usize>;
}

pub trait DocumentProvider: Send + Sync {
    fn open(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Arc<dyn DocumentBackend>, DocumentError>;
}

/// The open document as seen by the session, the renderer and the search
/// worker. Every raw backend call runs under the library lock.
pub struct DocumentHandle {
    backend: Arc<dyn DocumentBackend>,
    library: Mutex<()>,
    password: Option<String>,
}

impl DocumentHandle {
    pub fn new(backend: Arc<dyn DocumentBackend>, password: Option<String>) -> Self {
        Self {
            backend,
            library: Mutex::new(()),
            password,
        }
    }

    pub fn info(&self) -> &DocumentInfo {
        self.backend.info()
    }

    pub fn path(&self) -> &Path {
        &self.backend.info().path
    }

    pub fn page_count(&self) -> usize {
        self.backend.info().page_count
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    fn check_page(&self, page: usize) -> Result<(), DocumentError> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(DocumentError::PageOutOfRange { page, page_count });
        }
        Ok(())
    }

    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        self.check_page(page)?;
        let _library = self.library.lock();
        self.backend.page_size(page)
    }

    pub fn page_label(&self, page: usize) -> Result<Option<String>> {
        self.check_page(page)?;
        let _library = self.library.lock();
        self.backend.page_label(page)
    }

    /// Labels for every page, `None` where the document has none.
    pub fn page_labels(&self) -> Vec<Option<String>> {
        let _library = self.library.lock();
        (0..self.page_count())
            .map(|page| self.backend.page_label(page).ok().flatten())
            .collect()
    }

    #[instrument(skip(self))]
    pub fn rasterize(&self, page: usize, scale: f64) -> Result<RenderImage> {
        self.check_page(page)?;
        let _library = self.library.lock();
        self.backend.rasterize(page, scale)
    }

    pub fn find_text(&self, page: usize, query: &str) -> Result<Vec<Rectangle>> {
        self.check_page(page)?;
        let _library = self.library.lock();
        self.backend.find_text(page, query)
    }

    pub fn links(&self, page: usize) -> Result<Vec<Link>> {
        self.check_page(page)?;
        let _library = self.library.lock();
        self.backend.links(page)
    }

    pub fn outline(&self) -> Result<Vec<OutlineEntry>> {
        let _library = self.library.lock();
        self.backend.outline()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let _library = self.library.lock();
        self.backend.save(path)
    }

    pub fn export_images(&self, dir: &Path, stem: &str) -> Result<usize> {
        let _library = self.library.lock();
        self.backend.export_images(dir, stem)
    }

    pub fn export_attachments(&self, dir: &Path) -> Result<usize> {
        let _library = self.library.lock();
        self.backend.export_attachments(dir)
    }
}
