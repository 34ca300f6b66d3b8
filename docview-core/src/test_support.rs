use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::document::{
    document_id_for_path, DocumentBackend, DocumentInfo, DocumentMetadata, DocumentProvider, Link,
    OutlineEntry, PageSize, Rectangle, RenderImage,
};
use crate::error::DocumentError;
use crate::launcher::{PrintJob, ProcessLauncher};

#[derive(Clone)]
pub struct FakeBackend {
    info: DocumentInfo,
    size: PageSize,
    fill: [u8; 4],
    labels: Vec<String>,
    matches: HashMap<usize, Vec<Rectangle>>,
    links: HashMap<usize, Vec<Link>>,
    outline: Vec<OutlineEntry>,
    delay: Duration,
    pub scanned: Arc<Mutex<Vec<(String, usize)>>>,
    pub saved: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeBackend {
    pub fn new(path: impl Into<PathBuf>, page_count: usize) -> Self {
        let path = path.into();
        Self {
            info: DocumentInfo {
                id: document_id_for_path(&path),
                path,
                page_count,
                metadata: DocumentMetadata {
                    author: Some("Jane Doe".into()),
                    title: Some("Fake".into()),
                    ..DocumentMetadata::default()
                },
            },
            size: PageSize {
                width: 100.0,
                height: 200.0,
            },
            fill: [255, 255, 255, 255],
            labels: Vec::new(),
            matches: HashMap::new(),
            links: HashMap::new(),
            outline: Vec::new(),
            delay: Duration::ZERO,
            scanned: Arc::new(Mutex::new(Vec::new())),
            saved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = PageSize { width, height };
        self
    }

    pub fn with_fill(mut self, rgba: [u8; 4]) -> Self {
        self.fill = rgba;
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_match(mut self, page: usize, rect: Rectangle) -> Self {
        self.matches.entry(page).or_default().push(rect);
        self
    }

    pub fn with_links(mut self, page: usize, links: Vec<Link>) -> Self {
        self.links.insert(page, links);
        self
    }

    pub fn with_outline(mut self, outline: Vec<OutlineEntry>) -> Self {
        self.outline = outline;
        self
    }

    /// Makes every text query sleep for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl DocumentBackend for FakeBackend {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_size(&self, _page: usize) -> Result<PageSize> {
        Ok(self.size)
    }

    fn page_label(&self, page: usize) -> Result<Option<String>> {
        Ok(self.labels.get(page).cloned())
    }

    fn rasterize(&self, _page: usize, scale: f64) -> Result<RenderImage> {
        let width = (self.size.width * scale) as u32;
        let height = (self.size.height * scale) as u32;
        Ok(RenderImage::filled(width, height, self.fill))
    }

    fn find_text(&self, page: usize, query: &str) -> Result<Vec<Rectangle>> {
        self.scanned.lock().push((query.to_string(), page));
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(self.matches.get(&page).cloned().unwrap_or_default())
    }

    fn links(&self, page: usize) -> Result<Vec<Link>> {
        Ok(self.links.get(&page).cloned().unwrap_or_default())
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        Ok(self.outline.clone())
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.saved.lock().push(path.to_path_buf());
        Ok(())
    }

    fn export_images(&self, _dir: &Path, _stem: &str) -> Result<usize> {
        Ok(0)
    }

    fn export_attachments(&self, _dir: &Path) -> Result<usize> {
        Err(anyhow!("no attachments"))
    }
}

#[derive(Default)]
pub struct FakeProvider {
    documents: Mutex<HashMap<PathBuf, FakeBackend>>,
    password: Option<String>,
    pub opened: Mutex<usize>,
}

impl FakeProvider {
    pub fn with(backend: FakeBackend) -> Self {
        let provider = Self::default();
        provider.add(backend);
        provider
    }

    pub fn add(&self, backend: FakeBackend) {
        self.documents
            .lock()
            .insert(backend.info.path.clone(), backend);
    }

    pub fn require_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }
}

impl DocumentProvider for FakeProvider {
    fn open(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Arc<dyn DocumentBackend>, DocumentError> {
        let backend = self
            .documents
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(path.to_path_buf()))?;
        if let Some(expected) = &self.password {
            if password != Some(expected.as_str()) {
                return Err(DocumentError::BadPassword(path.to_path_buf()));
            }
        }
        *self.opened.lock() += 1;
        Ok(Arc::new(backend))
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    pub uris: Mutex<Vec<String>>,
    pub jobs: Mutex<Vec<PrintJob>>,
    pub printers: Vec<String>,
}

impl ProcessLauncher for RecordingLauncher {
    fn open_uri(&self, uri: &str) -> Result<()> {
        self.uris.lock().push(uri.to_string());
        Ok(())
    }

    fn print(&self, job: &PrintJob) -> Result<()> {
        self.jobs.lock().push(job.clone());
        Ok(())
    }

    fn list_printers(&self) -> Result<Vec<String>> {
        Ok(self.printers.clone())
    }
}
