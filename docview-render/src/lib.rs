use std::env;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use docview_core::{
    document_id_for_path, DocumentBackend, DocumentError, DocumentInfo, DocumentMetadata,
    DocumentProvider, Link, LinkTarget, OutlineEntry, PageSize, Rectangle, RenderImage,
};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument, warn};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIBRARY_ENV: &str = "DOCVIEW_PDFIUM_LIBRARY";

pub struct PdfiumProvider {
    pdfium: Arc<Pdfium>,
}

impl PdfiumProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pdfium: Arc::new(bind_pdfium()?),
        })
    }
}

impl DocumentProvider for PdfiumProvider {
    #[instrument(skip(self, password))]
    fn open(
        &self,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Arc<dyn DocumentBackend>, DocumentError> {
        if !path.exists() {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }
        let absolute = path.canonicalize().map_err(|err| DocumentError::Parse {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        let document = PdfiumDocument::new(Arc::clone(&self.pdfium), absolute, password)?;
        Ok(Arc::new(document))
    }
}

struct PdfiumDocument {
    document: Mutex<Option<PdfDocument<'static>>>,
    info: DocumentInfo,
    path: PathBuf,
    password: Option<String>,
    pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn new(pdfium: Arc<Pdfium>, path: PathBuf, password: Option<&str>) -> Result<Self, DocumentError> {
        let document = load(&pdfium, &path, password)?;
        let info = build_document_info(&document, &path);
        info!(path = %path.display(), pages = info.page_count, "loaded pdf");
        // SAFETY: the document borrows the bindings owned by `pdfium`. Fields drop in
        // declaration order, so `document` is dropped before `pdfium` releases them.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        Ok(Self {
            document: Mutex::new(Some(document)),
            info,
            password: password.map(str::to_string),
            path,
            pdfium,
        })
    }

    fn with_document<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&PdfDocument<'static>) -> Result<R>,
    {
        let mut guard = self.document.lock();
        if guard.is_none() {
            let document = load(&self.pdfium, &self.path, self.password.as_deref())?;
            // SAFETY: see `PdfiumDocument::new`.
            *guard = Some(unsafe {
                mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document)
            });
        }
        let document = guard
            .as_ref()
            .ok_or_else(|| anyhow!("document {:?} is not loaded", self.path))?;
        f(document)
    }

    fn with_page<R, F>(&self, page: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        self.with_document(|document| {
            let index: PdfPageIndex = page
                .try_into()
                .map_err(|_| anyhow!("page {} is out of supported range", page))?;
            let pdf_page = document
                .pages()
                .get(index)
                .with_context(|| format!("page {} out of range", page))?;
            f(&pdf_page)
        })
    }
}

fn load<'a>(pdfium: &'a Pdfium, path: &Path, password: Option<&'a str>) -> Result<PdfDocument<'a>, DocumentError> {
    pdfium
        .load_pdf_from_file(path, password)
        .map_err(|err| match err {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                DocumentError::BadPassword(path.to_path_buf())
            }
            other => DocumentError::Parse {
                path: path.to_path_buf(),
                source: anyhow!("{other}"),
            },
        })
}

impl DocumentBackend for PdfiumDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_size(&self, page: usize) -> Result<PageSize> {
        self.with_page(page, |pdf_page| {
            Ok(PageSize {
                width: f64::from(pdf_page.width().value),
                height: f64::from(pdf_page.height().value),
            })
        })
    }

    fn page_label(&self, page: usize) -> Result<Option<String>> {
        self.with_page(page, |pdf_page| {
            Ok(pdf_page
                .label()
                .map(str::to_string)
                .filter(|label| !label.is_empty()))
        })
    }

    #[instrument(skip(self))]
    fn rasterize(&self, page: usize, scale: f64) -> Result<RenderImage> {
        self.with_page(page, |pdf_page| {
            let config = PdfRenderConfig::new().scale_page_by_factor(scale.max(0.01) as f32);
            let bitmap = pdf_page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", page))?;
            let image = bitmap.as_image().to_rgba8();
            Ok(RenderImage {
                width: image.width(),
                height: image.height(),
                pixels: image.into_raw(),
            })
        })
    }

    fn find_text(&self, page: usize, query: &str) -> Result<Vec<Rectangle>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.with_page(page, |pdf_page| {
            let text = pdf_page
                .text()
                .with_context(|| format!("failed to extract text for page {}", page))?;
            let search = text
                .search(query, &PdfSearchOptions::new())
                .with_context(|| format!("failed to search page {}", page))?;
            let mut regions = Vec::new();
            while let Some(segments) = search.find_next() {
                regions.extend(segments.iter().map(|segment| to_rectangle(&segment.bounds())));
            }
            Ok(regions)
        })
    }

    fn links(&self, page: usize) -> Result<Vec<Link>> {
        self.with_page(page, |pdf_page| {
            let mut links = Vec::new();
            for link in pdf_page.links().iter() {
                let area = match link.rect() {
                    Ok(rect) => to_rectangle(&rect),
                    Err(err) => {
                        warn!(?err, page, path = %self.path.display(), "failed to resolve link rectangle");
                        continue;
                    }
                };
                if let Some(target) = link_target(&link) {
                    links.push(Link { area, target });
                }
            }
            Ok(links)
        })
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        self.with_document(|document| {
            let mut outline = Vec::new();
            if let Some(root) = document.bookmarks().root() {
                collect_outline(root, 1, &mut outline);
            }
            Ok(outline)
        })
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.with_document(|document| {
            document
                .save_to_file(path)
                .with_context(|| format!("failed to save document to {:?}", path))
        })
    }

    fn export_images(&self, dir: &Path, stem: &str) -> Result<usize> {
        self.with_document(|document| {
            let mut written = 0;
            for (page_index, page) in document.pages().iter().enumerate() {
                let mut image_number = 0;
                for object in page.objects().iter() {
                    let Some(image_object) = object.as_image_object() else {
                        continue;
                    };
                    image_number += 1;
                    let image = match image_object.get_raw_image() {
                        Ok(image) => image,
                        Err(err) => {
                            warn!(page = page_index, image_number, "failed to decode image: {err}");
                            continue;
                        }
                    };
                    let target = dir.join(image_file_name(stem, page_index + 1, image_number));
                    image
                        .save(&target)
                        .with_context(|| format!("failed to write {:?}", target))?;
                    debug!(path = %target.display(), "exported image");
                    written += 1;
                }
            }
            Ok(written)
        })
    }

    fn export_attachments(&self, dir: &Path) -> Result<usize> {
        self.with_document(|document| {
            let mut written = 0;
            for attachment in document.attachments().iter() {
                let Some(name) = attachment_file_name(&attachment.name()) else {
                    warn!("skipping attachment without a usable name");
                    continue;
                };
                let bytes = attachment
                    .save_to_bytes()
                    .with_context(|| format!("failed to read attachment {name}"))?;
                let target = dir.join(&name);
                fs::write(&target, bytes).with_context(|| format!("failed to write {:?}", target))?;
                debug!(path = %target.display(), "exported attachment");
                written += 1;
            }
            Ok(written)
        })
    }
}

fn to_rectangle(rect: &PdfRect) -> Rectangle {
    Rectangle::new(
        f64::from(rect.left().value),
        f64::from(rect.bottom().value),
        f64::from(rect.right().value),
        f64::from(rect.top().value),
    )
}

fn link_target(link: &PdfLink<'_>) -> Option<LinkTarget> {
    if let Some(action) = link.action() {
        match action.action_type() {
            PdfActionType::GoToDestinationInSameDocument => {
                let page = action
                    .as_local_destination_action()
                    .and_then(|local| local.destination().ok())
                    .and_then(|destination| destination.page_index().ok());
                if let Some(page) = page {
                    return Some(LinkTarget::Page(page as usize));
                }
            }
            PdfActionType::Uri => {
                let uri = action
                    .as_uri_action()
                    .and_then(|uri_action| uri_action.uri().ok())
                    .filter(|uri| !uri.is_empty());
                if let Some(uri) = uri {
                    return Some(LinkTarget::Uri(uri));
                }
            }
            _ => {}
        }
    }

    link.destination()
        .and_then(|destination| destination.page_index().ok())
        .map(|page| LinkTarget::Page(page as usize))
}

fn collect_outline(mut bookmark: PdfBookmark<'_>, depth: usize, out: &mut Vec<OutlineEntry>) {
    loop {
        if let Some(title) = bookmark.title() {
            let page = bookmark
                .destination()
                .and_then(|destination| destination.page_index().ok())
                .map(|page| page as usize);
            out.push(OutlineEntry { title, page, depth });
        }

        if let Some(child) = bookmark.first_child() {
            collect_outline(child, depth + 1, out);
        }

        match bookmark.next_sibling() {
            Some(next) => bookmark = next,
            None => break,
        }
    }
}

fn build_document_info(document: &PdfDocument<'_>, path: &Path) -> DocumentInfo {
    let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
    let metadata = document.metadata();
    let tag = |kind| {
        metadata
            .get(kind)
            .map(|t| t.value().trim().to_owned())
            .filter(|value| !value.is_empty())
    };

    DocumentInfo {
        id: document_id_for_path(path),
        path: path.to_path_buf(),
        page_count,
        metadata: DocumentMetadata {
            author: tag(PdfDocumentMetadataTagType::Author),
            title: tag(PdfDocumentMetadataTagType::Title),
            subject: tag(PdfDocumentMetadataTagType::Subject),
            keywords: tag(PdfDocumentMetadataTagType::Keywords),
            creator: tag(PdfDocumentMetadataTagType::Creator),
            producer: tag(PdfDocumentMetadataTagType::Producer),
        },
    }
}

/// `<stem>_p<page>_i<n>.png`, both numbers 1-based.
fn image_file_name(stem: &str, page: usize, image: usize) -> String {
    format!("{stem}_p{page}_i{image}.png")
}

/// Final path component of an attachment name, so names cannot escape the
/// export directory.
fn attachment_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|file| file.to_string_lossy().into_owned())
        .filter(|file| !file.is_empty())
}

/// Binds pdfium from `DOCVIEW_PDFIUM_LIBRARY`, then the working directory,
/// then the system library path.
fn bind_pdfium() -> Result<Pdfium> {
    let mut errors = Vec::new();

    if let Some(path) = env::var_os(PDFIUM_LIBRARY_ENV).filter(|path| !path.is_empty()) {
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(err) => {
                warn!("failed to load pdfium from {:?}: {}", path, err);
                errors.push(format!("{}: {}", PathBuf::from(&path).display(), err));
            }
        }
    }

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {} or install it ({})",
                PDFIUM_LIBRARY_ENV,
                errors.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_images_are_numbered_per_page() {
        assert_eq!(image_file_name("paper", 3, 2), "paper_p3_i2.png");
    }

    #[test]
    fn attachment_names_stay_inside_the_export_directory() {
        assert_eq!(attachment_file_name("data.csv").as_deref(), Some("data.csv"));
        assert_eq!(
            attachment_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(attachment_file_name(""), None);
        assert_eq!(attachment_file_name(".."), None);
    }
}
