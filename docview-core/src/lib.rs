pub mod bookmark;
pub mod commands;
pub mod completion;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod input;
pub mod launcher;
pub mod marker;
pub mod render;
pub mod search;
pub mod session;
pub mod settings;
pub mod view;

#[cfg(test)]
mod test_support;

pub use bookmark::{BookmarkStore, DocumentBookmarks, FileBookmarkStore, MemoryBookmarkStore};
pub use config::{Config, Rgb};
pub use document::{
    document_id_for_path, DocumentBackend, DocumentHandle, DocumentId, DocumentInfo,
    DocumentMetadata, DocumentProvider, Link, LinkTarget, OutlineEntry, PageSize, Rectangle,
    RenderImage,
};
pub use error::{CommandError, DocumentError, Notification, Severity};
pub use input::{Key, KeyCode, Modifiers};
pub use launcher::{PrintJob, ProcessLauncher};
pub use session::{Session, SessionEvent, StatusLine};
pub use view::{AdjustMode, GotoMode, Mode, Rotation, ViewState};
