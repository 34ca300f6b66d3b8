use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Watches one document for writes. The parent directory is watched so
/// that editors replacing the file through a rename are noticed too.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    changes: Receiver<()>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let target = path.to_path_buf();
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let (tx, changes) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &target) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(err) => warn!(?err, "file watcher error"),
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {:?}", dir))?;
        debug!(path = %path.display(), "watching document");

        Ok(Self {
            _watcher: watcher,
            changes,
        })
    }

    /// Drains pending notifications; true if the file changed since the
    /// last call.
    pub fn changed(&self) -> bool {
        self.changes.try_iter().count() > 0
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|path| path == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_writes_to_the_document_count() {
        let target = Path::new("/tmp/a.pdf");
        assert!(touches(
            &event(EventKind::Modify(ModifyKind::Any), "/tmp/a.pdf"),
            target
        ));
        assert!(touches(
            &event(EventKind::Create(CreateKind::File), "/tmp/a.pdf"),
            target
        ));
        assert!(!touches(
            &event(EventKind::Modify(ModifyKind::Any), "/tmp/b.pdf"),
            target
        ));
        assert!(!touches(
            &event(EventKind::Remove(RemoveKind::File), "/tmp/a.pdf"),
            target
        ));
    }
}
