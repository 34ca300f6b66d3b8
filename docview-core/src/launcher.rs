use std::path::PathBuf;

use anyhow::Result;

/// A fully resolved print request. `pages` uses the `lp -P` range syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub printer: String,
    pub pages: String,
    pub path: PathBuf,
}

impl PrintJob {
    pub fn new(printer: impl Into<String>, pages: Option<&str>, path: PathBuf, page_count: usize) -> Self {
        let pages = pages
            .map(str::to_string)
            .unwrap_or_else(|| format!("1-{}", page_count.max(1)));
        Self {
            printer: printer.into(),
            pages,
            path,
        }
    }
}

/// External processes the viewer hands work to. Implementations receive
/// complete arguments and must not go through a shell.
pub trait ProcessLauncher: Send + Sync {
    fn open_uri(&self, uri: &str) -> Result<()>;
    fn print(&self, job: &PrintJob) -> Result<()>;
    fn list_printers(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_job_defaults_to_every_page() {
        let job = PrintJob::new("office", None, PathBuf::from("/tmp/a.pdf"), 12);
        assert_eq!(job.pages, "1-12");
        let job = PrintJob::new("office", Some("3-4"), PathBuf::from("/tmp/a.pdf"), 12);
        assert_eq!(job.pages, "3-4");
    }
}
