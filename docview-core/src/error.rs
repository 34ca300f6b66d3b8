use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file does not exist: {0}")]
    NotFound(PathBuf),
    #[error("can not open {0}: wrong password (use \":set password\" to set the password)")]
    BadPassword(PathBuf),
    #[error("can not open {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("no file has been opened")]
    NoDocument,
    #[error("page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0}")]
    MissingArgument(&'static str),
    #[error("invalid argument {value:?}: {reason}")]
    InvalidArgument { value: String, reason: &'static str },
    #[error("unknown option: {0}")]
    UnknownSetting(String),
    #[error("no file has been opened")]
    NoDocument,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl CommandError {
    pub fn severity(&self) -> Severity {
        match self {
            CommandError::MissingArgument(_) | CommandError::NotFound(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
