mod launcher;
mod watch;

use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, Event};
use crossterm::terminal;
use directories::ProjectDirs;
use docview_core::{Config, FileBookmarkStore, Session, SessionEvent, Severity};
use docview_render::PdfiumProvider;
use docview_tty::{translate_event, CellMetrics, Layout, Screen};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::launcher::SystemLauncher;
use crate::watch::FileWatcher;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(
    name = "docview",
    version,
    about = "Keyboard-driven document viewer for kitty-compatible terminals"
)]
struct Args {
    /// Password for encrypted documents
    #[arg(short = 'w', long)]
    password: Option<String>,

    /// Page to open the document on (1-based)
    #[arg(short = 'P', long)]
    page: Option<usize>,

    /// Configuration file, defaults to config.toml in the config directory
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Document to open
    file: Option<PathBuf>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, cursor::Show);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("org", "docview", "docview")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("config.toml"));
    let (config, config_error) = match Config::load(&config_path) {
        Ok(config) => (config, None),
        Err(err) => {
            warn!(?err, path = %config_path.display(), "falling back to default configuration");
            (Config::default(), Some(format!("{err:#}")))
        }
    };

    let store = FileBookmarkStore::new(project_dirs.data_local_dir().join("bookmarks"))?;
    let provider = PdfiumProvider::new()?;
    let mut session = Session::new(
        config,
        Arc::new(provider),
        Arc::new(store),
        Arc::new(SystemLauncher::new()),
    );
    if let Some(message) = config_error {
        session.notify(Severity::Warning, message);
    }

    if let Some(path) = &args.file {
        match session.open(path, args.password.as_deref()) {
            Ok(()) => {
                if let Some(page) = args.page {
                    session.set_page(page.saturating_sub(1));
                }
            }
            Err(err) => session.notify(Severity::Error, err.to_string()),
        }
    }

    let _raw = RawModeGuard::new()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, cursor::Hide)?;
    let mut screen = Screen::new(stdout);

    run(&mut session, &mut screen)?;

    session.close();
    screen.renderer().delete_placement()?;
    screen.renderer().clear_all()?;
    info!("exiting");
    Ok(())
}

fn run(session: &mut Session, screen: &mut Screen<Stdout>) -> Result<()> {
    let mut watcher = watch_current(session);
    let mut dirty = true;

    loop {
        if watcher.as_ref().map_or(false, FileWatcher::changed) {
            info!("document changed on disk, reloading");
            session.reload();
        }

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Resize(..) => dirty = true,
                other => {
                    if let Some(key) = translate_event(&other) {
                        session.handle_key(key);
                        dirty = true;
                    }
                }
            }
        }

        if session.poll_search() {
            dirty = true;
        }

        for event in session.drain_events() {
            match event {
                SessionEvent::DocumentOpened(_) => {
                    watcher = watch_current(session);
                    dirty = true;
                }
                SessionEvent::DocumentClosed(_) => watcher = None,
                SessionEvent::RedrawNeeded => dirty = true,
                SessionEvent::Quit => return Ok(()),
            }
        }
        if session.is_quitting() {
            return Ok(());
        }

        if dirty {
            let metrics = CellMetrics::from_window(terminal::window_size()?);
            let (width, height) = Layout::for_session(&metrics, session).page_viewport(&metrics);
            session.set_viewport(width, height);
            session.drain_events();
            screen.draw(session, &metrics)?;
            dirty = false;
        }
    }
}

fn watch_current(session: &Session) -> Option<FileWatcher> {
    let document = session.document()?;
    match FileWatcher::new(document.path()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(?err, "live reload disabled");
            None
        }
    }
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "docview.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_parse_file_page_and_password() {
        let args = Args::try_parse_from(["docview", "-P", "12", "-w", "secret", "/tmp/a.pdf"])
            .unwrap();
        assert_eq!(args.page, Some(12));
        assert_eq!(args.password.as_deref(), Some("secret"));
        assert_eq!(args.file, Some(PathBuf::from("/tmp/a.pdf")));
        assert!(args.config.is_none());
    }

    #[test]
    fn file_is_optional() {
        let args = Args::try_parse_from(["docview"]).unwrap();
        assert!(args.file.is_none());
    }
}
