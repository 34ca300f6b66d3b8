use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use directories::BaseDirs;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::bookmark::{BookmarkStore, DocumentBookmarks};
use crate::commands::{CommandId, CommandRegistry, CompletionSource, SpecialAction, COMMAND_PREFIX};
use crate::completion::{Candidate, CandidateGroup, CandidateSource, CompletionDirection, CompletionEngine};
use crate::config::Config;
use crate::document::{DocumentHandle, DocumentId, DocumentProvider, Link, LinkTarget, Rectangle, RenderImage};
use crate::error::{CommandError, DocumentError, Notification, Severity};
use crate::index::{IndexTree, IndexView};
use crate::input::{Action, BufferAction, Dispatch, InputDispatcher, Inputbar, Key, PageStep};
use crate::launcher::{PrintJob, ProcessLauncher};
use crate::marker::MarkerSet;
use crate::render::{self, canvas_size, RecolorPalette, RenderParams};
use crate::search::{SearchDirection, SearchEvent, SearchTicket, SearchWorker};
use crate::settings::{Settings, SETTINGS};
use crate::view::{AdjustMode, GotoMode, Mode, ScrollDirection, ViewState, ZoomKind, ZoomLimits};

pub const FOLLOW_PROMPT: &str = "Follow hint: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DocumentOpened(DocumentId),
    DocumentClosed(DocumentId),
    RedrawNeeded,
    Quit,
}

/// Everything the status line shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub path: Option<PathBuf>,
    pub page: usize,
    pub page_count: usize,
    pub label: Option<String>,
    pub goto_mode: char,
    pub mode: &'static str,
    pub scale: u32,
    pub buffer: String,
}

/// Highlight regions in page space, valid for one page.
#[derive(Debug, Clone, PartialEq)]
struct Highlights {
    page: usize,
    regions: Vec<Rectangle>,
}

/// The viewer core. Owns the open document and every piece of view, input
/// and command state; the front end feeds it keys and draws what it exposes.
pub struct Session {
    provider: Arc<dyn DocumentProvider>,
    store: Arc<dyn BookmarkStore>,
    launcher: Arc<dyn ProcessLauncher>,
    document: RwLock<Option<Arc<DocumentHandle>>>,
    config: Config,
    settings: Settings,
    view: ViewState,
    viewport: (u32, u32),
    input: InputDispatcher,
    registry: CommandRegistry,
    completion: CompletionEngine,
    search: SearchWorker,
    search_ticket: Option<SearchTicket>,
    last_search: Option<(String, SearchDirection)>,
    highlights: Option<Highlights>,
    follow_links: Vec<Link>,
    markers: MarkerSet,
    bookmarks: DocumentBookmarks,
    labels: Vec<Option<String>>,
    labels_available: bool,
    goto_mode: GotoMode,
    index: Option<IndexView>,
    info_visible: bool,
    inputbar_visible: bool,
    notification: Option<Notification>,
    events: Arc<Mutex<Vec<SessionEvent>>>,
    quitting: bool,
}

impl Session {
    pub fn new(
        config: Config,
        provider: Arc<dyn DocumentProvider>,
        store: Arc<dyn BookmarkStore>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        let view = ViewState::new(
            ZoomLimits {
                min: config.zoom_min,
                max: config.zoom_max,
            },
            config.recolor_open,
            config.adjust_open,
        );
        let settings = Settings::from_config(&config);
        let goto_mode = settings.goto_default;
        Self {
            provider,
            store,
            launcher,
            document: RwLock::new(None),
            config,
            settings,
            view,
            viewport: (0, 0),
            input: InputDispatcher::new(),
            registry: CommandRegistry::standard(),
            completion: CompletionEngine::new(),
            search: SearchWorker::new(),
            search_ticket: None,
            last_search: None,
            highlights: None,
            follow_links: Vec::new(),
            markers: MarkerSet::new(),
            bookmarks: DocumentBookmarks::default(),
            labels: Vec::new(),
            labels_available: false,
            goto_mode,
            index: None,
            info_visible: false,
            inputbar_visible: true,
            notification: None,
            events: Arc::new(Mutex::new(Vec::new())),
            quitting: false,
        }
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SessionEvent>>> {
        Arc::clone(&self.events)
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push_event(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }

    fn redraw(&self) {
        self.push_event(SessionEvent::RedrawNeeded);
    }

    pub fn document(&self) -> Option<Arc<DocumentHandle>> {
        self.document.read().clone()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.input.mode()
    }

    pub fn inputbar(&self) -> &Inputbar {
        self.input.inputbar()
    }

    pub fn completion(&self) -> &CompletionEngine {
        &self.completion
    }

    pub fn index(&self) -> Option<&IndexView> {
        self.index.as_ref()
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn bookmarks(&self) -> &DocumentBookmarks {
        &self.bookmarks
    }

    pub fn goto_mode(&self) -> GotoMode {
        self.goto_mode
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn statusbar_visible(&self) -> bool {
        self.settings.statusbar
    }

    pub fn inputbar_visible(&self) -> bool {
        self.inputbar_visible || self.input.inputbar().is_focused()
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn status(&self) -> StatusLine {
        let document = self.document();
        let page = self.view.page();
        StatusLine {
            path: document.as_ref().map(|d| d.path().to_path_buf()),
            page: page + 1,
            page_count: document.as_ref().map_or(0, |d| d.page_count()),
            label: self.labels.get(page).cloned().flatten(),
            goto_mode: self.goto_mode.indicator(),
            mode: self.mode().label(),
            scale: self.view.scale(),
            buffer: self.input.buffer().to_string(),
        }
    }

    /// Metadata rows while the information view is shown.
    pub fn info(&self) -> Option<Vec<(&'static str, String)>> {
        if !self.info_visible {
            return None;
        }
        let document = self.document()?;
        Some(
            document
                .info()
                .metadata
                .entries()
                .into_iter()
                .map(|(label, value)| (label, value.to_string()))
                .collect(),
        )
    }

    /// Shows `message` in place of the inputbar until the next keystroke.
    pub fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let notification = Notification::new(severity, message);
        match severity {
            Severity::Info => info!("{}", notification),
            Severity::Warning | Severity::Error => warn!("{}", notification),
        }
        self.notification = Some(notification);
    }

    fn report(&mut self, err: CommandError) {
        self.notify(err.severity(), err.to_string());
    }

    fn require_document(&self) -> Result<Arc<DocumentHandle>, CommandError> {
        self.document().ok_or(CommandError::NoDocument)
    }

    // Document lifecycle

    /// Opens `path`, replacing the current document only once the new one
    /// has loaded.
    #[instrument(skip(self, password))]
    pub fn open(&mut self, path: &Path, password: Option<&str>) -> Result<(), DocumentError> {
        let password = password
            .map(str::to_string)
            .or_else(|| Some(self.settings.password.clone()).filter(|p| !p.is_empty()));
        let backend = self.provider.open(path, password.as_deref())?;
        let handle = Arc::new(DocumentHandle::new(backend, password));

        self.close();

        let bookmarks = match self.store.load(handle.path()) {
            Ok(bookmarks) => bookmarks.unwrap_or_default(),
            Err(err) => {
                self.notify(Severity::Warning, format!("Could not load bookmarks: {err:#}"));
                DocumentBookmarks::default()
            }
        };

        self.labels = handle.page_labels();
        self.labels_available = self.labels.iter().enumerate().any(|(page, label)| {
            label
                .as_deref()
                .map_or(false, |label| label != (page + 1).to_string())
        });
        self.goto_mode = if bookmarks.page_offset != 0 {
            GotoMode::Offset
        } else {
            self.default_goto_mode()
        };

        self.index = match handle.outline() {
            Ok(outline) => IndexView::new(IndexTree::from_outline(&outline)),
            Err(err) => {
                debug!("document has no outline: {err:#}");
                None
            }
        };

        let page_count = handle.page_count();
        let start = if bookmarks.last_page < page_count {
            bookmarks.last_page
        } else {
            0
        };
        self.bookmarks = bookmarks;
        self.markers.clear();
        self.view.reset();
        self.view.set_page(start, page_count);

        let id = handle.info().id;
        info!(path = %handle.path().display(), page_count, "opened document");
        *self.document.write() = Some(handle);
        self.apply_adjust();
        self.push_event(SessionEvent::DocumentOpened(id));
        self.redraw();
        Ok(())
    }

    /// Flushes bookmarks and releases the document. Returns false when
    /// nothing was open.
    #[instrument(skip(self))]
    pub fn close(&mut self) -> bool {
        self.search.cancel();
        self.search_ticket = None;
        let Some(handle) = self.document.write().take() else {
            return false;
        };

        self.bookmarks.last_page = self.view.page();
        if let Err(err) = self.store.save(handle.path(), &self.bookmarks) {
            self.notify(Severity::Error, format!("Could not save bookmarks: {err:#}"));
        }

        self.bookmarks = DocumentBookmarks::default();
        self.markers.clear();
        self.index = None;
        self.highlights = None;
        self.follow_links.clear();
        self.info_visible = false;
        self.labels.clear();
        self.labels_available = false;
        self.goto_mode = self.settings.goto_default;
        self.view.reset();
        if self.mode() == Mode::Index {
            self.input.set_mode(Mode::Normal);
        }

        info!(path = %handle.path().display(), "closed document");
        self.push_event(SessionEvent::DocumentClosed(handle.info().id));
        self.redraw();
        true
    }

    /// Reopens the current file, keeping scale and page.
    #[instrument(skip(self))]
    pub fn reload(&mut self) {
        let Some(document) = self.document() else {
            return;
        };
        let path = document.path().to_path_buf();
        let password = document.password().map(str::to_string);
        let scale = self.view.scale();
        let page = self.view.page();
        drop(document);

        self.close();
        if let Err(err) = self.open(&path, password.as_deref()) {
            self.report(err.into());
            return;
        }
        self.view.set_scale(i64::from(scale));
        let page_count = self.page_count();
        self.view.set_page(page.min(page_count.saturating_sub(1)), page_count);
        self.clamp_scroll();
        self.redraw();
    }

    pub fn quit(&mut self) {
        self.close();
        self.quitting = true;
        self.push_event(SessionEvent::Quit);
    }

    fn page_count(&self) -> usize {
        self.document.read().as_ref().map_or(0, |d| d.page_count())
    }

    fn default_goto_mode(&self) -> GotoMode {
        match self.settings.goto_default {
            GotoMode::Labels if !self.labels_available => GotoMode::Default,
            mode => mode,
        }
    }

    // Rendering and geometry

    /// Renders the current page with any highlights painted on top.
    pub fn render(&self) -> Result<Option<RenderImage>> {
        let Some(document) = self.document() else {
            return Ok(None);
        };
        let params = RenderParams {
            page: self.view.page(),
            scale_percent: self.view.scale(),
            rotation: self.view.rotation,
            recolor: self.view.recolor.then_some(RecolorPalette {
                dark: self.settings.recolor_darkcolor,
                light: self.settings.recolor_lightcolor,
            }),
        };
        let Some(mut image) = render::render(Some(&document), params)? else {
            return Ok(None);
        };
        if let Some(highlights) = self.highlights.as_ref().filter(|h| h.page == params.page) {
            render::paint_regions(
                &mut image,
                &highlights.regions,
                document.page_size(params.page)?,
                params.scale_percent,
                params.rotation,
                self.settings.search_highlight,
                self.settings.highlight_alpha,
            );
        }
        Ok(Some(image))
    }

    fn canvas(&self) -> Option<(u32, u32)> {
        let document = self.document()?;
        let size = document.page_size(self.view.page()).ok()?;
        Some(canvas_size(size, self.view.scale(), self.view.rotation))
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Records the drawable area in pixels and re-applies the adjust mode.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        self.apply_adjust();
        self.clamp_scroll();
        self.redraw();
    }

    fn max_scroll(&self) -> (u32, u32) {
        let (width, height) = self.canvas().unwrap_or((0, 0));
        (
            width.saturating_sub(self.viewport.0),
            height.saturating_sub(self.viewport.1),
        )
    }

    fn clamp_scroll(&mut self) {
        let (max_x, max_y) = self.max_scroll();
        self.view.scroll_x = self.view.scroll_x.min(max_x);
        self.view.scroll_y = self.view.scroll_y.min(max_y);
    }

    fn apply_adjust(&mut self) {
        let (viewport_width, viewport_height) = self.viewport;
        if self.view.adjust == AdjustMode::None || viewport_width == 0 || viewport_height == 0 {
            return;
        }
        let Some(document) = self.document() else {
            return;
        };
        let Ok(size) = document.page_size(self.view.page()) else {
            return;
        };
        let (width, height) = if self.view.rotation.swaps_axes() {
            (size.height, size.width)
        } else {
            (size.width, size.height)
        };
        let scale = match self.view.adjust {
            AdjustMode::BestFit => f64::from(viewport_height) / height * 100.0,
            AdjustMode::Width => f64::from(viewport_width) / width * 100.0,
            AdjustMode::None => return,
        };
        self.view.set_scale(scale as i64);
    }

    // Navigation

    /// Moves to `page`, warning when it lies outside the document.
    pub fn set_page(&mut self, page: usize) -> bool {
        let page_count = self.page_count();
        if !self.view.set_page(page, page_count) {
            self.notify(Severity::Warning, "Could not open page");
            return false;
        }
        self.view.scroll_y = 0;
        self.highlights = None;
        self.apply_adjust();
        self.clamp_scroll();
        self.redraw();
        true
    }

    pub fn navigate(&mut self, step: PageStep) {
        let page_count = self.page_count();
        if page_count == 0 {
            return;
        }
        let page = self.view.page();
        let target = match step {
            PageStep::Next => (page + 1) % page_count,
            PageStep::Previous => (page + page_count - 1) % page_count,
        };
        self.set_page(target);
    }

    pub fn scroll(&mut self, direction: ScrollDirection) {
        if self.document.read().is_none() {
            return;
        }
        let step = self.settings.scroll_step;
        let (max_x, max_y) = self.max_scroll();
        let view = &mut self.view;
        match direction {
            ScrollDirection::Up => view.scroll_y = view.scroll_y.saturating_sub(step),
            ScrollDirection::Down => view.scroll_y = view.scroll_y.saturating_add(step),
            ScrollDirection::Left => view.scroll_x = view.scroll_x.saturating_sub(step),
            ScrollDirection::Right => view.scroll_x = view.scroll_x.saturating_add(step),
            ScrollDirection::Top => view.scroll_y = 0,
            ScrollDirection::Bottom => view.scroll_y = max_y,
        }
        view.scroll_x = view.scroll_x.min(max_x);
        view.scroll_y = view.scroll_y.min(max_y);
        self.redraw();
    }

    /// Scrolls vertically to `percent` of the scrollable range.
    pub fn scroll_to_percent(&mut self, percent: u64) {
        let (_, max_y) = self.max_scroll();
        let percent = percent.min(100);
        self.view.scroll_y = (u64::from(max_y) * percent / 100) as u32;
        self.redraw();
    }

    pub fn zoom(&mut self, kind: ZoomKind, value: Option<u32>) {
        let current = i64::from(self.view.scale());
        let step = i64::from(self.settings.zoom_step);
        let target = match kind {
            ZoomKind::In => current + step,
            ZoomKind::Out => current - step,
            ZoomKind::Original => 100,
            ZoomKind::Specific => match value {
                Some(value) => i64::from(value),
                None => return,
            },
        };
        self.view.adjust = AdjustMode::None;
        self.view.set_scale(target);
        self.clamp_scroll();
        self.redraw();
    }

    pub fn adjust(&mut self, mode: AdjustMode) {
        self.view.adjust = mode;
        self.apply_adjust();
        self.clamp_scroll();
        self.redraw();
    }

    pub fn rotate(&mut self) {
        self.view.rotation = self.view.rotation.rotated();
        self.apply_adjust();
        self.clamp_scroll();
        self.redraw();
    }

    pub fn toggle_recolor(&mut self) {
        self.view.recolor = !self.view.recolor;
        self.redraw();
    }

    pub fn switch_goto_mode(&mut self) {
        self.goto_mode = match self.goto_mode {
            GotoMode::Labels => GotoMode::Offset,
            GotoMode::Offset => GotoMode::Default,
            GotoMode::Default if self.labels_available => GotoMode::Labels,
            GotoMode::Default => GotoMode::Offset,
        };
        debug!(mode = ?self.goto_mode, "goto mode switched");
    }

    /// Resolves a `gg`, `G` or `<N>G` buffer to a page and moves there.
    fn goto_buffer(&mut self, buffer: &str) {
        let page_count = self.page_count();
        if page_count == 0 {
            return;
        }
        let target = match buffer {
            "gg" => Some(0),
            "G" => Some(page_count - 1),
            _ => {
                let digits = buffer.trim_end_matches('G');
                let Ok(number) = digits.parse::<i64>() else {
                    self.notify(Severity::Warning, "Could not open page");
                    return;
                };
                let mut pid = number;
                match self.goto_mode {
                    GotoMode::Labels => {
                        if let Some(page) = self
                            .labels
                            .iter()
                            .position(|label| label.as_deref() == Some(digits))
                        {
                            pid = page as i64 + 1;
                        }
                    }
                    GotoMode::Offset => pid += self.bookmarks.page_offset,
                    GotoMode::Default => {}
                }
                usize::try_from(pid - 1).ok()
            }
        };
        match target {
            Some(page) => {
                self.set_page(page);
            }
            None => self.notify(Severity::Warning, "Could not open page"),
        }
    }

    fn apply_buffer(&mut self, action: BufferAction, buffer: &str) {
        let number = || {
            buffer
                .trim_end_matches(|c: char| !c.is_ascii_digit())
                .parse::<u64>()
                .ok()
        };
        match action {
            BufferAction::Goto => self.goto_buffer(buffer),
            BufferAction::ScrollPercent => {
                if let Some(percent) = number() {
                    self.scroll_to_percent(percent);
                }
            }
            BufferAction::Zoom(kind) => {
                let value = number().map(|n| n.min(u64::from(u32::MAX)) as u32);
                self.zoom(kind, value);
            }
        }
    }

    // Markers and index

    pub fn add_marker(&mut self, id: char) {
        if self.document.read().is_none() {
            return;
        }
        if !self.markers.add(id, self.view.page()) {
            self.notify(Severity::Warning, format!("Invalid marker: {id}"));
        }
    }

    pub fn eval_marker(&mut self, id: char) {
        if let Some(page) = self.markers.jump(id, self.view.page()) {
            self.set_page(page);
        } else {
            debug!(%id, "no such marker");
        }
    }

    pub fn toggle_index(&mut self) {
        if self.mode() == Mode::Index {
            self.input.set_mode(Mode::Normal);
            self.redraw();
            return;
        }
        if self.document.read().is_none() {
            return;
        }
        let page = self.view.page();
        match self.index.as_mut() {
            Some(index) => {
                index.reveal_page(page);
                self.input.set_mode(Mode::Index);
                self.redraw();
            }
            None => self.notify(Severity::Warning, "This document does not contain any index"),
        }
    }

    fn select_index(&mut self) {
        let target = self.index.as_ref().and_then(IndexView::select);
        self.input.set_mode(Mode::Normal);
        if let Some(page) = target {
            self.set_page(page);
        }
        self.redraw();
    }

    // Links

    pub fn follow_links(&mut self) {
        let Some(document) = self.document() else {
            return;
        };
        let page = self.view.page();
        let links = match document.links(page) {
            Ok(links) => links,
            Err(err) => {
                self.notify(Severity::Error, format!("Could not read links: {err:#}"));
                return;
            }
        };
        if links.is_empty() {
            self.notify(Severity::Info, "No links on this page");
            return;
        }
        self.highlights = Some(Highlights {
            page,
            regions: links.iter().map(|link| link.area).collect(),
        });
        self.follow_links = links;
        self.input.inputbar_mut().focus_prompt(FOLLOW_PROMPT);
        self.redraw();
    }

    fn follow_hint(&mut self, hint: &str) {
        let links = std::mem::take(&mut self.follow_links);
        self.highlights = None;
        self.redraw();
        let link = hint
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| links.get(n));
        match link.map(|link| &link.target) {
            Some(LinkTarget::Page(page)) => {
                self.set_page(*page);
            }
            Some(LinkTarget::Uri(uri)) => {
                if let Err(err) = self.launcher.open_uri(uri) {
                    self.notify(Severity::Error, format!("Could not open {uri}: {err:#}"));
                }
            }
            None => self.notify(Severity::Warning, "Invalid hint"),
        }
    }

    // Search

    pub fn search(&mut self, query: &str, direction: SearchDirection) {
        let ticket = self
            .search
            .start(self.document(), query, direction, self.view.page());
        self.search_ticket = Some(ticket);
        self.last_search = Some((query.to_string(), direction));
    }

    pub fn search_again(&mut self, reverse: bool) {
        let Some((query, direction)) = self.last_search.clone() else {
            self.notify(Severity::Warning, "No previous search");
            return;
        };
        let direction = if reverse { direction.reversed() } else { direction };
        let ticket = self
            .search
            .start(self.document(), &query, direction, self.view.page());
        self.search_ticket = Some(ticket);
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_running()
    }

    /// Applies finished searches. Returns true when a result changed the
    /// view. Outcomes of superseded searches are dropped.
    pub fn poll_search(&mut self) -> bool {
        let mut changed = false;
        while let Some((ticket, event)) = self.search.try_recv() {
            if Some(ticket) != self.search_ticket {
                debug!(ticket, "dropping superseded search result");
                continue;
            }
            self.search_ticket = None;
            match event {
                SearchEvent::Found { page, regions } => {
                    if self.set_page(page) {
                        self.highlights = Some(Highlights { page, regions });
                        self.redraw();
                        changed = true;
                    }
                }
                SearchEvent::NotFound => {
                    let query = self
                        .last_search
                        .as_ref()
                        .map(|(query, _)| query.clone())
                        .unwrap_or_default();
                    self.notify(Severity::Warning, format!("Pattern not found: {query}"));
                }
                SearchEvent::Cancelled => {}
            }
        }
        changed
    }

    // Input

    pub fn handle_key(&mut self, key: Key) {
        self.notification = None;
        match self.input.dispatch(key) {
            Dispatch::Ignored | Dispatch::Handled => {}
            Dispatch::Action(action) => self.apply_action(action),
            Dispatch::Buffer(action, buffer) => self.apply_buffer(action, &buffer),
            Dispatch::AddMarker(id) => self.add_marker(id),
            Dispatch::EvalMarker(id) => self.eval_marker(id),
            Dispatch::InputChanged(text) => self.input_changed(&text),
            Dispatch::Complete(direction, text) => self.complete(direction, &text),
            Dispatch::Submit(line) => self.submit(&line),
            Dispatch::FollowHint(hint) => self.follow_hint(&hint),
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Abort => {
                self.completion.hide();
                if !self.follow_links.is_empty() {
                    self.follow_links.clear();
                    self.highlights = None;
                }
                self.redraw();
            }
            Action::FocusInputbar(_) | Action::DeleteLastBuffered => {}
            Action::ChangeMode(_) => self.redraw(),
            Action::SearchAgain { reverse } => self.search_again(reverse),
            Action::NavigatePage(step) => self.navigate(step),
            Action::Scroll(direction) => self.scroll(direction),
            Action::Adjust(mode) => self.adjust(mode),
            Action::Rotate => self.rotate(),
            Action::Recolor => self.toggle_recolor(),
            Action::ToggleIndex => self.toggle_index(),
            Action::NavigateIndex(movement) => {
                if let Some(index) = self.index.as_mut() {
                    index.navigate(movement);
                    self.redraw();
                }
            }
            Action::SelectIndex => self.select_index(),
            Action::FollowLinks => self.follow_links(),
            Action::SwitchGotoMode => self.switch_goto_mode(),
            Action::ToggleStatusbar => self.settings.statusbar = !self.settings.statusbar,
            Action::ToggleInputbar => self.inputbar_visible = !self.inputbar_visible,
            Action::Quit => self.quit(),
        }
    }

    fn input_changed(&mut self, text: &str) {
        self.completion.hide();
        let mut chars = text.chars();
        let Some(identifier) = chars.next() else {
            return;
        };
        if let Some(special) = self.registry.special(identifier).filter(|s| s.live) {
            let query = chars.as_str();
            if !query.is_empty() {
                match special.action {
                    SpecialAction::Search(direction) => self.search(query, direction),
                }
            }
        }
    }

    fn complete(&mut self, direction: CompletionDirection, text: &str) {
        let source = SessionCandidates {
            settings: &self.settings,
            view: &self.view,
            bookmarks: &self.bookmarks,
            launcher: self.launcher.as_ref(),
        };
        if let Some(rewritten) = self.completion.update(text, direction, &self.registry, &source) {
            self.input.inputbar_mut().set_text(rewritten);
        }
    }

    fn submit(&mut self, line: &str) {
        self.completion.hide();
        let mut chars = line.chars();
        match chars.next() {
            Some(COMMAND_PREFIX) => {
                if let Err(err) = self.execute(chars.as_str()) {
                    self.report(err);
                }
            }
            Some(identifier) => match self.registry.special(identifier) {
                Some(special) if special.live => {}
                Some(special) => match special.action {
                    SpecialAction::Search(direction) => self.search(chars.as_str(), direction),
                },
                None => self.report(CommandError::UnknownCommand(line.to_string())),
            },
            None => {}
        }
    }

    // Commands

    /// Runs one command line without its `:` prefix.
    #[instrument(skip(self))]
    pub fn execute(&mut self, line: &str) -> Result<(), CommandError> {
        let invocation = self.registry.parse(line)?;
        let args = invocation.args.as_slice();
        match invocation.spec.id {
            CommandId::Bmark => self.bookmark_create(args),
            CommandId::Blist => self.bookmark_open(args),
            CommandId::Delbmark => self.bookmark_delete(args),
            CommandId::Close => {
                self.close();
                Ok(())
            }
            CommandId::Coffset => self.correct_offset(args),
            CommandId::Export => self.export(args),
            CommandId::Info => {
                self.require_document()?;
                self.info_visible = !self.info_visible;
                self.redraw();
                Ok(())
            }
            CommandId::Open => {
                let path = args
                    .first()
                    .ok_or(CommandError::MissingArgument("No arguments given"))?;
                self.open(&expand_path(path), None)?;
                Ok(())
            }
            CommandId::Print => self.print(args),
            CommandId::Quit => {
                self.quit();
                Ok(())
            }
            CommandId::Rotate => {
                self.rotate();
                Ok(())
            }
            CommandId::Set => {
                let spec = self.settings.apply(&mut self.view, args)?;
                if spec.affects_render && self.document.read().is_some() {
                    self.redraw();
                }
                Ok(())
            }
            CommandId::Write => {
                let document = self.require_document()?;
                let path = args
                    .first()
                    .ok_or(CommandError::MissingArgument("No path given"))?;
                let path = expand_path(path);
                document.save(&path)?;
                self.notify(Severity::Info, format!("Saved document to {}", path.display()));
                Ok(())
            }
        }
    }

    fn bookmark_create(&mut self, args: &[&str]) -> Result<(), CommandError> {
        let document = self.require_document()?;
        let id = args
            .first()
            .ok_or(CommandError::MissingArgument("No bookmark given"))?;
        let updated = self.bookmarks.set(id, self.view.page());
        self.persist_bookmarks(&document);
        let verb = if updated { "updated" } else { "created" };
        self.notify(Severity::Info, format!("Bookmark {verb}: {id}"));
        Ok(())
    }

    fn bookmark_open(&mut self, args: &[&str]) -> Result<(), CommandError> {
        self.require_document()?;
        let id = args
            .first()
            .ok_or(CommandError::MissingArgument("No bookmark given"))?;
        let page = self
            .bookmarks
            .get(id)
            .ok_or_else(|| CommandError::NotFound(format!("No such bookmark: {id}")))?;
        self.set_page(page);
        Ok(())
    }

    fn bookmark_delete(&mut self, args: &[&str]) -> Result<(), CommandError> {
        let document = self.require_document()?;
        let id = args
            .first()
            .ok_or(CommandError::MissingArgument("No bookmark given"))?;
        if !self.bookmarks.remove(id) {
            return Err(CommandError::NotFound(format!("No such bookmark: {id}")));
        }
        self.persist_bookmarks(&document);
        self.notify(Severity::Info, format!("Removed bookmark: {id}"));
        Ok(())
    }

    fn persist_bookmarks(&mut self, document: &DocumentHandle) {
        self.bookmarks.last_page = self.view.page();
        if let Err(err) = self.store.save(document.path(), &self.bookmarks) {
            self.notify(Severity::Error, format!("Could not save bookmarks: {err:#}"));
        }
    }

    fn correct_offset(&mut self, args: &[&str]) -> Result<(), CommandError> {
        self.require_document()?;
        let value = args
            .first()
            .ok_or(CommandError::MissingArgument("No offset given"))?;
        let number: i64 = value.parse().map_err(|_| CommandError::InvalidArgument {
            value: value.to_string(),
            reason: "expected a page number",
        })?;
        let offset = self.view.page() as i64 + 1 - number;
        self.bookmarks.page_offset = offset;
        self.goto_mode = if offset != 0 {
            GotoMode::Offset
        } else {
            self.default_goto_mode()
        };
        Ok(())
    }

    fn export(&mut self, args: &[&str]) -> Result<(), CommandError> {
        let document = self.require_document()?;
        let kind = args
            .first()
            .ok_or(CommandError::MissingArgument("No export type specified"))?;
        let dir = args
            .get(1)
            .map(|dir| expand_path(dir))
            .ok_or(CommandError::MissingArgument("No export path specified"))?;
        std::fs::create_dir_all(&dir).map_err(anyhow::Error::from)?;
        let (written, what) = match *kind {
            "images" => {
                let stem = document
                    .path()
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".to_string());
                (document.export_images(&dir, &stem)?, "images")
            }
            "attachments" => (document.export_attachments(&dir)?, "attachments"),
            other => {
                return Err(CommandError::InvalidArgument {
                    value: other.to_string(),
                    reason: "expected images or attachments",
                })
            }
        };
        if written == 0 {
            return Err(CommandError::NotFound(format!("No {what} to export")));
        }
        self.notify(
            Severity::Info,
            format!("Exported {written} {what} to {}", dir.display()),
        );
        Ok(())
    }

    fn print(&mut self, args: &[&str]) -> Result<(), CommandError> {
        let document = self.require_document()?;
        let printer = args
            .first()
            .ok_or(CommandError::MissingArgument("No printer specified"))?;
        let job = PrintJob::new(
            *printer,
            args.get(1).copied(),
            document.path().to_path_buf(),
            document.page_count(),
        );
        self.launcher.print(&job)?;
        self.notify(Severity::Info, format!("Sent to printer {printer}"));
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    if raw == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Completion candidates drawn from session state.
struct SessionCandidates<'a> {
    settings: &'a Settings,
    view: &'a ViewState,
    bookmarks: &'a DocumentBookmarks,
    launcher: &'a dyn ProcessLauncher,
}

impl CandidateSource for SessionCandidates<'_> {
    fn parameters(&self, source: CompletionSource) -> Vec<CandidateGroup> {
        let candidates = match source {
            CompletionSource::Bookmarks => self
                .bookmarks
                .bookmarks
                .iter()
                .map(|(id, page)| Candidate::new(id.clone(), format!("Page: {}", page + 1)))
                .collect(),
            CompletionSource::Export => vec![
                Candidate::new("attachments", "Save attachments"),
                Candidate::new("images", "Save images"),
            ],
            CompletionSource::Printers => match self.launcher.list_printers() {
                Ok(printers) => printers
                    .into_iter()
                    .map(|printer| Candidate::new(printer, ""))
                    .collect(),
                Err(err) => {
                    warn!("could not list printers: {err:#}");
                    Vec::new()
                }
            },
            CompletionSource::Settings => SETTINGS
                .iter()
                .map(|spec| {
                    Candidate::new(
                        spec.name,
                        format!("{} ({})", spec.description, self.settings.display(spec.key, self.view)),
                    )
                })
                .collect(),
        };
        vec![CandidateGroup {
            label: None,
            candidates,
        }]
    }
}
