use std::io::Write;

use anyhow::Result;
use crossterm::cursor;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, WindowSize};
use docview_core::completion::{CompletionEngine, CompletionEntry};
use docview_core::index::IndexView;
use docview_core::{Mode, RenderImage, Session, Severity, StatusLine};
use tracing::trace;

use crate::kitty::{DrawParams, KittyRenderer};

const FALLBACK_CELL_WIDTH: u32 = 8;
const FALLBACK_CELL_HEIGHT: u32 = 16;

/// Terminal size in cells and, when the terminal reports it, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub columns: u16,
    pub rows: u16,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl CellMetrics {
    pub fn from_window(size: WindowSize) -> Self {
        Self {
            columns: size.columns.max(1),
            rows: size.rows.max(1),
            pixel_width: u32::from(size.width),
            pixel_height: u32::from(size.height),
        }
    }

    /// Pixel size of one cell. Terminals that do not report pixels get a
    /// conventional 8x16 cell.
    pub fn cell_size(&self) -> (u32, u32) {
        if self.pixel_width == 0 || self.pixel_height == 0 {
            return (FALLBACK_CELL_WIDTH, FALLBACK_CELL_HEIGHT);
        }
        (
            (self.pixel_width / u32::from(self.columns)).max(1),
            (self.pixel_height / u32::from(self.rows)).max(1),
        )
    }
}

/// Row assignment: the page area on top, then the status bar and the
/// inputbar when they are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub page_rows: u16,
    pub status_row: Option<u16>,
    pub inputbar_row: Option<u16>,
}

impl Layout {
    pub fn new(metrics: &CellMetrics, statusbar: bool, inputbar: bool) -> Self {
        let mut next = metrics.rows;
        let mut reserve = |shown: bool| {
            if shown && next > 1 {
                next -= 1;
                Some(next)
            } else {
                None
            }
        };
        let inputbar_row = reserve(inputbar);
        let status_row = reserve(statusbar);
        Self {
            page_rows: next,
            status_row,
            inputbar_row,
        }
    }

    pub fn for_session(metrics: &CellMetrics, session: &Session) -> Self {
        Self::new(metrics, session.statusbar_visible(), session.inputbar_visible())
    }

    /// Pixel size of the page area.
    pub fn page_viewport(&self, metrics: &CellMetrics) -> (u32, u32) {
        let (cell_width, cell_height) = metrics.cell_size();
        (
            u32::from(metrics.columns) * cell_width,
            u32::from(self.page_rows) * cell_height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Plain,
    Selected,
    Group,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

impl Line {
    fn new(text: String, style: LineStyle) -> Self {
        Self { text, style }
    }
}

/// Copies the `width` x `height` window at (`origin_x`, `origin_y`) out of
/// `image`. The window is clamped to the image.
pub fn crop_render_image(
    image: &RenderImage,
    origin_x: u32,
    origin_y: u32,
    width: u32,
    height: u32,
) -> RenderImage {
    if image.width == 0 || image.height == 0 {
        return RenderImage {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        };
    }

    let width = width.min(image.width).max(1);
    let height = height.min(image.height).max(1);
    let origin_x = origin_x.min(image.width - width);
    let origin_y = origin_y.min(image.height - height);

    let stride = image.width as usize * 4;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for row in origin_y..origin_y + height {
        let start = row as usize * stride + origin_x as usize * 4;
        pixels.extend_from_slice(&image.pixels[start..start + width as usize * 4]);
    }

    RenderImage {
        width,
        height,
        pixels,
    }
}

fn cells_for(pixels: u32, cell: u32) -> u32 {
    pixels.div_ceil(cell.max(1)).max(1)
}

pub fn truncate_with_ellipsis(mut text: String, width: usize) -> String {
    if text.chars().count() > width {
        if width <= 3 {
            text = text.chars().take(width).collect();
        } else {
            let mut truncated = text.chars().take(width - 3).collect::<String>();
            truncated.push_str("...");
            text = truncated;
        }
    }
    let len = text.chars().count();
    if len < width {
        text.push_str(&" ".repeat(width - len));
    }
    text
}

/// Path and mode on the left; buffer, goto mode, page and zoom on the right.
pub fn format_status(status: &StatusLine, width: usize) -> String {
    let path = status
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "[No Name]".to_string());
    let left = if status.mode.is_empty() {
        path
    } else {
        format!("{} {path}", status.mode)
    };

    let mut right = String::new();
    if !status.buffer.is_empty() {
        right.push_str(&status.buffer);
        right.push(' ');
    }
    if status.page_count > 0 {
        right.push_str(&format!("[{}] ", status.goto_mode));
        match &status.label {
            Some(label) if *label != status.page.to_string() => right.push_str(&format!(
                "{label} ({}/{})",
                status.page, status.page_count
            )),
            _ => right.push_str(&format!("[{}/{}]", status.page, status.page_count)),
        }
        right.push_str(&format!(" {}%", status.scale));
    }

    let right_len = right.chars().count();
    if right_len >= width {
        return truncate_with_ellipsis(right, width);
    }
    let left = truncate_with_ellipsis(left, width - right_len - 1);
    format!("{left} {right}")
}

/// Completion rows, scrolled so the selection stays visible.
pub fn completion_lines(engine: &CompletionEngine, width: usize, max_rows: usize) -> Vec<Line> {
    let entries = engine.entries();
    if entries.is_empty() || max_rows == 0 {
        return Vec::new();
    }
    let cursor = engine.cursor();
    let first = match cursor {
        Some(cursor) if cursor >= max_rows => cursor + 1 - max_rows,
        _ => 0,
    };
    let value_width = entries
        .iter()
        .filter_map(|entry| match entry {
            CompletionEntry::Item(item) => Some(item.value.chars().count()),
            CompletionEntry::Group(_) => None,
        })
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .enumerate()
        .skip(first)
        .take(max_rows)
        .map(|(i, entry)| match entry {
            CompletionEntry::Group(label) => {
                Line::new(truncate_with_ellipsis(label.clone(), width), LineStyle::Group)
            }
            CompletionEntry::Item(item) => {
                let text = if item.description.is_empty() {
                    item.value.clone()
                } else {
                    format!("{:<value_width$}  {}", item.value, item.description)
                };
                let style = if cursor == Some(i) {
                    LineStyle::Selected
                } else {
                    LineStyle::Plain
                };
                Line::new(truncate_with_ellipsis(text, width), style)
            }
        })
        .collect()
}

/// Outline rows with the cursor kept on screen.
pub fn index_lines(index: &IndexView, width: usize, height: usize) -> Vec<Line> {
    let rows = index.visible_rows();
    if height == 0 {
        return Vec::new();
    }
    let selected = rows
        .iter()
        .position(|row| row.id == index.cursor())
        .unwrap_or(0);
    let first = (selected + 1).saturating_sub(height);

    rows.iter()
        .skip(first)
        .take(height)
        .map(|row| {
            let node = index.tree().node(row.id);
            let marker = match (row.has_children, row.expanded) {
                (false, _) => ' ',
                (true, true) => '-',
                (true, false) => '+',
            };
            let page = node
                .target
                .map(|page| (page + 1).to_string())
                .unwrap_or_default();
            let indent = "  ".repeat(row.depth.saturating_sub(1).min(8));
            let title_width = width.saturating_sub(page.len() + 1);
            let title = truncate_with_ellipsis(
                format!("{indent}{marker} {}", node.title),
                title_width,
            );
            let style = if row.id == index.cursor() {
                LineStyle::Selected
            } else {
                LineStyle::Plain
            };
            Line::new(format!("{title} {page}"), style)
        })
        .collect()
}

pub fn info_lines(rows: &[(&'static str, String)], width: usize) -> Vec<Line> {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|(label, value)| {
            Line::new(
                truncate_with_ellipsis(format!("{label:>label_width$}  {value}"), width),
                LineStyle::Plain,
            )
        })
        .collect()
}

/// Draws a whole frame for a session: the page (or the index or information
/// view in its place), completion, status bar and inputbar.
pub struct Screen<W: Write> {
    renderer: KittyRenderer<W>,
}

impl<W: Write> Screen<W> {
    pub fn new(writer: W) -> Self {
        Self {
            renderer: KittyRenderer::new(writer),
        }
    }

    pub fn renderer(&mut self) -> &mut KittyRenderer<W> {
        &mut self.renderer
    }

    pub fn draw(&mut self, session: &Session, metrics: &CellMetrics) -> Result<()> {
        let layout = Layout::for_session(metrics, session);
        let width = usize::from(metrics.columns);

        self.renderer.begin_sync_update()?;
        self.renderer.clear_all()?;

        let overlay = match (session.mode(), session.index(), session.info()) {
            (Mode::Index, Some(index), _) => {
                Some(index_lines(index, width, usize::from(layout.page_rows)))
            }
            (_, _, Some(rows)) => Some(info_lines(&rows, width)),
            _ => None,
        };
        match overlay {
            Some(lines) => {
                self.renderer.delete_placement()?;
                self.write_lines(0, &lines)?;
            }
            None => self.draw_page(session, metrics, &layout)?,
        }

        if let Some(row) = layout.inputbar_row {
            let max_rows = usize::from(layout.page_rows / 2);
            let lines = completion_lines(session.completion(), width, max_rows);
            let first = row.saturating_sub(lines.len() as u16);
            self.write_lines(first, &lines)?;
            self.write_line(row, &inputbar_line(session, width))?;
        }
        if let Some(row) = layout.status_row {
            let text = format_status(&session.status(), width);
            self.write_line(row, &Line::new(text, LineStyle::Selected))?;
        }

        self.renderer.end_sync_update()
    }

    fn draw_page(&mut self, session: &Session, metrics: &CellMetrics, layout: &Layout) -> Result<()> {
        let Some(image) = session.render()? else {
            return self.renderer.delete_placement();
        };
        let (viewport_width, viewport_height) = layout.page_viewport(metrics);
        let view = session.view();
        let visible = crop_render_image(
            &image,
            view.scroll_x,
            view.scroll_y,
            viewport_width,
            viewport_height,
        );
        let (cell_width, cell_height) = metrics.cell_size();
        let columns = cells_for(visible.width, cell_width).min(u32::from(metrics.columns));
        let rows = cells_for(visible.height, cell_height).min(u32::from(layout.page_rows));
        let start_col = (u32::from(metrics.columns) - columns) / 2;
        trace!(columns, rows, width = visible.width, height = visible.height, "drawing page");

        crossterm::queue!(self.renderer.writer(), cursor::MoveTo(start_col as u16, 0))?;
        self.renderer.draw(&visible, DrawParams::clamped(columns, rows))
    }

    fn write_lines(&mut self, first_row: u16, lines: &[Line]) -> Result<()> {
        for (offset, line) in lines.iter().enumerate() {
            self.write_line(first_row.saturating_add(offset as u16), line)?;
        }
        Ok(())
    }

    fn write_line(&mut self, row: u16, line: &Line) -> Result<()> {
        let writer = self.renderer.writer();
        crossterm::queue!(writer, cursor::MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        match line.style {
            LineStyle::Plain => crossterm::queue!(writer, Print(&line.text))?,
            LineStyle::Selected => crossterm::queue!(
                writer,
                SetAttribute(Attribute::Reverse),
                Print(&line.text),
                SetAttribute(Attribute::Reset)
            )?,
            LineStyle::Group => crossterm::queue!(
                writer,
                SetAttribute(Attribute::Bold),
                Print(&line.text),
                SetAttribute(Attribute::Reset)
            )?,
            LineStyle::Warning | LineStyle::Error => {
                let color = if line.style == LineStyle::Error {
                    Color::Red
                } else {
                    Color::Yellow
                };
                crossterm::queue!(
                    writer,
                    SetForegroundColor(color),
                    Print(&line.text),
                    ResetColor
                )?
            }
        }
        Ok(())
    }
}

fn inputbar_line(session: &Session, width: usize) -> Line {
    let inputbar = session.inputbar();
    if inputbar.is_focused() {
        let text = format!("{}{}", inputbar.prompt().unwrap_or(""), inputbar.text());
        return Line::new(truncate_with_ellipsis(text, width), LineStyle::Plain);
    }
    match session.notification() {
        Some(notification) => {
            let style = match notification.severity {
                Severity::Info => LineStyle::Plain,
                Severity::Warning => LineStyle::Warning,
                Severity::Error => LineStyle::Error,
            };
            Line::new(
                truncate_with_ellipsis(notification.message.clone(), width),
                style,
            )
        }
        None => Line::new(String::new(), LineStyle::Plain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docview_core::commands::{CommandRegistry, CompletionSource};
    use docview_core::completion::{CandidateGroup, CandidateSource, CompletionDirection};
    use docview_core::index::IndexTree;
    use docview_core::OutlineEntry;
    use std::path::PathBuf;

    fn metrics(columns: u16, rows: u16, pixel_width: u32, pixel_height: u32) -> CellMetrics {
        CellMetrics {
            columns,
            rows,
            pixel_width,
            pixel_height,
        }
    }

    #[test]
    fn layout_reserves_bottom_rows() {
        let m = metrics(80, 24, 800, 480);
        let layout = Layout::new(&m, true, true);
        assert_eq!(layout.inputbar_row, Some(23));
        assert_eq!(layout.status_row, Some(22));
        assert_eq!(layout.page_rows, 22);
        assert_eq!(layout.page_viewport(&m), (800, 440));

        let layout = Layout::new(&m, false, true);
        assert_eq!(layout.status_row, None);
        assert_eq!(layout.page_rows, 23);
    }

    #[test]
    fn missing_pixel_size_falls_back_to_default_cells() {
        let m = metrics(10, 5, 0, 0);
        assert_eq!(m.cell_size(), (8, 16));
        assert_eq!(Layout::new(&m, false, false).page_viewport(&m), (80, 80));
    }

    #[test]
    fn crop_clamps_window_to_image() {
        let mut image = RenderImage::filled(4, 3, [0, 0, 0, 255]);
        for y in 0..3u32 {
            for x in 0..4u32 {
                let i = ((y * 4 + x) * 4) as usize;
                image.pixels[i] = (y * 10 + x) as u8;
            }
        }

        let cropped = crop_render_image(&image, 1, 1, 2, 2);
        assert_eq!((cropped.width, cropped.height), (2, 2));
        assert_eq!(cropped.pixel(0, 0).unwrap()[0], 11);
        assert_eq!(cropped.pixel(1, 1).unwrap()[0], 22);

        let cropped = crop_render_image(&image, 10, 10, 3, 100);
        assert_eq!((cropped.width, cropped.height), (3, 3));
        assert_eq!(cropped.pixel(0, 0).unwrap()[0], 1);
    }

    #[test]
    fn truncation_pads_and_ellipsizes() {
        assert_eq!(truncate_with_ellipsis("abc".to_string(), 5), "abc  ");
        assert_eq!(truncate_with_ellipsis("abcdefgh".to_string(), 6), "abc...");
        assert_eq!(truncate_with_ellipsis("abcdefgh".to_string(), 2), "ab");
    }

    #[test]
    fn status_shows_labels_and_zoom() {
        let status = StatusLine {
            path: Some(PathBuf::from("/tmp/a.pdf")),
            page: 3,
            page_count: 10,
            label: Some("iii".to_string()),
            goto_mode: 'L',
            mode: "",
            scale: 150,
            buffer: "1".to_string(),
        };
        let line = format_status(&status, 50);
        assert_eq!(line.chars().count(), 50);
        assert!(line.starts_with("/tmp/a.pdf"));
        assert!(line.ends_with("1 [L] iii (3/10) 150%"));

        let status = StatusLine {
            label: Some("3".to_string()),
            buffer: String::new(),
            ..status
        };
        assert!(format_status(&status, 50).ends_with("[L] [3/10] 150%"));

        let status = StatusLine {
            path: None,
            page_count: 0,
            ..status
        };
        assert_eq!(format_status(&status, 12).trim_end(), "[No Name]");
    }

    struct NoCandidates;

    impl CandidateSource for NoCandidates {
        fn parameters(&self, _source: CompletionSource) -> Vec<CandidateGroup> {
            Vec::new()
        }
    }

    #[test]
    fn completion_window_scrolls_to_the_selection() {
        let registry = CommandRegistry::standard();
        let mut engine = CompletionEngine::new();
        engine.update(":b", CompletionDirection::Next, &registry, &NoCandidates);
        let lines = completion_lines(&engine, 40, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].style, LineStyle::Selected);
        assert!(lines[0].text.starts_with("bmark  Bookmark current page"));

        engine.update(":bmark", CompletionDirection::Next, &registry, &NoCandidates);
        let lines = completion_lines(&engine, 40, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].style, LineStyle::Selected);
        assert!(lines[0].text.starts_with("blist  Open a bookmark"));
    }

    #[test]
    fn index_lines_follow_the_cursor() {
        let entries: Vec<OutlineEntry> = (0..5)
            .map(|i| OutlineEntry {
                title: format!("Chapter {i}"),
                page: Some(i * 2),
                depth: 1,
            })
            .collect();
        let mut index = IndexView::new(IndexTree::from_outline(&entries)).unwrap();
        index.reveal_page(8);

        let lines = index_lines(&index, 30, 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].text.contains("Chapter 3"));
        assert_eq!(lines[1].style, LineStyle::Selected);
        assert!(lines[1].text.contains("Chapter 4"));
        assert!(lines[1].text.ends_with(" 9"));
    }

    #[test]
    fn info_lines_align_labels() {
        let rows = vec![
            ("Title", "Manual".to_string()),
            ("Producer", "press".to_string()),
        ];
        let lines = info_lines(&rows, 20);
        assert_eq!(lines[0].text.trim_end(), "   Title  Manual");
        assert_eq!(lines[1].text.trim_end(), "Producer  press");
    }
}
