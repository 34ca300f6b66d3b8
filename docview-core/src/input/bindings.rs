use once_cell::sync::Lazy;
use regex::Regex;

use crate::completion::CompletionDirection;
use crate::index::IndexMove;
use crate::input::keys::{Key, KeyCode, Modifiers};
use crate::view::{AdjustMode, Mode, ScrollDirection, ZoomKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    Next,
    Previous,
}

/// Everything a shortcut can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Abort,
    FocusInputbar(char),
    SearchAgain { reverse: bool },
    NavigatePage(PageStep),
    Scroll(ScrollDirection),
    Adjust(AdjustMode),
    ChangeMode(Mode),
    DeleteLastBuffered,
    Rotate,
    Recolor,
    ToggleIndex,
    NavigateIndex(IndexMove),
    SelectIndex,
    FollowLinks,
    SwitchGotoMode,
    ToggleStatusbar,
    ToggleInputbar,
    Quit,
}

/// A key chord bound to an action. `mask == NONE` accepts any modifiers;
/// `mode == None` applies in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub mask: Modifiers,
    pub key: KeyCode,
    pub mode: Option<Mode>,
    pub action: Action,
}

impl Shortcut {
    pub fn matches(&self, key: &Key, mode: Mode) -> bool {
        key.code == self.key
            && (self.mask.is_empty() || key.modifiers.contains(self.mask))
            && self.mode.map_or(true, |m| m == mode)
    }
}

const fn bind(mask: Modifiers, key: KeyCode, mode: Option<Mode>, action: Action) -> Shortcut {
    Shortcut {
        mask,
        key,
        mode,
        action,
    }
}

const NONE: Modifiers = Modifiers::NONE;
const CTRL: Modifiers = Modifiers::CONTROL;
const NORMAL: Option<Mode> = Some(Mode::Normal);
const VISUAL: Option<Mode> = Some(Mode::Visual);
const INDEX: Option<Mode> = Some(Mode::Index);

fn c(ch: char) -> KeyCode {
    KeyCode::Char(ch)
}

/// Default shortcut table. Order matters: the first match wins, so index
/// bindings and control chords come before plain keys.
pub fn default_shortcuts() -> Vec<Shortcut> {
    let mut table = vec![
        bind(NONE, c('k'), INDEX, Action::NavigateIndex(IndexMove::Up)),
        bind(NONE, KeyCode::Up, INDEX, Action::NavigateIndex(IndexMove::Up)),
        bind(NONE, c('j'), INDEX, Action::NavigateIndex(IndexMove::Down)),
        bind(NONE, KeyCode::Down, INDEX, Action::NavigateIndex(IndexMove::Down)),
        bind(NONE, c('h'), INDEX, Action::NavigateIndex(IndexMove::Collapse)),
        bind(NONE, KeyCode::Left, INDEX, Action::NavigateIndex(IndexMove::Collapse)),
        bind(NONE, c('l'), INDEX, Action::NavigateIndex(IndexMove::Expand)),
        bind(NONE, KeyCode::Right, INDEX, Action::NavigateIndex(IndexMove::Expand)),
        bind(NONE, KeyCode::Enter, INDEX, Action::SelectIndex),
        bind(NONE, c(' '), INDEX, Action::SelectIndex),
        bind(NONE, KeyCode::Tab, INDEX, Action::ToggleIndex),
        bind(NONE, KeyCode::Esc, None, Action::Abort),
        bind(CTRL, c('c'), None, Action::Abort),
        bind(CTRL, c('r'), NORMAL, Action::Recolor),
        bind(CTRL, c('g'), NORMAL, Action::SwitchGotoMode),
        bind(CTRL, c('n'), NORMAL, Action::ToggleStatusbar),
        bind(CTRL, c('t'), NORMAL, Action::ToggleInputbar),
        bind(NONE, c(':'), NORMAL, Action::FocusInputbar(':')),
        bind(NONE, c('/'), NORMAL, Action::FocusInputbar('/')),
        bind(NONE, c('?'), NORMAL, Action::FocusInputbar('?')),
        bind(NONE, c('n'), NORMAL, Action::SearchAgain { reverse: false }),
        bind(NONE, c('N'), NORMAL, Action::SearchAgain { reverse: true }),
        bind(NONE, c('J'), NORMAL, Action::NavigatePage(PageStep::Next)),
        bind(NONE, KeyCode::PageDown, NORMAL, Action::NavigatePage(PageStep::Next)),
        bind(NONE, c('K'), NORMAL, Action::NavigatePage(PageStep::Previous)),
        bind(NONE, KeyCode::PageUp, NORMAL, Action::NavigatePage(PageStep::Previous)),
        bind(NONE, c('a'), NORMAL, Action::Adjust(AdjustMode::BestFit)),
        bind(NONE, c('s'), NORMAL, Action::Adjust(AdjustMode::Width)),
        bind(NONE, c('m'), NORMAL, Action::ChangeMode(Mode::AddMarker)),
        bind(NONE, c('\''), NORMAL, Action::ChangeMode(Mode::EvalMarker)),
        bind(NONE, c('i'), NORMAL, Action::ChangeMode(Mode::Insert)),
        bind(NONE, c('v'), NORMAL, Action::ChangeMode(Mode::Visual)),
        bind(NONE, c('v'), VISUAL, Action::ChangeMode(Mode::Normal)),
        bind(NONE, c('r'), NORMAL, Action::Rotate),
        bind(NONE, KeyCode::Tab, NORMAL, Action::ToggleIndex),
        bind(NONE, c('f'), NORMAL, Action::FollowLinks),
        bind(NONE, c('q'), NORMAL, Action::Quit),
        bind(NONE, KeyCode::Backspace, NORMAL, Action::DeleteLastBuffered),
    ];

    let scrolling = [
        (c('h'), ScrollDirection::Left),
        (KeyCode::Left, ScrollDirection::Left),
        (c('j'), ScrollDirection::Down),
        (KeyCode::Down, ScrollDirection::Down),
        (c('k'), ScrollDirection::Up),
        (KeyCode::Up, ScrollDirection::Up),
        (c('l'), ScrollDirection::Right),
        (KeyCode::Right, ScrollDirection::Right),
        (KeyCode::Home, ScrollDirection::Top),
        (KeyCode::End, ScrollDirection::Bottom),
    ];
    for mode in [NORMAL, VISUAL] {
        table.extend(
            scrolling
                .iter()
                .map(|&(key, direction)| bind(NONE, key, mode, Action::Scroll(direction))),
        );
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Previous,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputbarAction {
    Abort,
    History(HistoryStep),
    Complete(CompletionDirection),
    DeleteLastWord,
    DeleteLastChar,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputbarShortcut {
    pub mask: Modifiers,
    pub key: KeyCode,
    pub action: InputbarAction,
}

impl InputbarShortcut {
    pub fn matches(&self, key: &Key) -> bool {
        key.code == self.key && (self.mask.is_empty() || key.modifiers.contains(self.mask))
    }
}

pub fn default_inputbar_shortcuts() -> Vec<InputbarShortcut> {
    use CompletionDirection as Dir;
    let bind = |mask, key, action| InputbarShortcut { mask, key, action };
    vec![
        bind(NONE, KeyCode::Esc, InputbarAction::Abort),
        bind(CTRL, c('c'), InputbarAction::Abort),
        bind(NONE, KeyCode::Up, InputbarAction::History(HistoryStep::Previous)),
        bind(NONE, KeyCode::Down, InputbarAction::History(HistoryStep::Next)),
        bind(NONE, KeyCode::Tab, InputbarAction::Complete(Dir::Next)),
        bind(NONE, KeyCode::BackTab, InputbarAction::Complete(Dir::Previous)),
        bind(CTRL, c('n'), InputbarAction::Complete(Dir::NextGroup)),
        bind(CTRL, c('p'), InputbarAction::Complete(Dir::PreviousGroup)),
        bind(CTRL, c('w'), InputbarAction::DeleteLastWord),
        bind(NONE, KeyCode::Backspace, InputbarAction::DeleteLastChar),
        bind(NONE, KeyCode::Enter, InputbarAction::Submit),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAction {
    Goto,
    ScrollPercent,
    Zoom(ZoomKind),
}

pub struct BufferCommand {
    pub pattern: Regex,
    pub action: BufferAction,
}

/// Buffer commands in the order they are tested.
pub static BUFFER_COMMANDS: Lazy<Vec<BufferCommand>> = Lazy::new(|| {
    [
        ("^gg$", BufferAction::Goto),
        ("^[0-9]+G$", BufferAction::Goto),
        ("^G$", BufferAction::Goto),
        ("^[0-9]+%$", BufferAction::ScrollPercent),
        ("^[0-9]+Z$", BufferAction::Zoom(ZoomKind::Specific)),
        ("^zI$", BufferAction::Zoom(ZoomKind::In)),
        ("^zO$", BufferAction::Zoom(ZoomKind::Out)),
        ("^z0$", BufferAction::Zoom(ZoomKind::Original)),
    ]
    .into_iter()
    .map(|(pattern, action)| BufferCommand {
        pattern: Regex::new(pattern).expect("valid buffer command pattern"),
        action,
    })
    .collect()
});

/// First buffer command whose pattern matches `buffer`.
pub fn match_buffer(buffer: &str) -> Option<BufferAction> {
    BUFFER_COMMANDS
        .iter()
        .find(|command| command.pattern.is_match(buffer))
        .map(|command| command.action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(key: Key, mode: Mode) -> Option<Action> {
        default_shortcuts()
            .into_iter()
            .find(|s| s.matches(&key, mode))
            .map(|s| s.action)
    }

    #[test]
    fn control_chords_win_over_plain_keys() {
        assert_eq!(lookup(Key::ctrl('n'), Mode::Normal), Some(Action::ToggleStatusbar));
        assert_eq!(
            lookup(Key::char('n'), Mode::Normal),
            Some(Action::SearchAgain { reverse: false })
        );
    }

    #[test]
    fn index_mode_rebinds_direction_keys() {
        assert_eq!(
            lookup(Key::char('j'), Mode::Index),
            Some(Action::NavigateIndex(IndexMove::Down))
        );
        assert_eq!(
            lookup(Key::char('j'), Mode::Visual),
            Some(Action::Scroll(ScrollDirection::Down))
        );
        assert_eq!(lookup(Key::char('J'), Mode::Index), None);
    }

    #[test]
    fn only_abort_applies_in_marker_modes() {
        assert_eq!(lookup(Key::char('a'), Mode::AddMarker), None);
        assert_eq!(
            lookup(Key::plain(KeyCode::Esc), Mode::EvalMarker),
            Some(Action::Abort)
        );
    }

    #[test]
    fn buffer_patterns_are_tested_in_order() {
        assert_eq!(match_buffer("gg"), Some(BufferAction::Goto));
        assert_eq!(match_buffer("12G"), Some(BufferAction::Goto));
        assert_eq!(match_buffer("50%"), Some(BufferAction::ScrollPercent));
        assert_eq!(
            match_buffer("150Z"),
            Some(BufferAction::Zoom(ZoomKind::Specific))
        );
        assert_eq!(match_buffer("z0"), Some(BufferAction::Zoom(ZoomKind::Original)));
        assert_eq!(match_buffer("g"), None);
        assert_eq!(match_buffer("12"), None);
        assert_eq!(match_buffer("xgg"), None);
    }
}
