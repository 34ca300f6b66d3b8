//! Modal keystroke routing: shortcuts, buffered multi-key commands, marker
//! ids and the inputbar.

pub mod bindings;
pub mod inputbar;
pub mod keys;

use tracing::trace;

use crate::completion::CompletionDirection;
use crate::view::Mode;

pub use bindings::{Action, BufferAction, HistoryStep, InputbarAction, PageStep, Shortcut};
pub use inputbar::Inputbar;
pub use keys::{Key, KeyCode, Modifiers};

use bindings::{default_inputbar_shortcuts, default_shortcuts, match_buffer, InputbarShortcut};

/// What a keystroke resolved to. Mode, buffer and inputbar bookkeeping has
/// already happened when this is returned; the rest is up to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Ignored,
    Handled,
    Action(Action),
    Buffer(BufferAction, String),
    AddMarker(char),
    EvalMarker(char),
    InputChanged(String),
    Complete(CompletionDirection, String),
    Submit(String),
    FollowHint(String),
}

pub struct InputDispatcher {
    mode: Mode,
    buffer: String,
    shortcuts: Vec<Shortcut>,
    inputbar_shortcuts: Vec<InputbarShortcut>,
    inputbar: Inputbar,
}

impl Default for InputDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            buffer: String::new(),
            shortcuts: default_shortcuts(),
            inputbar_shortcuts: default_inputbar_shortcuts(),
            inputbar: Inputbar::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        trace!(from = ?self.mode, to = ?mode, "mode change");
        self.mode = mode;
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn inputbar(&self) -> &Inputbar {
        &self.inputbar
    }

    pub fn inputbar_mut(&mut self) -> &mut Inputbar {
        &mut self.inputbar
    }

    /// Back to Normal with nothing pending.
    pub fn abort(&mut self) {
        self.set_mode(Mode::Normal);
        self.buffer.clear();
        self.inputbar.close();
    }

    pub fn dispatch(&mut self, key: Key) -> Dispatch {
        if self.inputbar.is_focused() {
            return self.dispatch_inputbar(key);
        }

        let mode = self.mode;
        if let Some(action) = self
            .shortcuts
            .iter()
            .find(|shortcut| shortcut.matches(&key, mode))
            .map(|shortcut| shortcut.action)
        {
            self.apply(action);
            return Dispatch::Action(action);
        }

        match mode {
            Mode::AddMarker | Mode::EvalMarker => {
                self.set_mode(Mode::Normal);
                match (mode, key.typed_char()) {
                    (Mode::AddMarker, Some(id)) => Dispatch::AddMarker(id),
                    (_, Some(id)) => Dispatch::EvalMarker(id),
                    _ => Dispatch::Handled,
                }
            }
            Mode::Normal | Mode::Visual => match key.typed_char() {
                Some(c) if c.is_ascii_graphic() => {
                    self.buffer.push(c);
                    match match_buffer(&self.buffer) {
                        Some(action) => Dispatch::Buffer(action, std::mem::take(&mut self.buffer)),
                        None => Dispatch::Handled,
                    }
                }
                _ => Dispatch::Ignored,
            },
            Mode::Insert | Mode::Index => Dispatch::Ignored,
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Abort => self.abort(),
            Action::ChangeMode(mode) => self.set_mode(mode),
            Action::FocusInputbar(identifier) => {
                self.buffer.clear();
                self.inputbar.focus(identifier.to_string());
            }
            Action::DeleteLastBuffered => {
                self.buffer.pop();
            }
            _ => {}
        }
    }

    fn dispatch_inputbar(&mut self, key: Key) -> Dispatch {
        let action = self
            .inputbar_shortcuts
            .iter()
            .find(|shortcut| shortcut.matches(&key))
            .map(|shortcut| shortcut.action);

        let Some(action) = action else {
            return match key.typed_char() {
                Some(c) => {
                    self.inputbar.insert(c);
                    Dispatch::InputChanged(self.inputbar.text().to_string())
                }
                None => Dispatch::Ignored,
            };
        };

        match action {
            InputbarAction::Abort => {
                self.abort();
                Dispatch::Action(Action::Abort)
            }
            InputbarAction::DeleteLastChar => {
                if self.inputbar.delete_last_char() {
                    Dispatch::InputChanged(self.inputbar.text().to_string())
                } else {
                    self.abort();
                    Dispatch::Action(Action::Abort)
                }
            }
            InputbarAction::DeleteLastWord => {
                self.inputbar.delete_last_word();
                Dispatch::InputChanged(self.inputbar.text().to_string())
            }
            InputbarAction::History(step) => {
                if self.inputbar.prompt().is_none() && self.inputbar.step_history(step) {
                    Dispatch::InputChanged(self.inputbar.text().to_string())
                } else {
                    Dispatch::Handled
                }
            }
            InputbarAction::Complete(direction) => {
                Dispatch::Complete(direction, self.inputbar.text().to_string())
            }
            InputbarAction::Submit => {
                let text = self.inputbar.text().to_string();
                let prompted = self.inputbar.prompt().is_some();
                if !prompted {
                    self.inputbar.push_history(&text);
                }
                self.inputbar.close();
                if prompted {
                    Dispatch::FollowHint(text)
                } else {
                    Dispatch::Submit(text)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ScrollDirection, ZoomKind};

    fn feed(dispatcher: &mut InputDispatcher, keys: &str) -> Vec<Dispatch> {
        keys.chars()
            .map(|c| dispatcher.dispatch(Key::char(c)))
            .collect()
    }

    #[test]
    fn digits_and_terminator_fire_goto_with_full_buffer() {
        let mut dispatcher = InputDispatcher::new();
        let results = feed(&mut dispatcher, "12G");
        assert_eq!(results[0], Dispatch::Handled);
        assert_eq!(dispatcher.buffer(), "");
        assert_eq!(
            results[2],
            Dispatch::Buffer(BufferAction::Goto, "12G".to_string())
        );
        assert_eq!(
            feed(&mut dispatcher, "gg").pop(),
            Some(Dispatch::Buffer(BufferAction::Goto, "gg".to_string()))
        );
        assert_eq!(
            feed(&mut dispatcher, "G").pop(),
            Some(Dispatch::Buffer(BufferAction::Goto, "G".to_string()))
        );
        assert_eq!(
            feed(&mut dispatcher, "zI").pop(),
            Some(Dispatch::Buffer(BufferAction::Zoom(ZoomKind::In), "zI".to_string()))
        );
    }

    #[test]
    fn abort_from_any_mode_returns_to_normal_with_empty_buffer() {
        for mode in [
            Mode::Insert,
            Mode::Visual,
            Mode::Index,
            Mode::AddMarker,
            Mode::EvalMarker,
        ] {
            let mut dispatcher = InputDispatcher::new();
            feed(&mut dispatcher, "12");
            dispatcher.set_mode(mode);
            let result = dispatcher.dispatch(Key::plain(KeyCode::Esc));
            assert_eq!(result, Dispatch::Action(Action::Abort));
            assert_eq!(dispatcher.mode(), Mode::Normal);
            assert_eq!(dispatcher.buffer(), "");
        }
        let mut dispatcher = InputDispatcher::new();
        feed(&mut dispatcher, "4");
        dispatcher.dispatch(Key::ctrl('c'));
        assert_eq!(dispatcher.buffer(), "");
    }

    #[test]
    fn marker_modes_consume_one_key() {
        let mut dispatcher = InputDispatcher::new();
        assert_eq!(
            feed(&mut dispatcher, "ma"),
            vec![
                Dispatch::Action(Action::ChangeMode(Mode::AddMarker)),
                Dispatch::AddMarker('a'),
            ]
        );
        assert_eq!(dispatcher.mode(), Mode::Normal);
        assert_eq!(
            feed(&mut dispatcher, "''").pop(),
            Some(Dispatch::EvalMarker('\''))
        );
        assert_eq!(dispatcher.mode(), Mode::Normal);
    }

    #[test]
    fn visual_mode_scrolls_and_toggles_back() {
        let mut dispatcher = InputDispatcher::new();
        feed(&mut dispatcher, "v");
        assert_eq!(dispatcher.mode(), Mode::Visual);
        assert_eq!(
            dispatcher.dispatch(Key::char('j')),
            Dispatch::Action(Action::Scroll(ScrollDirection::Down))
        );
        feed(&mut dispatcher, "v");
        assert_eq!(dispatcher.mode(), Mode::Normal);
    }

    #[test]
    fn insert_mode_ignores_everything_but_abort() {
        let mut dispatcher = InputDispatcher::new();
        feed(&mut dispatcher, "i");
        assert_eq!(dispatcher.mode(), Mode::Insert);
        assert_eq!(dispatcher.dispatch(Key::char('q')), Dispatch::Ignored);
        assert_eq!(dispatcher.buffer(), "");
    }

    #[test]
    fn backspace_drops_the_last_buffered_key() {
        let mut dispatcher = InputDispatcher::new();
        feed(&mut dispatcher, "13");
        dispatcher.dispatch(Key::plain(KeyCode::Backspace));
        assert_eq!(dispatcher.buffer(), "1");
    }

    #[test]
    fn inputbar_edits_and_submits_into_history() {
        let mut dispatcher = InputDispatcher::new();
        feed(&mut dispatcher, "2");
        feed(&mut dispatcher, ":");
        assert!(dispatcher.inputbar().is_focused());
        assert_eq!(dispatcher.buffer(), "");
        assert_eq!(
            feed(&mut dispatcher, "in").pop(),
            Some(Dispatch::InputChanged(":in".to_string()))
        );
        assert_eq!(
            dispatcher.dispatch(Key::plain(KeyCode::Tab)),
            Dispatch::Complete(CompletionDirection::Next, ":in".to_string())
        );
        assert_eq!(
            dispatcher.dispatch(Key::plain(KeyCode::Enter)),
            Dispatch::Submit(":in".to_string())
        );
        assert!(!dispatcher.inputbar().is_focused());
        assert_eq!(dispatcher.inputbar().history(), &[":in".to_string()]);
    }

    #[test]
    fn backspace_on_last_character_closes_the_inputbar() {
        let mut dispatcher = InputDispatcher::new();
        feed(&mut dispatcher, "/");
        assert_eq!(
            dispatcher.dispatch(Key::plain(KeyCode::Backspace)),
            Dispatch::Action(Action::Abort)
        );
        assert!(!dispatcher.inputbar().is_focused());
    }

    #[test]
    fn prompt_answers_are_follow_hints() {
        let mut dispatcher = InputDispatcher::new();
        dispatcher.inputbar_mut().focus_prompt("Follow hint: ");
        feed(&mut dispatcher, "2");
        assert_eq!(
            dispatcher.dispatch(Key::plain(KeyCode::Enter)),
            Dispatch::FollowHint("2".to_string())
        );
        assert!(dispatcher.inputbar().history().is_empty());
    }
}
