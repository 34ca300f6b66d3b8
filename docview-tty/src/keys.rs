use crossterm::event::{Event, KeyCode as TermKeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use docview_core::{Key, KeyCode, Modifiers};

/// Translates a terminal event into a viewer key. Releases, mouse and
/// resize events yield `None`.
pub fn translate_event(event: &Event) -> Option<Key> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => translate_key(key),
        _ => None,
    }
}

pub fn translate_key(event: &KeyEvent) -> Option<Key> {
    let code = match event.code {
        TermKeyCode::Char(c) => KeyCode::Char(c),
        TermKeyCode::Esc => KeyCode::Esc,
        TermKeyCode::Enter => KeyCode::Enter,
        TermKeyCode::Backspace => KeyCode::Backspace,
        TermKeyCode::Tab if event.modifiers.contains(KeyModifiers::SHIFT) => KeyCode::BackTab,
        TermKeyCode::Tab => KeyCode::Tab,
        TermKeyCode::BackTab => KeyCode::BackTab,
        TermKeyCode::Up => KeyCode::Up,
        TermKeyCode::Down => KeyCode::Down,
        TermKeyCode::Left => KeyCode::Left,
        TermKeyCode::Right => KeyCode::Right,
        TermKeyCode::Home => KeyCode::Home,
        TermKeyCode::End => KeyCode::End,
        TermKeyCode::PageUp => KeyCode::PageUp,
        TermKeyCode::PageDown => KeyCode::PageDown,
        TermKeyCode::Delete => KeyCode::Delete,
        _ => return None,
    };
    Some(Key::new(code, translate_modifiers(code, event.modifiers)))
}

fn translate_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Modifiers {
    let mut mask = Modifiers::NONE;
    // BackTab already carries the shift.
    if modifiers.contains(KeyModifiers::SHIFT) && code != KeyCode::BackTab {
        mask = mask | Modifiers::SHIFT;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        mask = mask | Modifiers::CONTROL;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        mask = mask | Modifiers::ALT;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(code: TermKeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        })
    }

    fn press(code: TermKeyCode, modifiers: KeyModifiers) -> Option<Key> {
        translate_event(&key_event(code, modifiers, KeyEventKind::Press))
    }

    #[test]
    fn plain_and_shifted_characters_type() {
        let key = press(TermKeyCode::Char('j'), KeyModifiers::NONE).unwrap();
        assert_eq!(key, Key::char('j'));

        let key = press(TermKeyCode::Char('G'), KeyModifiers::SHIFT).unwrap();
        assert_eq!(key.typed_char(), Some('G'));
        assert!(key.modifiers.contains(Modifiers::SHIFT));
    }

    #[test]
    fn control_chords_keep_their_modifier() {
        let key = press(TermKeyCode::Char('r'), KeyModifiers::CONTROL).unwrap();
        assert_eq!(key, Key::ctrl('r'));
        assert_eq!(key.typed_char(), None);
    }

    #[test]
    fn shift_tab_becomes_backtab_without_shift() {
        let key = press(TermKeyCode::Tab, KeyModifiers::SHIFT).unwrap();
        assert_eq!(key, Key::plain(KeyCode::BackTab));
        let key = press(TermKeyCode::BackTab, KeyModifiers::SHIFT).unwrap();
        assert_eq!(key, Key::plain(KeyCode::BackTab));
    }

    #[test]
    fn releases_and_unknown_keys_are_dropped() {
        let release = key_event(
            TermKeyCode::Char('j'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(translate_event(&release), None);
        assert_eq!(press(TermKeyCode::F(5), KeyModifiers::NONE), None);
        assert_eq!(translate_event(&Event::Resize(80, 24)), None);
    }
}
