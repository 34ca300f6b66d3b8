use crate::input::bindings::HistoryStep;

/// Single-line text entry below the page. Holds either a command line
/// (starting with its identifier character) or the answer to a prompt.
#[derive(Debug, Default, Clone)]
pub struct Inputbar {
    text: String,
    focused: bool,
    prompt: Option<String>,
    history: Vec<String>,
    history_cursor: Option<usize>,
}

impl Inputbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.prompt = None;
        self.focused = true;
        self.history_cursor = None;
    }

    /// Focuses with a fixed prompt in front of an empty answer.
    pub fn focus_prompt(&mut self, prompt: impl Into<String>) {
        self.focus(String::new());
        self.prompt = Some(prompt.into());
    }

    pub fn close(&mut self) {
        self.text.clear();
        self.prompt = None;
        self.focused = false;
        self.history_cursor = None;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn insert(&mut self, c: char) {
        self.text.push(c);
    }

    /// Removes the last character. Returns false once the text is empty.
    pub fn delete_last_char(&mut self) -> bool {
        self.text.pop();
        !self.text.is_empty()
    }

    /// Cuts back to the previous space (dropping it) or `/` (keeping it).
    /// A separator in the last position does not count. Without any
    /// separator only the leading identifier character survives.
    pub fn delete_last_word(&mut self) {
        let Some((last, _)) = self.text.char_indices().next_back() else {
            return;
        };
        let separator = self.text[..last]
            .char_indices()
            .rev()
            .find(|&(_, c)| c == ' ' || c == '/');
        let keep = match separator {
            Some((i, ' ')) => i,
            Some((i, _)) => i + 1,
            None => self.text.chars().next().map_or(0, char::len_utf8),
        };
        self.text.truncate(keep);
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn push_history(&mut self, line: &str) {
        if !line.is_empty() {
            self.history.push(line.to_string());
        }
        self.history_cursor = None;
    }

    /// Replaces the text with a history entry. Both directions wrap; the
    /// first `Previous` picks the most recent line.
    pub fn step_history(&mut self, step: HistoryStep) -> bool {
        let n = self.history.len();
        if n == 0 {
            return false;
        }
        let next = match (step, self.history_cursor) {
            (HistoryStep::Previous, None) => n - 1,
            (HistoryStep::Previous, Some(i)) => (i + n - 1) % n,
            (HistoryStep::Next, None) => 0,
            (HistoryStep::Next, Some(i)) => (i + 1) % n,
        };
        self.history_cursor = Some(next);
        self.text = self.history[next].clone();
        true
    }
}
