use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single-line editor shared by the search box, the jump-to-page input and
/// the form composer fields. Purely stateful; the model decides what the
/// finished text means.
#[derive(Debug, Default)]
pub struct Inputter {
    buffer: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

/// Snapshot handed to the UI and to the model when input finishes.
#[derive(Debug, Default, Clone)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.buffer.clear();
                self.cursor = 0;
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, KeyModifiers::NONE) => {
                if self.cursor < self.buffer.chars().count() {
                    self.cursor += 1;
                }
            }
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    self.buffer.insert(self.byte_pos(), chr);
                    self.cursor += 1;
                }
            }
        }
        self.snapshot()
    }

    /// Seed the buffer, e.g. with the current keyword or a form field's
    /// existing value.
    pub fn seed(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.cursor = self.buffer.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.finished = false;
        self.canceled = false;
    }

    pub fn snapshot(&self) -> InputResult {
        InputResult {
            input: self.buffer.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor: self.cursor,
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_pos();
            self.buffer.remove(at);
        }
    }

    fn byte_pos(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}
