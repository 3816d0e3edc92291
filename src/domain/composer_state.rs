//! Editable line the user types chat messages into.

const MAX_COMPOSER_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposerState {
    chars: Vec<char>,
    cursor: usize,
}

impl ComposerState {
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Cursor position counted in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|ch| ch.is_whitespace())
    }

    /// Returns false when the composer is already full.
    pub fn insert(&mut self, ch: char) -> bool {
        if self.chars.len() >= MAX_COMPOSER_CHARS {
            return false;
        }

        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
        true
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }

        self.cursor -= 1;
        self.chars.remove(self.cursor);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.chars.len();
    }

    /// Replaces the whole line, e.g. with a quick suggestion.
    pub fn replace(&mut self, text: &str) {
        self.chars = text.chars().take(MAX_COMPOSER_CHARS).collect();
        self.cursor = self.chars.len();
    }

    /// Empties the composer and hands back what was typed.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.chars).into_iter().collect()
    }
}
