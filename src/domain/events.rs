use super::turn::{DirectoryOutcome, TurnCompletion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    TurnCompleted(TurnCompletion),
    DirectoryLoaded(DirectoryOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, ctrl: bool) -> Self {
        Self {
            key: key.into(),
            ctrl,
        }
    }

    #[cfg(test)]
    pub fn plain(key: impl Into<String>) -> Self {
        Self::new(key, false)
    }

    /// Returns the typed character for single-character keys.
    pub fn as_char(&self) -> Option<char> {
        if self.ctrl {
            return None;
        }

        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        }
    }
}
