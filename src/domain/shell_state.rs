use super::composer_state::ComposerState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    composer: ComposerState,
    notice: Option<String>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            running: true,
            composer: ComposerState::default(),
            notice: None,
        }
    }
}

impl ShellState {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn composer(&self) -> &ComposerState {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ComposerState {
        &mut self.composer
    }

    /// One-line hint for the status bar, cleared on the next key press.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
