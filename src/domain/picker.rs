//! View state of the "pick a business" overlay.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BusinessPickerState {
    open: bool,
    query: String,
    selected_index: usize,
}

impl BusinessPickerState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Opens the picker showing the unfiltered directory.
    pub fn open_fresh(&mut self) {
        self.open = true;
        self.query.clear();
        self.selected_index = 0;
    }

    /// Reopens the picker keeping whatever filter was typed before.
    pub fn reopen(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Closes the picker and forgets the filter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn push_query_char(&mut self, ch: char) {
        self.query.push(ch);
        self.selected_index = 0;
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
        self.selected_index = 0;
    }

    pub fn select_next(&mut self, visible: usize) {
        if visible == 0 {
            self.selected_index = 0;
            return;
        }

        self.selected_index = (self.selected_index + 1).min(visible - 1);
    }

    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }
}
