//! Style definitions for the UI components.

use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// Header styles
// =============================================================================

/// Style for the assistant or business name in the header.
pub fn header_title_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn header_subtitle_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

// =============================================================================
// Transcript styles
// =============================================================================

/// Style for the "You" label.
pub fn user_label_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Style for the "Assistant" label.
pub fn bot_label_style() -> Style {
    Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

pub fn message_time_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn message_text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn date_separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Style for the "Assistant is typing..." indicator.
pub fn typing_indicator_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC)
}

/// Style for the quick suggestion hints on an empty chat.
pub fn suggestion_style() -> Style {
    Style::default().fg(Color::Yellow)
}

// =============================================================================
// Composer and picker styles
// =============================================================================

pub fn input_prompt_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn input_placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn active_panel_border_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn inactive_panel_border_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn picker_highlight_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
}

pub fn picker_description_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn notice_style() -> Style {
    Style::default().fg(Color::Yellow)
}
