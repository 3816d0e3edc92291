//! Transcript rendering logic.
//!
//! Consecutive messages from the same sender share one label line, a date
//! separator is inserted whenever the local calendar day changes, and message
//! text is wrapped to the panel width by display columns.

use chrono::{DateTime, Local, NaiveDate, Utc};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::domain::message::{Message, Sender};

use super::styles;

const TEXT_INDENT: &str = "  ";
const TYPING_INDICATOR: &str = "Assistant is typing...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptElement {
    DateSeparator(String),
    Message {
        time: String,
        /// Present on the first message of a same-sender run.
        sender: Option<Sender>,
        content: String,
    },
}

pub fn build_transcript_elements(messages: &[Message]) -> Vec<TranscriptElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_sender: Option<Sender> = None;

    for message in messages {
        let local = local_time(message.timestamp);
        let date = local.date_naive();

        if prev_date != Some(date) {
            elements.push(TranscriptElement::DateSeparator(
                date.format("%-d %b %Y").to_string(),
            ));
            prev_sender = None;
        }

        let sender = (prev_sender != Some(message.sender)).then_some(message.sender);
        elements.push(TranscriptElement::Message {
            time: local.format("%H:%M").to_string(),
            sender,
            content: message.text.clone(),
        });

        prev_date = Some(date);
        prev_sender = Some(message.sender);
    }

    elements
}

/// Turns transcript elements into display lines no wider than `width`.
pub fn transcript_lines(elements: &[TranscriptElement], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let text_width = width.saturating_sub(TEXT_INDENT.len()).max(1);

    for element in elements {
        match element {
            TranscriptElement::DateSeparator(date) => {
                lines.push(Line::default());
                lines.push(
                    Line::from(Span::styled(
                        format!("─── {date} ───"),
                        styles::date_separator_style(),
                    ))
                    .alignment(Alignment::Center),
                );
            }
            TranscriptElement::Message {
                time,
                sender,
                content,
            } => {
                if let Some(sender) = sender {
                    lines.push(Line::default());
                    lines.push(label_line(*sender, time));
                }

                for row in wrap_text(content, text_width) {
                    lines.push(Line::from(vec![
                        Span::raw(TEXT_INDENT),
                        Span::styled(row, styles::message_text_style()),
                    ]));
                }
            }
        }
    }

    lines
}

pub fn typing_indicator_line() -> Line<'static> {
    Line::from(vec![
        Span::raw(TEXT_INDENT),
        Span::styled(TYPING_INDICATOR, styles::typing_indicator_style()),
    ])
}

fn label_line(sender: Sender, time: &str) -> Line<'static> {
    let label_style = match sender {
        Sender::User => styles::user_label_style(),
        Sender::Bot => styles::bot_label_style(),
    };

    Line::from(vec![
        Span::styled(sender.display_label(), label_style),
        Span::raw(" "),
        Span::styled(time.to_owned(), styles::message_time_style()),
    ])
}

/// Greedy word wrap by display width; words wider than a row are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for paragraph in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0;

        for word in paragraph.split(' ') {
            let word_width = word.width();
            let gap = usize::from(!row.is_empty());

            if row_width + gap + word_width <= width {
                if gap == 1 {
                    row.push(' ');
                }
                row.push_str(word);
                row_width += gap + word_width;
                continue;
            }

            if !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }

            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if row_width + ch_width > width && !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(ch);
                row_width += ch_width;
            }
        }

        rows.push(row);
    }

    rows
}

fn local_time(timestamp: DateTime<Utc>) -> DateTime<Local> {
    timestamp.with_timezone(&Local)
}
