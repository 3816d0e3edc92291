use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::{
    domain::{business::BusinessSummary, composer_state::ComposerState},
    usecases::{
        relay::RelayPhase,
        shell::{ChatView, QUICK_SUGGESTIONS},
    },
};

use super::{
    styles,
    transcript_rendering::{build_transcript_elements, transcript_lines, typing_indicator_line},
};

const DEFAULT_TITLE: &str = "AI Assistant";
const DEFAULT_SUBTITLE: &str = "Always here to help";
const PROMPT_SYMBOL: &str = "> ";

pub fn render(frame: &mut Frame<'_>, view: &ChatView<'_>) {
    let [header_area, transcript_area, input_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    render_header(frame, header_area, view);
    render_transcript(frame, transcript_area, view);
    render_composer(frame, input_area, view);

    let status = Paragraph::new(status_line(view));
    frame.render_widget(status, status_area);

    if view.picker.is_open() {
        render_picker(frame, frame.area(), view);
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, view: &ChatView<'_>) {
    let (title, subtitle) = header_text(view);
    let header = Paragraph::new(vec![
        Line::from(Span::styled(title.to_owned(), styles::header_title_style())),
        Line::from(Span::styled(
            subtitle.to_owned(),
            styles::header_subtitle_style(),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(styles::inactive_panel_border_style()),
    );

    frame.render_widget(header, area);
}

fn header_text<'a>(view: &ChatView<'a>) -> (&'a str, &'a str) {
    (
        view.business_name.unwrap_or(DEFAULT_TITLE),
        view.business_description.unwrap_or(DEFAULT_SUBTITLE),
    )
}

fn render_transcript(frame: &mut Frame<'_>, area: Rect, view: &ChatView<'_>) {
    let block = Block::default()
        .title("Chat")
        .borders(Borders::ALL)
        .border_style(styles::inactive_panel_border_style());
    let inner_width = area.width.saturating_sub(2) as usize;
    let viewport_height = area.height.saturating_sub(2) as usize;

    let mut lines = if view.messages.is_empty() {
        welcome_lines()
    } else {
        transcript_lines(&build_transcript_elements(view.messages), inner_width)
    };

    if view.phase == RelayPhase::Sending {
        lines.push(Line::default());
        lines.push(typing_indicator_line());
    }

    // Keep the newest lines in view.
    let scroll = lines.len().saturating_sub(viewport_height);
    let panel = Paragraph::new(lines)
        .block(block)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));

    frame.render_widget(panel, area);
}

fn welcome_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Ask anything, or try one of these:",
            styles::header_subtitle_style(),
        )),
        Line::default(),
    ];

    for (index, suggestion) in QUICK_SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("F{} ", index + 1), styles::input_prompt_style()),
            Span::styled(*suggestion, styles::suggestion_style()),
        ]));
    }

    lines
}

fn render_composer(frame: &mut Frame<'_>, area: Rect, view: &ChatView<'_>) {
    let is_focused = !view.picker.is_open();
    let border_style = if is_focused {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };

    let available = (area.width.saturating_sub(2) as usize).saturating_sub(PROMPT_SYMBOL.len());
    let (visible, cursor_col) = visible_input(view.composer, available);

    let body = if view.composer.text().is_empty() {
        Span::styled(placeholder(view), styles::input_placeholder_style())
    } else {
        Span::raw(visible)
    };

    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled(PROMPT_SYMBOL, styles::input_prompt_style()),
        body,
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(paragraph, area);

    if is_focused {
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(PROMPT_SYMBOL.len() as u16)
            .saturating_add(cursor_col.min(u16::MAX as usize) as u16);
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn placeholder(view: &ChatView<'_>) -> &'static str {
    match view.phase {
        RelayPhase::AwaitingBusinessSelection => "Press Tab to choose a business...",
        RelayPhase::Sending | RelayPhase::Idle => "Type your message...",
    }
}

/// Slice of the composer text that fits `width` columns with the cursor kept
/// visible, plus the cursor column inside that slice.
fn visible_input(composer: &ComposerState, width: usize) -> (String, usize) {
    let chars: Vec<char> = composer.text().chars().collect();
    let cursor = composer.cursor().min(chars.len());
    let width = width.max(1);

    let mut start = 0;
    let mut cursor_col: usize = chars[..cursor]
        .iter()
        .map(|ch| ch.width().unwrap_or(0))
        .sum();
    while cursor_col >= width && start < cursor {
        cursor_col -= chars[start].width().unwrap_or(0);
        start += 1;
    }

    let mut visible = String::new();
    let mut used = 0;
    for ch in &chars[start..] {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        visible.push(*ch);
        used += ch_width;
    }

    (visible, cursor_col)
}

fn render_picker(frame: &mut Frame<'_>, screen: Rect, view: &ChatView<'_>) {
    let area = centered(screen, 70, 60);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title("Choose a business")
        .borders(Borders::ALL)
        .border_style(styles::active_panel_border_style());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [query_area, list_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .areas(inner);

    let query = Paragraph::new(Line::from(vec![
        Span::styled("Search: ", styles::input_prompt_style()),
        Span::raw(view.picker.query().to_owned()),
    ]));
    frame.render_widget(query, query_area);

    if view.businesses.is_empty() {
        let message = if view.directory_loading {
            "Loading businesses..."
        } else {
            "No businesses found"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(message, styles::header_subtitle_style())),
            list_area,
        );
        return;
    }

    let items: Vec<ListItem<'static>> = view.businesses.iter().map(|b| business_item(b)).collect();
    let list = List::new(items).highlight_style(styles::picker_highlight_style());
    let mut list_state = ListState::default();
    list_state.select(Some(
        view.picker
            .selected_index()
            .min(view.businesses.len().saturating_sub(1)),
    ));
    frame.render_stateful_widget(list, list_area, &mut list_state);
}

fn business_item(business: &BusinessSummary) -> ListItem<'static> {
    let mut spans = vec![Span::raw(business.name.clone())];
    if !business.description.is_empty() {
        spans.push(Span::styled(
            format!("  {}", business.description),
            styles::picker_description_style(),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, middle, _] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .areas(area);

    let [_, center, _] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .areas(middle);

    center
}

fn status_line(view: &ChatView<'_>) -> Line<'static> {
    if let Some(notice) = view.notice {
        return Line::from(Span::styled(notice.to_owned(), styles::notice_style()));
    }

    let hint = if view.picker.is_open() {
        "type: filter | Up/Down: move | Enter: select | Ctrl-R: reload | Esc: back"
    } else {
        match view.phase {
            RelayPhase::Sending => "waiting for reply... | Ctrl-N: new chat | Esc: quit",
            RelayPhase::AwaitingBusinessSelection => {
                "Tab: choose business | Enter: send | Ctrl-N: new chat | Esc: quit"
            }
            RelayPhase::Idle => "Enter: send | F1-F3: suggestions | Ctrl-N: new chat | Esc: quit",
        }
    };

    Line::from(Span::raw(hint))
}
