use crate::app::{App, ConfirmAction};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Yes/No overlay for destructive actions. No is the default answer.
pub fn render_confirm_dialog(f: &mut Frame, app: &App) {
    let Some(action) = app.confirm_dialog else {
        return;
    };

    let (title, message) = match action {
        ConfirmAction::CancelRun => (
            " Cancel Compression ",
            "Stop the current encode? Queued files stay queued.",
        ),
        ConfirmAction::Quit => (" Quit ", "Exit tinythis?"),
    };

    let area = dialog_area(f.area(), 52, 7);
    f.render_widget(Clear, area);

    let highlight = |color| {
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD)
    };
    let (yes_style, no_style) = if app.confirm_selection {
        (highlight(Color::Red), Style::default().fg(Color::Green))
    } else {
        (Style::default().fg(Color::Red), highlight(Color::Green))
    };

    let body = vec![
        Line::from(""),
        Line::from(message),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Yes ", yes_style),
            Span::raw("    "),
            Span::styled(" No ", no_style),
        ]),
    ];

    let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title)
            .title_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
    );
    f.render_widget(dialog, area);
}

fn dialog_area(r: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(r);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}
