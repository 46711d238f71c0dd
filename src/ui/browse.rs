use crate::app::App;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

pub fn render_browse(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .margin(1)
        .split(f.area());

    // Title with the active settings
    let title = Line::from(vec![
        Span::styled(
            "tinythis",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  preset: "),
        Span::styled(
            app.preset.as_str(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  encoder: "),
        Span::styled(
            app.accel.display_name(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
    ]);
    let title = Paragraph::new(title).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(title, chunks[0]);

    // Queue list
    let items: Vec<ListItem> = app
        .queue
        .jobs()
        .iter()
        .map(|job| super::queue_item(job, false))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Files "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, chunks[1], &mut app.queue_list_state);

    // Status banner
    let status_text = app.status.as_deref().unwrap_or("");
    let status = Paragraph::new(status_text)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(status, chunks[2]);

    // Help
    let help_text = Line::from(vec![
        Span::styled("a", Style::default().fg(Color::Yellow)),
        Span::raw(" Add  "),
        Span::styled("d", Style::default().fg(Color::Yellow)),
        Span::raw(" Remove  "),
        Span::styled("←→", Style::default().fg(Color::Yellow)),
        Span::raw(" Preset  "),
        Span::styled("g", Style::default().fg(Color::Yellow)),
        Span::raw(" CPU/GPU  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Compress  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ]);

    let help = Paragraph::new(help_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(help, chunks[3]);
}
