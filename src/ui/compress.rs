use crate::app::{App, format_duration};
use crate::queue::JobStatus;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
};

pub fn render_compress(f: &mut Frame, app: &App) {
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

    // Title with progress summary
    let summary = app.run_summary();
    let done = summary.succeeded + summary.failed + summary.cancelled;

    let title = Paragraph::new(format!("Compressing ({}/{})", done, app.run_total))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(title, chunks[0]);

    // File list
    let running = app.queue.running_index();
    let items: Vec<ListItem> = app
        .queue
        .jobs()
        .iter()
        .enumerate()
        .map(|(i, job)| super::queue_item(job, running == Some(i)))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Files "),
    );
    f.render_widget(list, chunks[1]);

    // Current file gauge
    if let Some(job) = running.and_then(|i| app.queue.jobs().get(i)) {
        let progress = match job.status {
            JobStatus::Running { progress } => progress,
            _ => 0.0,
        };

        let elapsed_str = app
            .run_elapsed()
            .map(format_duration)
            .unwrap_or_else(|| "--:--".to_string());
        let eta_str = app
            .run_eta()
            .map(format_duration)
            .unwrap_or_else(|| "--:--".to_string());

        let label = format!(
            "{:.1}%  |  Elapsed: {}  |  ETA: {}",
            progress * 100.0,
            elapsed_str,
            eta_str
        );

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(format!(" {} ", job.filename())),
            )
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
            .percent((progress * 100.0) as u16)
            .label(label);
        f.render_widget(gauge, chunks[2]);
    } else {
        let status = Paragraph::new("Waiting...")
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(" Status "),
            );
        f.render_widget(status, chunks[2]);
    }

    // Help
    let help_text = Line::from(vec![
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" Cancel"),
    ]);

    let help = Paragraph::new(help_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(help, chunks[3]);
}
