mod browse;
mod compress;
mod confirm_dialog;
mod explorer;

pub use browse::render_browse;
pub use compress::render_compress;
pub use confirm_dialog::render_confirm_dialog;
pub use explorer::render_explorer;

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::ListItem;

use crate::queue::{EncodeJob, JobStatus};

/// One queue row, shared between the browsing and compressing screens
pub(crate) fn queue_item(job: &EncodeJob, is_current: bool) -> ListItem<'static> {
    let bold_mod = if is_current {
        Modifier::BOLD
    } else {
        Modifier::empty()
    };

    let name = job.filename();
    match &job.status {
        JobStatus::Pending => {
            let size = humansize::format_size(job.source_size, humansize::DECIMAL);
            ListItem::new(format!("  ○ {name} ({size})"))
                .style(Style::default().fg(Color::DarkGray).add_modifier(bold_mod))
        }
        JobStatus::Running { progress } => {
            ListItem::new(format!("  ▶ {name} {:.1}%", progress * 100.0))
                .style(Style::default().fg(Color::Cyan).add_modifier(bold_mod))
        }
        JobStatus::Succeeded => {
            let suffix = job
                .size_reduction()
                .map(|(saved, percent)| {
                    format!(
                        " (saved {}, -{percent:.0}%)",
                        humansize::format_size(saved, humansize::DECIMAL)
                    )
                })
                .unwrap_or_default();
            ListItem::new(format!("  ✓ {name}{suffix}"))
                .style(Style::default().fg(Color::Green).add_modifier(bold_mod))
        }
        JobStatus::Failed { message } => ListItem::new(format!("  ✗ {name}: {message}"))
            .style(Style::default().fg(Color::Red).add_modifier(bold_mod)),
        JobStatus::Cancelled => ListItem::new(format!("  ⊘ {name} (cancelled)"))
            .style(Style::default().fg(Color::Yellow).add_modifier(bold_mod)),
    }
}
