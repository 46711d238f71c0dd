//! Session state and the interactive state machine.
//!
//! All queue and session mutation happens here, on the render loop; worker
//! threads only ever talk back through the queue's message channel.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ratatui::widgets::ListState;
use tracing::warn;

use crate::config::Config;
use crate::presets::{Accel, Preset};
use crate::queue::{JobQueue, JobStatus, QueueSummary, is_supported_video};

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Build and adjust the queue
    Browsing,
    /// Pick files to add (part of browsing, presentation-wise)
    Explorer,
    /// A run is in flight
    Compressing,
}

/// Confirmation dialog action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    CancelRun,
    Quit,
}

/// Main application state
pub struct App {
    pub screen: Screen,
    pub should_quit: bool,

    pub queue: JobQueue,
    pub preset: Preset,
    pub accel: Accel,
    pub selected: Option<usize>,
    pub queue_list_state: ListState,

    pub status: Option<String>,
    pub ffmpeg: Option<PathBuf>,
    pub config: Config,

    // File explorer
    pub current_dir: PathBuf,
    pub dir_entries: Vec<PathBuf>,
    pub explorer_index: usize,
    pub explorer_list_state: ListState,

    // Run bookkeeping
    pub start_time: Option<Instant>,
    pub run_total: usize,
    run_base: QueueSummary,

    pub confirm_dialog: Option<ConfirmAction>,
    pub confirm_selection: bool,
}

impl App {
    pub fn new(config: Config, ffmpeg: Option<PathBuf>) -> Self {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let mut explorer_list_state = ListState::default();
        explorer_list_state.select(Some(0));

        let accel = if config.use_gpu { Accel::Gpu } else { Accel::Cpu };
        let status = if ffmpeg.is_none() {
            Some("ffmpeg not found; install it or set TINYTHIS_FFMPEG".to_string())
        } else {
            None
        };

        Self {
            screen: Screen::Browsing,
            should_quit: false,
            queue: JobQueue::new(),
            preset: Preset::default(),
            accel,
            selected: None,
            queue_list_state: ListState::default(),
            status,
            ffmpeg,
            config,
            current_dir,
            dir_entries: Vec::new(),
            explorer_index: 0,
            explorer_list_state,
            start_time: None,
            run_total: 0,
            run_base: QueueSummary::default(),
            confirm_dialog: None,
            confirm_selection: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    // Queue editing

    /// Enqueue a batch of paths and report counts in the status banner
    pub fn add_paths(&mut self, paths: Vec<PathBuf>) {
        use crate::error::AppError;

        let mut added = 0u32;
        let mut unsupported = 0u32;
        let mut duplicate = 0u32;
        let mut invalid = 0u32;

        for path in paths {
            match self.queue.enqueue(path, self.preset, self.accel) {
                Ok(()) => added += 1,
                Err(AppError::UnsupportedExtension(_)) => unsupported += 1,
                Err(AppError::DuplicateInput(_)) => duplicate += 1,
                Err(_) => invalid += 1,
            }
        }

        if added == 0 && unsupported == 0 && duplicate == 0 && invalid == 0 {
            self.set_status("no files");
            return;
        }

        let mut parts = Vec::<String>::new();
        if added > 0 {
            parts.push(format!("added {added} file{}", plural(added)));
        }
        if unsupported > 0 {
            parts.push(format!("ignored {unsupported} unsupported"));
        }
        if duplicate > 0 {
            parts.push(format!("ignored {duplicate} duplicate"));
        }
        if invalid > 0 {
            parts.push(format!("ignored {invalid} invalid"));
        }
        self.set_status(parts.join(", "));

        if self.selected.is_none() && !self.queue.is_empty() {
            self.selected = Some(0);
        }
        self.clamp_selection();
    }

    pub fn select_prev(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            None | Some(0) => 0,
            Some(i) => i - 1,
        });
        self.queue_list_state.select(self.selected);
    }

    pub fn select_next(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let last = self.queue.len() - 1;
        self.selected = Some(match self.selected {
            None => 0,
            Some(i) => (i + 1).min(last),
        });
        self.queue_list_state.select(self.selected);
    }

    /// Remove the selected job if it is still pending, re-clamping selection
    pub fn remove_selected(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        match self.queue.remove(index) {
            Some(job) => self.set_status(format!("removed {}", job.filename())),
            None => self.set_status("only queued files can be removed"),
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        if self.queue.is_empty() {
            self.selected = None;
        } else if let Some(i) = self.selected {
            self.selected = Some(i.min(self.queue.len() - 1));
        }
        self.queue_list_state.select(self.selected);
    }

    // Preset and accelerator

    pub fn cycle_preset_next(&mut self) {
        self.preset = self.preset.next();
        self.queue.restamp_pending(self.preset, self.accel);
    }

    pub fn cycle_preset_prev(&mut self) {
        self.preset = self.preset.prev();
        self.queue.restamp_pending(self.preset, self.accel);
    }

    /// Flip the encode path and persist the preference
    pub fn toggle_accel(&mut self) {
        self.accel = self.accel.toggled();
        self.queue.restamp_pending(self.preset, self.accel);

        self.config.use_gpu = self.accel == Accel::Gpu;
        if let Err(e) = self.config.save() {
            warn!("could not persist accelerator preference: {e}");
        }
    }

    // Running

    /// Trigger a run of everything pending
    pub fn start_run(&mut self) {
        if self.queue.next_pending().is_none() {
            self.set_status("nothing queued");
            return;
        }

        // The encoder may have appeared since startup
        if self.ffmpeg.is_none() {
            self.ffmpeg = crate::locate::find_ffmpeg();
        }

        self.run_base = self.queue.summary();
        self.run_total = self
            .queue
            .jobs()
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .count();

        match self.queue.run_next(self.ffmpeg.as_deref()) {
            Ok(true) => {
                self.screen = Screen::Compressing;
                self.start_time = Some(Instant::now());
                self.clear_status();
            }
            Ok(false) => {}
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Request cancellation of the in-flight job
    pub fn cancel_run(&mut self) {
        self.queue.cancel_running();
    }

    /// Drain worker messages and keep the run moving.
    ///
    /// Called every render tick. While compressing: a cancellation returns
    /// to browsing with remaining pending jobs intact; any other terminal
    /// transition starts the next pending job; a drained queue returns to
    /// browsing with the aggregate summary.
    pub fn process_worker_messages(&mut self) {
        let outcome = self.queue.poll();

        if self.screen != Screen::Compressing {
            return;
        }

        if outcome.cancelled {
            let pending = self
                .queue
                .jobs()
                .iter()
                .filter(|j| j.status == JobStatus::Pending)
                .count();
            self.finish_run(if pending > 0 {
                format!("cancelled; {pending} file{} still queued", plural(pending as u32))
            } else {
                "cancelled".to_string()
            });
            return;
        }

        if outcome.finished == 0 || self.queue.has_running() {
            return;
        }

        match self.queue.run_next(self.ffmpeg.as_deref()) {
            Ok(true) => {}
            Ok(false) => {
                if self.queue.is_drained() {
                    let banner = self.summary_banner();
                    self.finish_run(banner);
                }
            }
            Err(e) => {
                let banner = e.to_string();
                self.finish_run(banner);
            }
        }
    }

    fn finish_run(&mut self, banner: String) {
        self.screen = Screen::Browsing;
        self.start_time = None;
        self.set_status(banner);
        self.clamp_selection();
    }

    /// Results of the current run, net of anything completed earlier
    pub fn run_summary(&self) -> QueueSummary {
        let now = self.queue.summary();
        QueueSummary {
            succeeded: now.succeeded - self.run_base.succeeded,
            failed: now.failed - self.run_base.failed,
            cancelled: now.cancelled - self.run_base.cancelled,
        }
    }

    fn summary_banner(&self) -> String {
        let summary = self.run_summary();
        let mut parts = vec![format!("{} succeeded", summary.succeeded)];
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.cancelled > 0 {
            parts.push(format!("{} cancelled", summary.cancelled));
        }

        let saved: u64 = self
            .queue
            .jobs()
            .iter()
            .filter_map(|j| j.size_reduction().map(|(bytes, _)| bytes))
            .sum();
        if saved > 0 {
            parts.push(format!(
                "saved {}",
                humansize::format_size(saved, humansize::DECIMAL)
            ));
        }

        format!("done: {}", parts.join(", "))
    }

    /// Fraction of the whole run, counting finished jobs and the live one
    pub fn run_progress(&self) -> f32 {
        if self.run_total == 0 {
            return 0.0;
        }
        let summary = self.run_summary();
        let completed = summary.succeeded + summary.failed + summary.cancelled;
        let current = self
            .queue
            .running_index()
            .map(|i| self.queue.jobs()[i].progress())
            .unwrap_or(0.0);
        ((completed as f32 + current) / self.run_total as f32).min(1.0)
    }

    pub fn run_elapsed(&self) -> Option<std::time::Duration> {
        self.start_time.map(|start| start.elapsed())
    }

    pub fn run_eta(&self) -> Option<std::time::Duration> {
        let progress = self.run_progress();
        if progress <= 0.0 || progress >= 1.0 {
            return None;
        }
        let elapsed = self.run_elapsed()?.as_secs_f64();
        let remaining = elapsed / progress as f64 - elapsed;
        if remaining > 0.0 {
            Some(std::time::Duration::from_secs_f64(remaining))
        } else {
            None
        }
    }

    // File explorer

    pub fn open_explorer(&mut self) {
        self.refresh_dir_entries();
        self.screen = Screen::Explorer;
    }

    pub fn close_explorer(&mut self) {
        self.screen = Screen::Browsing;
    }

    pub fn refresh_dir_entries(&mut self) {
        self.dir_entries.clear();

        if let Some(parent) = self.current_dir.parent()
            && parent != self.current_dir
        {
            self.dir_entries.push(PathBuf::from(".."));
        }

        if let Ok(entries) = std::fs::read_dir(&self.current_dir) {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir() || is_supported_video(p))
                .collect();

            // Directories first, then files
            paths.sort_by(|a, b| match (a.is_dir(), b.is_dir()) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.file_name().cmp(&b.file_name()),
            });

            self.dir_entries.extend(paths);
        }

        self.explorer_index = 0;
        self.explorer_list_state.select(Some(0));
    }

    pub fn explorer_move_up(&mut self) {
        if self.explorer_index > 0 {
            self.explorer_index -= 1;
            self.explorer_list_state.select(Some(self.explorer_index));
        }
    }

    pub fn explorer_move_down(&mut self) {
        if self.explorer_index < self.dir_entries.len().saturating_sub(1) {
            self.explorer_index += 1;
            self.explorer_list_state.select(Some(self.explorer_index));
        }
    }

    fn enter_directory(&mut self, selected: PathBuf) {
        if selected == Path::new("..") {
            if let Some(parent) = self.current_dir.parent() {
                self.current_dir = parent.to_path_buf();
                self.refresh_dir_entries();
            }
        } else if selected.is_dir() {
            self.current_dir = selected;
            self.refresh_dir_entries();
        }
    }

    /// Enter on an entry: descend into directories, add video files and
    /// return to browsing
    pub fn explorer_confirm(&mut self) {
        let Some(selected) = self.dir_entries.get(self.explorer_index).cloned() else {
            return;
        };
        if selected == Path::new("..") || selected.is_dir() {
            self.enter_directory(selected);
        } else {
            self.add_paths(vec![selected]);
            self.screen = Screen::Browsing;
        }
    }

    /// Space on a file: add it and stay in the explorer for more
    pub fn explorer_add_here(&mut self) {
        let Some(selected) = self.dir_entries.get(self.explorer_index).cloned() else {
            return;
        };
        if selected != Path::new("..") && !selected.is_dir() {
            self.add_paths(vec![selected]);
        }
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Format a duration as HH:MM:SS or MM:SS
pub fn format_duration(duration: std::time::Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
