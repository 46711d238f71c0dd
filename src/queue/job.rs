use std::path::{Path, PathBuf};

use crate::presets::{Accel, Preset};

/// Lifecycle of a job in the queue
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Waiting to be started
    Pending,
    /// Encoder subprocess is live; progress is a fraction in [0, 0.99]
    Running { progress: f32 },
    /// Process exited cleanly and the output file is non-empty
    Succeeded,
    /// Process failed, or claimed success without producing output
    Failed { message: String },
    /// Stopped on user request; no output left behind
    Cancelled,
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }
}

/// One input file's transcode attempt.
///
/// Preset and accel are stamped at enqueue and may be restamped by session
/// toggles while still pending; once running they are frozen (the worker
/// operates on its own copy). Failed jobs are history: a re-attempt is a
/// new job, never a mutation of this one.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input: PathBuf,
    pub preset: Preset,
    pub accel: Accel,
    pub status: JobStatus,
    /// Resolved lazily at the pending -> running transition
    pub output_path: Option<PathBuf>,
    pub source_size: u64,
    pub output_size: Option<u64>,
}

impl EncodeJob {
    pub fn new(input: PathBuf, source_size: u64, preset: Preset, accel: Accel) -> Self {
        Self {
            input,
            preset,
            accel,
            status: JobStatus::Pending,
            output_path: None,
            source_size,
            output_size: None,
        }
    }

    /// Get the filename for display
    pub fn filename(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input.to_string_lossy().to_string())
    }

    /// Fraction complete: snaps to 1.0 on success, capped below it otherwise
    pub fn progress(&self) -> f32 {
        match &self.status {
            JobStatus::Running { progress } => *progress,
            JobStatus::Succeeded => 1.0,
            _ => 0.0,
        }
    }

    /// Bytes and percent saved, once both sizes are known
    pub fn size_reduction(&self) -> Option<(u64, f64)> {
        match (self.source_size, self.output_size) {
            (source, Some(output)) if source > 0 => {
                let saved = source.saturating_sub(output);
                let percent = (saved as f64 / source as f64) * 100.0;
                Some((saved, percent))
            }
            _ => None,
        }
    }
}

/// Check a path against the fixed input allow-list, case-insensitively
pub fn is_supported_video(path: &Path) -> bool {
    const VIDEO_EXTENSIONS: [&str; 10] = [
        "mp4", "mov", "avi", "webm", "ogv", "asx", "mpeg", "m4v", "wmv", "mpg",
    ];

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(is_supported_video(Path::new("a.mp4")));
        assert!(is_supported_video(Path::new("a.MOV")));
        assert!(is_supported_video(Path::new("/x/y/b.Webm")));
        assert!(!is_supported_video(Path::new("a.txt")));
        assert!(!is_supported_video(Path::new("a.mkv")));
        assert!(!is_supported_video(Path::new("noextension")));
    }

    #[test]
    fn progress_snaps_on_success_only() {
        let mut job = EncodeJob::new(PathBuf::from("a.mp4"), 100, Preset::Balanced, Accel::Cpu);
        assert_eq!(job.progress(), 0.0);

        job.status = JobStatus::Running { progress: 0.5 };
        assert_eq!(job.progress(), 0.5);

        job.status = JobStatus::Succeeded;
        assert_eq!(job.progress(), 1.0);

        job.status = JobStatus::Cancelled;
        assert_eq!(job.progress(), 0.0);
    }

    #[test]
    fn size_reduction_needs_both_sizes() {
        let mut job = EncodeJob::new(PathBuf::from("a.mp4"), 1000, Preset::Speed, Accel::Cpu);
        assert_eq!(job.size_reduction(), None);

        job.output_size = Some(400);
        let (saved, percent) = job.size_reduction().unwrap();
        assert_eq!(saved, 600);
        assert!((percent - 60.0).abs() < f64::EPSILON);
    }
}
