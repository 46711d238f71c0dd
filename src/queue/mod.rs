pub mod job;
pub mod worker;

pub use job::{EncodeJob, JobStatus, is_supported_video};
pub use worker::WorkerMessage;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::encoder::build_ffmpeg_args;
use crate::error::{AppError, Result};
use crate::output::resolve_output_path;
use crate::presets::{Accel, Preset};
use worker::WorkerSpec;

/// Aggregate results across a queue
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// What a message drain observed
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Jobs that reached a terminal state during this drain
    pub finished: usize,
    /// Whether any of them was a cancellation
    pub cancelled: bool,
}

/// Ordered job queue with serialized execution.
///
/// Insertion order is processing order, and at most one job is ever
/// running: encoder throughput is benchmarked assuming exclusive resource
/// access, so concurrency here is a policy violation rather than a missing
/// feature. The running job's worker communicates only through messages
/// drained by `poll`/`wait_message` on the owning thread.
pub struct JobQueue {
    jobs: Vec<EncodeJob>,
    queued: HashSet<PathBuf>,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    cancel_flag: Arc<AtomicBool>,
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            jobs: Vec::new(),
            queued: HashSet::new(),
            tx,
            rx,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn jobs(&self) -> &[EncodeJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Validate and append a job.
    ///
    /// Extension and existence are checked here, before any job exists;
    /// preset and accel are stamped from the session's current values.
    pub fn enqueue(&mut self, path: PathBuf, preset: Preset, accel: Accel) -> Result<()> {
        if !is_supported_video(&path) {
            return Err(AppError::UnsupportedExtension(path));
        }

        let meta = std::fs::metadata(&path).map_err(|_| AppError::NotAFile(path.clone()))?;
        if !meta.is_file() {
            return Err(AppError::NotAFile(path));
        }

        if !self.queued.insert(queue_key(&path)) {
            return Err(AppError::DuplicateInput(path));
        }

        debug!("enqueued {} [{}]", path.display(), preset);
        self.jobs.push(EncodeJob::new(path, meta.len(), preset, accel));
        Ok(())
    }

    /// Remove a job by index. Only pending jobs can be removed; running
    /// jobs must be cancelled first and completed jobs are history.
    pub fn remove(&mut self, index: usize) -> Option<EncodeJob> {
        if self.jobs.get(index)?.status != JobStatus::Pending {
            return None;
        }
        let job = self.jobs.remove(index);
        self.queued.remove(&queue_key(&job.input));
        Some(job)
    }

    /// Re-stamp preset and accel on every job that has not started yet
    pub fn restamp_pending(&mut self, preset: Preset, accel: Accel) {
        for job in &mut self.jobs {
            if job.status == JobStatus::Pending {
                job.preset = preset;
                job.accel = accel;
            }
        }
    }

    pub fn has_running(&self) -> bool {
        self.jobs.iter().any(|j| j.status.is_running())
    }

    pub fn running_index(&self) -> Option<usize> {
        self.jobs.iter().position(|j| j.status.is_running())
    }

    /// Lowest-index pending job, strict FIFO
    pub fn next_pending(&self) -> Option<usize> {
        self.jobs.iter().position(|j| j.status == JobStatus::Pending)
    }

    /// No pending or running work remains
    pub fn is_drained(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }

    pub fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Succeeded => summary.succeeded += 1,
                JobStatus::Failed { .. } => summary.failed += 1,
                JobStatus::Cancelled => summary.cancelled += 1,
                _ => {}
            }
        }
        summary
    }

    /// Start the next pending job, if any and if nothing is running.
    ///
    /// The output path is resolved here, against the current filesystem,
    /// not at enqueue time: files queued together may otherwise race each
    /// other to the same candidate name. Returns whether a job was started.
    pub fn run_next(&mut self, ffmpeg: Option<&Path>) -> Result<bool> {
        if self.has_running() {
            return Ok(false);
        }
        let Some(index) = self.next_pending() else {
            return Ok(false);
        };

        let ffmpeg = ffmpeg.ok_or(AppError::EncoderUnavailable)?;

        let (input, preset, accel) = {
            let job = &self.jobs[index];
            (job.input.clone(), job.preset, job.accel)
        };
        let output = resolve_output_path(&input, preset)?;
        let args = build_ffmpeg_args(&input, &output, preset, accel);

        let job = &mut self.jobs[index];
        job.output_path = Some(output.clone());
        job.status = JobStatus::Running { progress: 0.0 };
        info!("starting job {index}: {} -> {}", input.display(), output.display());

        self.cancel_flag = Arc::new(AtomicBool::new(false));
        let cancel = Arc::clone(&self.cancel_flag);
        let tx = self.tx.clone();
        let spec = WorkerSpec {
            index,
            ffmpeg: ffmpeg.to_path_buf(),
            args,
            output,
        };
        thread::spawn(move || worker::run_worker(spec, cancel, tx));

        Ok(true)
    }

    /// Request cooperative cancellation of the running job, if any
    pub fn cancel_running(&mut self) {
        if self.has_running() {
            info!("cancellation requested");
            self.cancel_flag.store(true, Ordering::Relaxed);
        }
    }

    /// Drain all pending worker messages without blocking
    pub fn poll(&mut self) -> PollOutcome {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let mut outcome = PollOutcome::default();
        for msg in messages {
            self.apply(msg, &mut outcome);
        }
        outcome
    }

    /// Block up to `timeout` for one message, then drain the rest
    pub fn wait_message(&mut self, timeout: Duration) -> PollOutcome {
        let mut messages = Vec::new();
        if let Ok(msg) = self.rx.recv_timeout(timeout) {
            messages.push(msg);
        }
        loop {
            match self.rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let mut outcome = PollOutcome::default();
        for msg in messages {
            self.apply(msg, &mut outcome);
        }
        outcome
    }

    fn apply(&mut self, msg: WorkerMessage, outcome: &mut PollOutcome) {
        match msg {
            WorkerMessage::Progress { index, fraction } => {
                if let Some(job) = self.jobs.get_mut(index)
                    && let JobStatus::Running { progress } = &job.status
                    && fraction > *progress
                {
                    job.status = JobStatus::Running { progress: fraction };
                }
            }
            WorkerMessage::Succeeded { index, output_bytes } => {
                if let Some(job) = self.jobs.get_mut(index) {
                    job.status = JobStatus::Succeeded;
                    job.output_size = Some(output_bytes);
                    outcome.finished += 1;
                    self.release(index);
                }
            }
            WorkerMessage::Failed { index, message } => {
                if let Some(job) = self.jobs.get_mut(index) {
                    job.status = JobStatus::Failed { message };
                    outcome.finished += 1;
                    self.release(index);
                }
            }
            WorkerMessage::Cancelled { index } => {
                if let Some(job) = self.jobs.get_mut(index) {
                    job.status = JobStatus::Cancelled;
                    outcome.finished += 1;
                    outcome.cancelled = true;
                    self.release(index);
                }
            }
        }
    }

    /// A terminal job no longer blocks its path from being queued again
    fn release(&mut self, index: usize) {
        if let Some(job) = self.jobs.get(index) {
            self.queued.remove(&queue_key(&job.input));
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn queue_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"source data").unwrap();
        path
    }

    fn wait_terminal(queue: &mut JobQueue, index: usize) {
        let deadline = std::time::Instant::now() + Duration::from_secs(15);
        while !queue.jobs()[index].status.is_terminal() {
            assert!(std::time::Instant::now() < deadline, "job never finished");
            queue.wait_message(Duration::from_millis(200));
        }
    }

    #[cfg(unix)]
    fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // The output path is the stub's last argument.
    #[cfg(unix)]
    const LAST_ARG: &str = r#"for out; do :; done"#;

    #[test]
    fn enqueue_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "notes.txt");

        let mut queue = JobQueue::new();
        let err = queue
            .enqueue(path, Preset::Balanced, Accel::Cpu)
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedExtension(_)));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn enqueue_rejects_missing_and_duplicate_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "a.mp4");

        let mut queue = JobQueue::new();
        let err = queue
            .enqueue(dir.path().join("ghost.mp4"), Preset::Balanced, Accel::Cpu)
            .unwrap_err();
        assert!(matches!(err, AppError::NotAFile(_)));

        queue.enqueue(path.clone(), Preset::Balanced, Accel::Cpu).unwrap();
        let err = queue.enqueue(path, Preset::Balanced, Accel::Cpu).unwrap_err();
        assert!(matches!(err, AppError::DuplicateInput(_)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_only_touches_pending_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mov");
        let c = touch(dir.path(), "c.avi");

        let mut queue = JobQueue::new();
        for p in [&a, &b, &c] {
            queue.enqueue(p.clone(), Preset::Balanced, Accel::Cpu).unwrap();
        }

        let removed = queue.remove(1).unwrap();
        assert_eq!(removed.input, b);
        assert_eq!(queue.jobs()[0].input, a);
        assert_eq!(queue.jobs()[1].input, c);

        queue.jobs[0].status = JobStatus::Succeeded;
        assert!(queue.remove(0).is_none());
        assert_eq!(queue.len(), 2);

        // A removed path can be queued again
        queue.enqueue(b, Preset::Balanced, Accel::Cpu).unwrap();
    }

    #[test]
    fn restamp_skips_started_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mp4");

        let mut queue = JobQueue::new();
        queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
        queue.enqueue(b, Preset::Balanced, Accel::Cpu).unwrap();
        queue.jobs[0].status = JobStatus::Running { progress: 0.3 };

        queue.restamp_pending(Preset::Speed, Accel::Gpu);
        assert_eq!(queue.jobs()[0].preset, Preset::Balanced);
        assert_eq!(queue.jobs()[1].preset, Preset::Speed);
        assert_eq!(queue.jobs()[1].accel, Accel::Gpu);
    }

    #[test]
    fn run_next_without_encoder_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.mp4");

        let mut queue = JobQueue::new();
        // Nothing pending: a no-op, not an error
        assert!(!queue.run_next(None).unwrap());

        queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
        let err = queue.run_next(None).unwrap_err();
        assert!(matches!(err, AppError::EncoderUnavailable));
        assert_eq!(queue.jobs()[0].status, JobStatus::Pending);
    }

    #[cfg(unix)]
    #[test]
    fn drains_fifo_with_exact_output_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mov");
        let stub = write_stub(
            dir.path(),
            "ffmpeg-ok",
            &format!("{LAST_ARG}\necho data > \"$out\""),
        );

        let mut queue = JobQueue::new();
        queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
        queue.enqueue(b, Preset::Balanced, Accel::Cpu).unwrap();

        assert!(queue.run_next(Some(&stub)).unwrap());
        assert_eq!(queue.running_index(), Some(0));
        // Serialized execution: a second start is a no-op
        assert!(!queue.run_next(Some(&stub)).unwrap());

        wait_terminal(&mut queue, 0);
        assert_eq!(queue.jobs()[0].status, JobStatus::Succeeded);
        assert!(dir.path().join("a.tinythis.balanced.mp4").is_file());

        assert!(queue.run_next(Some(&stub)).unwrap());
        wait_terminal(&mut queue, 1);
        assert_eq!(queue.jobs()[1].status, JobStatus::Succeeded);
        assert!(dir.path().join("b.tinythis.balanced.mp4").is_file());

        assert!(queue.is_drained());
        let summary = queue.summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
    }

    #[cfg(unix)]
    #[test]
    fn failed_job_leaves_no_output_and_spares_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mp4");
        let stub = write_stub(
            dir.path(),
            "ffmpeg-fail",
            &format!("{LAST_ARG}\necho data > \"$out\"\necho boom >&2\nexit 1"),
        );

        let mut queue = JobQueue::new();
        queue.enqueue(a, Preset::Speed, Accel::Cpu).unwrap();
        queue.enqueue(b, Preset::Speed, Accel::Cpu).unwrap();

        assert!(queue.run_next(Some(&stub)).unwrap());
        wait_terminal(&mut queue, 0);

        match &queue.jobs()[0].status {
            JobStatus::Failed { message } => assert!(message.contains("boom")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!dir.path().join("a.tinythis.speed.mp4").exists());
        assert_eq!(queue.jobs()[1].status, JobStatus::Pending);

        // The queue keeps draining after a failure
        assert!(queue.run_next(Some(&stub)).unwrap());
        wait_terminal(&mut queue, 1);
        assert_eq!(queue.summary().failed, 2);
    }

    #[cfg(unix)]
    #[test]
    fn clean_exit_with_empty_output_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.webm");
        let stub = write_stub(
            dir.path(),
            "ffmpeg-empty",
            &format!("{LAST_ARG}\n: > \"$out\"\nexit 0"),
        );

        let mut queue = JobQueue::new();
        queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
        assert!(queue.run_next(Some(&stub)).unwrap());
        wait_terminal(&mut queue, 0);

        match &queue.jobs()[0].status {
            JobStatus::Failed { message } => assert!(message.contains("no output")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!dir.path().join("a.tinythis.balanced.mp4").exists());
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_reaps_the_process_and_keeps_pending_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mp4");
        let stub = write_stub(
            dir.path(),
            "ffmpeg-slow",
            &format!("{LAST_ARG}\necho data > \"$out\"\nsleep 30"),
        );

        let mut queue = JobQueue::new();
        queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
        queue.enqueue(b, Preset::Balanced, Accel::Cpu).unwrap();

        assert!(queue.run_next(Some(&stub)).unwrap());
        queue.cancel_running();

        let start = std::time::Instant::now();
        wait_terminal(&mut queue, 0);
        assert!(start.elapsed() < Duration::from_secs(10));

        assert_eq!(queue.jobs()[0].status, JobStatus::Cancelled);
        assert!(!dir.path().join("a.tinythis.balanced.mp4").exists());
        assert_eq!(queue.jobs()[1].status, JobStatus::Pending);
        assert!(!queue.is_drained());
    }
}
