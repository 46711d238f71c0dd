use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Messages sent from the worker thread to the controller loop
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Fraction complete, monotone non-decreasing, capped below 1.0
    Progress { index: usize, fraction: f32 },
    /// Process exited cleanly and left a non-empty output file
    Succeeded { index: usize, output_bytes: u64 },
    /// Process failed, or claimed success without producing output
    Failed { index: usize, message: String },
    /// Cancellation observed; subprocess reaped, partial output removed
    Cancelled { index: usize },
}

/// Everything the worker thread needs for one job
pub struct WorkerSpec {
    pub index: usize,
    pub ffmpeg: PathBuf,
    pub args: Vec<OsString>,
    pub output: PathBuf,
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CANCEL_GRACE: Duration = Duration::from_secs(2);
const STDERR_TAIL_LINES: usize = 30;
/// Progress never reports complete until the process actually exits
const PROGRESS_CEILING: f32 = 0.99;

/// Drive one encoder subprocess to a terminal state.
///
/// Owns the child handle exclusively; every exit path reaps the process and
/// removes partial output, so no truncated file is ever left under a final
/// output name.
pub fn run_worker(spec: WorkerSpec, cancel: Arc<AtomicBool>, tx: Sender<WorkerMessage>) {
    let index = spec.index;
    let msg = match encode(&spec, &cancel, &tx) {
        EncodeOutcome::Succeeded { output_bytes } => {
            info!("job {index} succeeded: {}", spec.output.display());
            WorkerMessage::Succeeded { index, output_bytes }
        }
        EncodeOutcome::Cancelled => {
            info!("job {index} cancelled");
            WorkerMessage::Cancelled { index }
        }
        EncodeOutcome::Failed { message } => {
            warn!("job {index} failed: {message}");
            WorkerMessage::Failed { index, message }
        }
    };
    let _ = tx.send(msg);
}

enum EncodeOutcome {
    Succeeded { output_bytes: u64 },
    Cancelled,
    Failed { message: String },
}

enum RawExit {
    Cancelled,
    Status(ExitStatus),
    WaitError(std::io::Error),
}

fn encode(spec: &WorkerSpec, cancel: &AtomicBool, tx: &Sender<WorkerMessage>) -> EncodeOutcome {
    let progress_file = match tempfile::Builder::new()
        .prefix("tinythis-progress-")
        .tempfile()
    {
        Ok(f) => f,
        Err(e) => {
            return EncodeOutcome::Failed {
                message: format!("failed to create progress file: {e}"),
            };
        }
    };

    // Progress reporting goes first: ffmpeg ignores options trailing the
    // output file.
    let mut cmd = Command::new(&spec.ffmpeg);
    cmd.arg("-progress")
        .arg(progress_file.path())
        .args(&spec.args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    info!("spawning {} for {}", spec.ffmpeg.display(), spec.output.display());
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return EncodeOutcome::Failed {
                message: format!("failed to start {}: {e}", spec.ffmpeg.display()),
            };
        }
    };

    // The input duration arrives on stderr before any progress does; a side
    // thread scrapes it and keeps the last lines for failure reporting.
    let total_us = Arc::new(AtomicU64::new(0));
    let stderr_tail = Arc::new(Mutex::new(VecDeque::<String>::new()));
    let reader = child.stderr.take().map(|stream| {
        let total_us = Arc::clone(&total_us);
        let tail = Arc::clone(&stderr_tail);
        thread::spawn(move || read_stderr(stream, &total_us, &tail))
    });

    let mut last_fraction = 0.0f32;
    let raw = loop {
        if cancel.load(Ordering::Relaxed) {
            terminate(&mut child);
            break RawExit::Cancelled;
        }

        if let Some(fraction) = read_progress(progress_file.path(), total_us.load(Ordering::Relaxed))
            && fraction > last_fraction
        {
            last_fraction = fraction;
            let _ = tx.send(WorkerMessage::Progress {
                index: spec.index,
                fraction,
            });
        }

        match child.try_wait() {
            Ok(Some(status)) => break RawExit::Status(status),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                break RawExit::WaitError(e);
            }
        }
    };

    if let Some(handle) = reader {
        let _ = handle.join();
    }

    match raw {
        RawExit::Cancelled => {
            remove_output(&spec.output);
            EncodeOutcome::Cancelled
        }
        RawExit::Status(status) if status.success() => match std::fs::metadata(&spec.output) {
            Ok(meta) if meta.len() > 0 => EncodeOutcome::Succeeded {
                output_bytes: meta.len(),
            },
            _ => {
                // Exit code alone is not trusted
                remove_output(&spec.output);
                EncodeOutcome::Failed {
                    message: format!("encoder produced no output at {}", spec.output.display()),
                }
            }
        },
        RawExit::Status(status) => {
            remove_output(&spec.output);
            let tail = stderr_tail.lock().unwrap();
            let last_lines: Vec<&str> = tail.iter().rev().take(5).map(String::as_str).collect();
            let detail = last_lines.into_iter().rev().collect::<Vec<_>>().join("\n");
            let message = if detail.is_empty() {
                format!("ffmpeg exited with {status}")
            } else {
                format!("ffmpeg exited with {status}: {detail}")
            };
            EncodeOutcome::Failed { message }
        }
        RawExit::WaitError(e) => {
            remove_output(&spec.output);
            EncodeOutcome::Failed {
                message: format!("failed to wait on ffmpeg: {e}"),
            }
        }
    }
}

/// Cooperative teardown: termination signal, bounded grace, then hard kill
fn terminate(child: &mut Child) {
    signal_term(child);

    let deadline = Instant::now() + CANCEL_GRACE;
    while Instant::now() < deadline {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn signal_term(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn signal_term(child: &mut Child) {
    let _ = child.kill();
}

fn remove_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove partial output {}: {e}", output.display()),
    }
}

fn read_stderr(stream: ChildStderr, total_us: &AtomicU64, tail: &Mutex<VecDeque<String>>) {
    let reader = std::io::BufReader::new(stream);
    for line in reader.lines().map_while(|r| r.ok()) {
        if total_us.load(Ordering::Relaxed) == 0
            && let Some(us) = parse_duration_us(&line)
        {
            total_us.store(us, Ordering::Relaxed);
        }

        let mut tail = tail.lock().unwrap();
        tail.push_back(line);
        while tail.len() > STDERR_TAIL_LINES {
            tail.pop_front();
        }
    }
}

/// Read the latest `out_time_us` from the `-progress` file and turn it into
/// a capped fraction. None until the input duration is known.
fn read_progress(path: &Path, total_us: u64) -> Option<f32> {
    if total_us == 0 {
        return None;
    }

    let content = std::fs::read_to_string(path).ok()?;
    let mut latest_us: Option<u64> = None;
    for line in content.lines() {
        if let Some(value) = line.strip_prefix("out_time_us=")
            && let Ok(us) = value.trim().parse::<u64>()
        {
            latest_us = Some(us);
        }
    }

    latest_us.map(|us| ((us as f64 / total_us as f64) as f32).min(PROGRESS_CEILING))
}

/// Scrape `Duration: HH:MM:SS.ff` from an ffmpeg stderr line
fn parse_duration_us(line: &str) -> Option<u64> {
    let idx = line.find("Duration: ")?;
    let after = &line[idx + "Duration: ".len()..];
    let clock = after.split(',').next()?.trim();

    let mut parts = clock.split(':');
    let hours = parts.next()?.parse::<u64>().ok()?;
    let minutes = parts.next()?.parse::<u64>().ok()?;
    let seconds_part = parts.next()?;

    let (whole, frac) = match seconds_part.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (seconds_part, None),
    };
    let seconds = whole.parse::<u64>().ok()?;

    let mut us = (hours * 3600 + minutes * 60 + seconds) * 1_000_000;
    if let Some(frac) = frac {
        let mut digits: String = frac.chars().take(6).collect();
        while digits.len() < 6 {
            digits.push('0');
        }
        us += digits.parse::<u64>().ok()?;
    }

    Some(us)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_stderr_line() {
        let line = "  Duration: 00:00:08.05, start: 0.000000, bitrate: 123 kb/s";
        assert_eq!(parse_duration_us(line), Some(8_050_000));

        assert_eq!(parse_duration_us("Duration: 01:02:03"), Some(3_723_000_000));
        assert_eq!(parse_duration_us("frame=  100 fps= 25"), None);
    }

    #[test]
    fn progress_fraction_is_capped_below_one() {
        let dir = tempfile::tempdir().unwrap();
        let progress = dir.path().join("progress.txt");

        std::fs::write(&progress, "out_time_us=5000000\nprogress=continue\n").unwrap();
        let f = read_progress(&progress, 10_000_000).unwrap();
        assert!((f - 0.5).abs() < 1e-6);

        // Overshoot never reads as complete
        std::fs::write(&progress, "out_time_us=10000000\nprogress=continue\n").unwrap();
        assert_eq!(read_progress(&progress, 10_000_000), Some(PROGRESS_CEILING));

        // Unknown duration yields nothing
        assert_eq!(read_progress(&progress, 0), None);
    }

    #[test]
    fn progress_uses_latest_sample() {
        let dir = tempfile::tempdir().unwrap();
        let progress = dir.path().join("progress.txt");
        std::fs::write(
            &progress,
            "out_time_us=1000000\nprogress=continue\nout_time_us=2000000\nprogress=continue\n",
        )
        .unwrap();

        let f = read_progress(&progress, 10_000_000).unwrap();
        assert!((f - 0.2).abs() < 1e-6);
    }
}
