use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::config::Config;
use crate::locate;
use crate::presets::{Accel, Preset};
use crate::queue::{JobQueue, JobStatus};

#[derive(Parser)]
#[command(name = "tinythis")]
#[command(version, about = "Preset-driven video compression front-end for ffmpeg")]
pub struct Cli {
    /// Optional preset (quality, balanced, speed) followed by video files.
    /// Without arguments the interactive session starts instead.
    #[arg(value_name = "[PRESET] FILE...")]
    pub args: Vec<String>,
}

/// Non-interactive run. Returns the process exit code: 0 only if every
/// job succeeded.
pub fn run(cli: Cli) -> i32 {
    let (preset, files) = split_preset(&cli.args);

    if files.is_empty() {
        eprintln!("tinythis: {}", crate::error::AppError::NoInputs);
        eprintln!("usage: tinythis [quality|balanced|speed] <video>...");
        return 2;
    }

    let config = Config::load();
    let accel = if config.use_gpu { Accel::Gpu } else { Accel::Cpu };

    // Same validation path as the interactive session, but any bad path
    // rejects the whole invocation up front.
    let mut queue = JobQueue::new();
    for file in files {
        if let Err(e) = queue.enqueue(PathBuf::from(file), preset, accel) {
            eprintln!("tinythis: {e}");
            return 2;
        }
    }

    info!("cli run: {} file(s), preset {preset}", queue.len());
    drive(&mut queue, locate::find_ffmpeg().as_deref())
}

/// The first argument is a preset iff it names one; a file that happens to
/// be called `balanced` can still be passed as `./balanced`.
fn split_preset(args: &[String]) -> (Preset, &[String]) {
    match args.first().and_then(|a| Preset::from_name(a)) {
        Some(preset) => (preset, &args[1..]),
        None => (Preset::default(), args),
    }
}

/// Drain the queue to completion, reporting per-job progress inline
fn drive(queue: &mut JobQueue, ffmpeg: Option<&Path>) -> i32 {
    loop {
        match queue.run_next(ffmpeg) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                eprintln!("tinythis: {e}");
                return 1;
            }
        }

        let Some(index) = queue.running_index() else {
            break;
        };
        let name = queue.jobs()[index].filename();

        let mut last_percent = -1i32;
        while !queue.jobs()[index].status.is_terminal() {
            queue.wait_message(Duration::from_millis(200));
            if let JobStatus::Running { progress } = queue.jobs()[index].status {
                let percent = (progress * 100.0) as i32;
                if percent > last_percent {
                    last_percent = percent;
                    print!("\r{name}: {percent}%");
                    let _ = std::io::stdout().flush();
                }
            }
        }

        let job = &queue.jobs()[index];
        match &job.status {
            JobStatus::Succeeded => {
                let saved = job
                    .size_reduction()
                    .map(|(bytes, percent)| {
                        format!(
                            " (saved {}, -{percent:.0}%)",
                            humansize::format_size(bytes, humansize::DECIMAL)
                        )
                    })
                    .unwrap_or_default();
                let output = job
                    .output_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("\r{name}: done -> {output}{saved}");
            }
            JobStatus::Failed { message } => println!("\r{name}: failed: {message}"),
            JobStatus::Cancelled => println!("\r{name}: cancelled"),
            _ => {}
        }
    }

    let summary = queue.summary();
    println!(
        "{} succeeded, {} failed, {} cancelled",
        summary.succeeded, summary.failed, summary.cancelled
    );

    if summary.failed == 0 && summary.cancelled == 0 {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_argument_is_peeled_only_when_it_names_a_preset() {
        let args = strings(&["speed", "a.mp4", "b.mov"]);
        let (preset, files) = split_preset(&args);
        assert_eq!(preset, Preset::Speed);
        assert_eq!(files, &args[1..]);

        let args = strings(&["a.mp4", "b.mov"]);
        let (preset, files) = split_preset(&args);
        assert_eq!(preset, Preset::Balanced);
        assert_eq!(files.len(), 2);

        // An explicit path shields a file named after a preset
        let args = strings(&["./balanced"]);
        let (preset, files) = split_preset(&args);
        assert_eq!(preset, Preset::Balanced);
        assert_eq!(files, &args[..]);
    }

    #[cfg(unix)]
    mod stub {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn touch(dir: &Path, name: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, b"source data").unwrap();
            path
        }

        fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\nfor out; do :; done\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn all_successes_exit_zero() {
            let dir = tempfile::tempdir().unwrap();
            let a = touch(dir.path(), "a.mp4");
            let b = touch(dir.path(), "b.mov");
            let stub = write_stub(dir.path(), "ffmpeg-ok", "echo data > \"$out\"");

            let mut queue = JobQueue::new();
            queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
            queue.enqueue(b, Preset::Balanced, Accel::Cpu).unwrap();

            assert_eq!(drive(&mut queue, Some(&stub)), 0);
            assert!(dir.path().join("a.tinythis.balanced.mp4").is_file());
            assert!(dir.path().join("b.tinythis.balanced.mp4").is_file());
        }

        #[test]
        fn any_failure_exits_nonzero() {
            let dir = tempfile::tempdir().unwrap();
            let a = touch(dir.path(), "a.mp4");
            let b = touch(dir.path(), "b.mp4");
            let stub = write_stub(
                dir.path(),
                "ffmpeg-flaky",
                "case \"$out\" in *a.tinythis*) echo data > \"$out\";; *) exit 1;; esac",
            );

            let mut queue = JobQueue::new();
            queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();
            queue.enqueue(b, Preset::Balanced, Accel::Cpu).unwrap();

            assert_eq!(drive(&mut queue, Some(&stub)), 1);
            let summary = queue.summary();
            assert_eq!(summary.succeeded, 1);
            assert_eq!(summary.failed, 1);
        }

        #[test]
        fn missing_encoder_exits_nonzero_without_starting() {
            let dir = tempfile::tempdir().unwrap();
            let a = touch(dir.path(), "a.mp4");

            let mut queue = JobQueue::new();
            queue.enqueue(a, Preset::Balanced, Accel::Cpu).unwrap();

            assert_eq!(drive(&mut queue, None), 1);
            assert_eq!(queue.jobs()[0].status, JobStatus::Pending);
        }
    }
}
