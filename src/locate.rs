use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Find a usable ffmpeg executable.
///
/// The only fact the rest of the program needs from the install/update
/// machinery is "is an encoder available, and where". Lookup order:
/// `TINYTHIS_FFMPEG` override, an ffmpeg binary next to our own
/// executable, then whatever `ffmpeg` resolves to on PATH. An explicit
/// override is authoritative: if it points nowhere, no fallback is tried.
pub fn find_ffmpeg() -> Option<PathBuf> {
    if let Some(overridden) = std::env::var_os("TINYTHIS_FFMPEG") {
        let path = PathBuf::from(overridden);
        if path.is_file() {
            debug!("using ffmpeg from TINYTHIS_FFMPEG: {}", path.display());
            return Some(path);
        }
        warn!("TINYTHIS_FFMPEG is not a file: {}", path.display());
        return None;
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let sibling = dir.join(ffmpeg_binary_name());
        if sibling.is_file() {
            debug!("using ffmpeg next to executable: {}", sibling.display());
            return Some(sibling);
        }
    }

    if probe_command("ffmpeg") {
        debug!("using ffmpeg from PATH");
        return Some(PathBuf::from("ffmpeg"));
    }

    None
}

fn ffmpeg_binary_name() -> &'static str {
    if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" }
}

/// Check that a command exists and runs
fn probe_command(cmd: &str) -> bool {
    Command::new(cmd)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}
