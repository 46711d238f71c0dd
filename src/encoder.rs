use std::ffi::OsString;
use std::path::Path;

use crate::presets::{self, Accel, Preset};

/// Build the full ffmpeg argument list for one job.
///
/// The worker appends `-progress <file>` before spawning; everything else
/// about the invocation is decided here.
pub fn build_ffmpeg_args(input: &Path, output: &Path, preset: Preset, accel: Accel) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-nostats".into(),
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "0:a?".into(),
    ];

    args.extend(presets::video_args(preset, accel).into_iter().map(OsString::from));

    // Broadly compatible pixel format, and moov atom up front for streaming
    args.extend(["-pix_fmt".into(), "yuv420p".into()]);
    args.extend(["-movflags".into(), "+faststart".into()]);

    args.extend([
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        presets::audio_bitrate(preset).into(),
    ]);

    args.push(output.as_os_str().to_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn input_precedes_output_and_codec_matches_accel() {
        let input = PathBuf::from("/videos/a.mp4");
        let output = PathBuf::from("/videos/a.tinythis.balanced.mp4");
        let args = build_ffmpeg_args(&input, &output, Preset::Balanced, Accel::Cpu);

        let pos_in = args.iter().position(|a| a == input.as_os_str()).unwrap();
        let pos_out = args.iter().position(|a| a == output.as_os_str()).unwrap();
        assert!(pos_in < pos_out);
        assert_eq!(pos_out, args.len() - 1);
        assert!(args.contains(&OsString::from("libx264")));

        let gpu = build_ffmpeg_args(&input, &output, Preset::Balanced, Accel::Gpu);
        assert!(gpu.contains(&OsString::from("h264_nvenc")));
    }

    #[test]
    fn audio_bitrate_follows_preset() {
        let input = PathBuf::from("a.mov");
        let output = PathBuf::from("a.tinythis.speed.mp4");
        let args = build_ffmpeg_args(&input, &output, Preset::Speed, Accel::Cpu);
        let pos = args.iter().position(|a| a == "-b:a").unwrap();
        assert_eq!(args[pos + 1], OsString::from("96k"));
    }
}
