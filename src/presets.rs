/// The three fixed quality/size tradeoffs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    /// Slowest encode, best perceptual fidelity
    Quality,
    /// The midpoint default
    #[default]
    Balanced,
    /// Fastest encode, smallest output
    Speed,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Quality => "quality",
            Preset::Balanced => "balanced",
            Preset::Speed => "speed",
        }
    }

    /// Parse a preset name, case-insensitively
    pub fn from_name(name: &str) -> Option<Preset> {
        match name.to_ascii_lowercase().as_str() {
            "quality" => Some(Preset::Quality),
            "balanced" => Some(Preset::Balanced),
            "speed" => Some(Preset::Speed),
            _ => None,
        }
    }

    /// Cycle order: quality -> balanced -> speed -> quality
    pub fn next(&self) -> Preset {
        match self {
            Preset::Quality => Preset::Balanced,
            Preset::Balanced => Preset::Speed,
            Preset::Speed => Preset::Quality,
        }
    }

    pub fn prev(&self) -> Preset {
        match self {
            Preset::Quality => Preset::Speed,
            Preset::Balanced => Preset::Quality,
            Preset::Speed => Preset::Balanced,
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which encode path ffmpeg takes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Accel {
    /// Software encode (libx264)
    #[default]
    Cpu,
    /// Hardware encode (NVENC)
    Gpu,
}

impl Accel {
    pub fn toggled(&self) -> Accel {
        match self {
            Accel::Cpu => Accel::Gpu,
            Accel::Gpu => Accel::Cpu,
        }
    }

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Accel::Cpu => "CPU",
            Accel::Gpu => "GPU",
        }
    }
}

/// Output container for every preset
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Video codec arguments for a (preset, accel) pair.
///
/// Total over the 3x2 space. The CPU and GPU variants of a preset sit on
/// the same quality tier; only the code path differs.
pub fn video_args(preset: Preset, accel: Accel) -> Vec<String> {
    let args: &[&str] = match (preset, accel) {
        (Preset::Quality, Accel::Cpu) => &["-c:v", "libx264", "-preset", "slow", "-crf", "18"],
        (Preset::Balanced, Accel::Cpu) => &["-c:v", "libx264", "-preset", "medium", "-crf", "23"],
        (Preset::Speed, Accel::Cpu) => &["-c:v", "libx264", "-preset", "veryfast", "-crf", "28"],
        (Preset::Quality, Accel::Gpu) => {
            &["-c:v", "h264_nvenc", "-preset", "p7", "-cq", "18", "-tune", "hq"]
        }
        (Preset::Balanced, Accel::Gpu) => {
            &["-c:v", "h264_nvenc", "-preset", "p5", "-cq", "23", "-tune", "hq"]
        }
        (Preset::Speed, Accel::Gpu) => {
            &["-c:v", "h264_nvenc", "-preset", "p3", "-cq", "28", "-tune", "hq"]
        }
    };
    args.iter().map(|s| s.to_string()).collect()
}

/// AAC bitrate for the audio track
pub fn audio_bitrate(preset: Preset) -> &'static str {
    match preset {
        Preset::Quality => "160k",
        Preset::Balanced => "128k",
        Preset::Speed => "96k",
    }
}
