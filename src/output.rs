use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::presets::{OUTPUT_EXTENSION, Preset};

/// Derive a non-colliding output path for an input file and preset.
///
/// Candidate is `<dir>/<stem>.tinythis.<preset>.mp4`; on collision a
/// numeric suffix is inserted before the extension (`.2`, `.3`, ...) until
/// a free name is found. Checked against the live filesystem, so callers
/// resolve at job start rather than at enqueue time.
pub fn resolve_output_path(input: &Path, preset: Preset) -> Result<PathBuf> {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .ok_or_else(|| AppError::UnnameableInput(input.to_path_buf()))?;

    let base = format!("{}.tinythis.{}", stem.to_string_lossy(), preset.as_str());

    let candidate = parent.join(format!("{base}.{OUTPUT_EXTENSION}"));
    if !candidate.exists() {
        return Ok(candidate);
    }

    for n in 2u32.. {
        let candidate = parent.join(format!("{base}.{n}.{OUTPUT_EXTENSION}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    unreachable!("loop returns on the first free name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::Preset;

    #[test]
    fn first_resolution_uses_plain_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"x").unwrap();

        let out = resolve_output_path(&input, Preset::Balanced).unwrap();
        assert_eq!(out, dir.path().join("clip.tinythis.balanced.mp4"));
        // Same filesystem state, same answer
        assert_eq!(out, resolve_output_path(&input, Preset::Balanced).unwrap());
    }

    #[test]
    fn collisions_increment_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"x").unwrap();
        std::fs::write(dir.path().join("clip.tinythis.speed.mp4"), b"x").unwrap();

        let out = resolve_output_path(&input, Preset::Speed).unwrap();
        assert_eq!(out, dir.path().join("clip.tinythis.speed.2.mp4"));

        std::fs::write(&out, b"x").unwrap();
        let next = resolve_output_path(&input, Preset::Speed).unwrap();
        assert_eq!(next, dir.path().join("clip.tinythis.speed.3.mp4"));
    }

    #[test]
    fn presets_resolve_independently() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mov");
        std::fs::write(&input, b"x").unwrap();
        std::fs::write(dir.path().join("clip.tinythis.quality.mp4"), b"x").unwrap();

        let balanced = resolve_output_path(&input, Preset::Balanced).unwrap();
        assert_eq!(balanced, dir.path().join("clip.tinythis.balanced.mp4"));
    }
}
