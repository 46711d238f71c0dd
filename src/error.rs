use std::path::PathBuf;

/// Errors surfaced by queue validation, encoder lookup and job execution.
///
/// Execution failures of a started job are stored on the job itself as a
/// message; this type covers everything reported before a job runs, plus
/// the filesystem and config errors that can occur around it.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unsupported input extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("already queued: {}", .0.display())]
    DuplicateInput(PathBuf),

    #[error("no input files provided")]
    NoInputs,

    #[error("cannot derive an output name for {}", .0.display())]
    UnnameableInput(PathBuf),

    #[error("ffmpeg not available; install ffmpeg or point TINYTHIS_FFMPEG at the binary")]
    EncoderUnavailable,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
