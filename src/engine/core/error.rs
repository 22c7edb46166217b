use std::path::PathBuf;
use thiserror::Error;

/// Source media could not be inspected. Blocks job start until another input is chosen.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("failed to run {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error("ffprobe failed for {path}: {stderr}")]
    ToolFailed { path: PathBuf, stderr: String },

    #[error("failed to parse ffprobe JSON: {0}")]
    InvalidJson(String),

    #[error("no streams found")]
    NoStreams,

    #[error("no video stream found")]
    NoVideoStream,

    #[error("video stream is missing '{0}'")]
    MissingField(&'static str),

    #[error("video stream field '{field}' has unusable value {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("no frames match sequence pattern {}", pattern.display())]
    EmptySequence { pattern: PathBuf },

    #[error("failed to list sequence directory {}: {message}", dir.display())]
    Listing { dir: PathBuf, message: String },
}

/// Options that cannot be turned into a command line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("quality {quality} is outside {min}..={max} for {codec}")]
    QualityOutOfRange {
        codec: &'static str,
        quality: u32,
        min: u32,
        max: u32,
    },

    #[error("frame rate must be positive for image sequences")]
    InvalidFrameRate,

    #[error("AAC audio requires a bitrate above 0 kbps")]
    InvalidAudioBitrate,

    #[error("source duration is unknown; cannot trim external audio")]
    UnknownDuration,

    #[error("no output path given")]
    MissingOutput,

    #[error("output path {} is the same as the input", .0.display())]
    OutputIsInput(PathBuf),
}
