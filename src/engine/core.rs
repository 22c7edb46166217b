mod error;
mod ffmpeg_cmd;
mod ffmpeg_info;
mod log;
mod options;
mod sequence;
mod types;

pub use error::{CompileError, ProbeError};
pub use ffmpeg_cmd::{EncodePlan, compile, derive_output_name, derive_output_path};
pub use ffmpeg_info::{ffmpeg_version, ffprobe_version};
pub use log::{default_log_path, write_debug_log};
pub use options::{
    AudioCodec, AudioOptions, Codec, EncodeOptions, PixelFormatChoice, Preset, ProresProfile,
    Resize, ResizeFilter,
};
pub use sequence::{detect, frame_name_regex, has_frame_placeholder};
pub use types::{EncodeJob, JobState, MediaInfo, ProgressParser, SequenceInfo, progress_pct};
