// Input probing using ffprobe (regular files) or a directory listing (image sequences)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use walkdir::WalkDir;

use super::core::{MediaInfo, ProbeError, frame_name_regex, has_frame_placeholder};

/// Source of [`MediaInfo`] for an input path
pub trait Prober {
    fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

/// Prober backed by the ffprobe binary
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Prober for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        if has_frame_placeholder(path) {
            return probe_sequence(path);
        }

        debug!(path = %path.display(), "probing with ffprobe");
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ProbeError::Spawn {
                tool: self.ffprobe.display().to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    pix_fmt: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStreams {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

/// Turn `ffprobe -show_streams` JSON into [`MediaInfo`].
///
/// With several video streams the last one wins.
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, ProbeError> {
    let probe: FfprobeStreams =
        serde_json::from_str(json).map_err(|e| ProbeError::InvalidJson(e.to_string()))?;

    if probe.streams.is_empty() {
        return Err(ProbeError::NoStreams);
    }

    let mut video: Option<(u64, f64, bool)> = None;
    let mut audio_stream_count = 0;

    for stream in &probe.streams {
        match stream.codec_type.as_deref() {
            Some("video") => {
                let pix_fmt = stream
                    .pix_fmt
                    .as_deref()
                    .ok_or(ProbeError::MissingField("pix_fmt"))?;
                let frame_count = parse_field::<u64>("nb_frames", stream.nb_frames.as_deref())?;
                let duration = parse_field::<f64>("duration", stream.duration.as_deref())?;
                if !(duration.is_finite() && duration > 0.0) {
                    return Err(ProbeError::InvalidField {
                        field: "duration",
                        value: duration.to_string(),
                    });
                }
                video = Some((frame_count, duration, is_rgb_pix_fmt(pix_fmt)));
            }
            Some("audio") => audio_stream_count += 1,
            _ => {}
        }
    }

    let (frame_count, duration, is_rgb) = video.ok_or(ProbeError::NoVideoStream)?;
    Ok(MediaInfo {
        frame_count,
        duration: Some(duration),
        audio_stream_count,
        is_rgb,
    })
}

fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    value: Option<&str>,
) -> Result<T, ProbeError> {
    let value = value.ok_or(ProbeError::MissingField(field))?;
    value.trim().parse::<T>().map_err(|_| ProbeError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// RGB-family pixel formats (rgb24, rgb48le, gbrp, gbrp10le, ...)
pub fn is_rgb_pix_fmt(pix_fmt: &str) -> bool {
    pix_fmt.starts_with("rgb") || pix_fmt.starts_with("gbrp")
}

/// Count the frames on disk for a `%0Nd` pattern.
/// Image sequences are always treated as RGB with no intrinsic duration.
pub fn probe_sequence(pattern: &Path) -> Result<MediaInfo, ProbeError> {
    let dir = match pattern.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = pattern
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let matcher = frame_name_regex(&file_name).ok_or_else(|| ProbeError::EmptySequence {
        pattern: pattern.to_path_buf(),
    })?;

    let mut frame_count = 0u64;
    let walker = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);
    for entry in walker {
        let entry = entry.map_err(|e| ProbeError::Listing {
            dir: dir.clone(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && matcher.is_match(&entry.file_name().to_string_lossy())
        {
            frame_count += 1;
        }
    }

    debug!(pattern = %pattern.display(), frame_count, "counted sequence frames");

    if frame_count == 0 {
        return Err(ProbeError::EmptySequence {
            pattern: pattern.to_path_buf(),
        });
    }

    Ok(MediaInfo {
        frame_count,
        duration: None,
        audio_stream_count: 0,
        is_rgb: true,
    })
}
