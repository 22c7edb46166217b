use super::error::CompileError;
use super::options::{AudioCodec, Codec, EncodeOptions};
use super::types::{MediaInfo, SequenceInfo};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Color tagging applied to every output
const OUTPUT_COLOR: &str = "bt709";
/// Matrix assumed for RGB-origin sources before conversion
const RGB_SOURCE_MATRIX: &str = "bt601";
/// QuickTime vendor tag for ProRes compatibility
const PRORES_VENDOR: &str = "apl0";

/// A compiled encoder invocation: the ordered argument list plus the facts the
/// job runner needs to report progress
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    pub args: Vec<OsString>,
    pub total_frames: u64,
    pub duration_s: Option<f64>,
    pub output_path: PathBuf,
}

impl EncodePlan {
    /// Wrap an already-built argument list
    pub fn from_args<I, S>(args: I, total_frames: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            total_frames,
            duration_s: None,
            output_path: PathBuf::new(),
        }
    }

    /// Build the process command; no shell is involved
    pub fn to_command(&self, program: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.args);
        cmd
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-quoted rendering for display and logs
    pub fn format_command(&self, program: &Path) -> String {
        std::iter::once(program.to_string_lossy().into_owned())
            .chain(self.args_lossy())
            .map(|arg| match shlex::try_quote(&arg) {
                Ok(quoted) => quoted.into_owned(),
                Err(_) => arg,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Small builder so argument assembly reads like `Command::arg` chains
#[derive(Default)]
struct ArgList(Vec<OsString>);

impl ArgList {
    fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.0.push(arg.as_ref().to_os_string());
        self
    }
}

/// Where the audio stream of the output comes from
enum AudioSource<'a> {
    None,
    Primary,
    External(&'a Path),
}

/// Duration of the video that will be produced
fn video_duration(
    options: &EncodeOptions,
    media: &MediaInfo,
    sequence: &SequenceInfo,
) -> Option<f64> {
    if sequence.is_sequence {
        (options.frame_rate > 0).then(|| media.frame_count as f64 / options.frame_rate as f64)
    } else {
        media.duration
    }
}

fn validate(
    options: &EncodeOptions,
    sequence: &SequenceInfo,
    audio: &AudioSource<'_>,
) -> Result<(), CompileError> {
    let (min, max) = options.codec.quality_range();
    if options.quality < min || options.quality > max {
        return Err(CompileError::QualityOutOfRange {
            codec: options.codec.encoder(),
            quality: options.quality,
            min,
            max,
        });
    }
    if sequence.is_sequence && options.frame_rate == 0 {
        return Err(CompileError::InvalidFrameRate);
    }
    // Only AAC consumes the bitrate
    if !matches!(audio, AudioSource::None)
        && !options.audio.is_copy()
        && options.audio.codec == AudioCodec::Aac
        && options.audio.bitrate_kbps == 0
    {
        return Err(CompileError::InvalidAudioBitrate);
    }
    if options.output_path.as_os_str().is_empty() {
        return Err(CompileError::MissingOutput);
    }
    if options.output_path == sequence.pattern_path
        || options.audio.source.as_deref() == Some(options.output_path.as_path())
    {
        return Err(CompileError::OutputIsInput(options.output_path.clone()));
    }
    Ok(())
}

/// Video filter chain: color matrix correction and/or resize, as one scale step
fn video_filter(options: &EncodeOptions, media: &MediaInfo) -> Option<String> {
    let color = format!(
        "in_color_matrix={}:out_color_matrix={}",
        RGB_SOURCE_MATRIX, OUTPUT_COLOR
    );

    match options.active_resize() {
        Some(resize) => {
            let width = if resize.width > 0 { resize.width as i64 } else { -1 };
            let height = if resize.height > 0 { resize.height as i64 } else { -1 };
            let mut filter = format!(
                "scale={}:{}:flags={}",
                width,
                height,
                resize.filter.flag()
            );
            if media.is_rgb {
                filter.push(':');
                filter.push_str(&color);
            }
            Some(filter)
        }
        None if media.is_rgb => Some(format!("scale={}", color)),
        None => None,
    }
}

fn apply_video_codec(args: &mut ArgList, options: &EncodeOptions) {
    match options.codec {
        Codec::H264 | Codec::H265 => {
            args.arg("-c:v").arg(options.codec.encoder());
            args.arg("-crf").arg(options.quality.to_string());
            args.arg("-preset").arg(options.preset.as_str());
            args.arg("-pix_fmt").arg(options.pix_fmt());
            args.arg("-movflags").arg("+faststart");
        }
        Codec::ProRes => {
            args.arg("-c:v").arg(options.codec.encoder());
            args.arg("-q:v").arg(options.quality.to_string());
            args.arg("-profile:v")
                .arg(options.prores_profile.index().to_string());
            args.arg("-pix_fmt").arg(options.pix_fmt());
            args.arg("-vendor").arg(PRORES_VENDOR);
        }
    }

    args.arg("-colorspace").arg(OUTPUT_COLOR);
    args.arg("-color_trc").arg(OUTPUT_COLOR);
    args.arg("-color_primaries").arg(OUTPUT_COLOR);
}

fn apply_audio_codec(args: &mut ArgList, options: &EncodeOptions) {
    if options.audio.is_copy() {
        args.arg("-c:a").arg("copy");
        return;
    }

    args.arg("-c:a").arg(options.audio.codec.encoder());
    if options.audio.codec == AudioCodec::Aac {
        args.arg("-b:a")
            .arg(format!("{}k", options.audio.bitrate_kbps));
    }
}

/// Compile encode options plus probed source facts into an ffmpeg argument list.
///
/// Pure: the same inputs always produce the same plan. Missing input and probe
/// failures are the caller's to reject before getting here.
pub fn compile(
    options: &EncodeOptions,
    media: &MediaInfo,
    sequence: &SequenceInfo,
) -> Result<EncodePlan, CompileError> {
    let audio = match options.audio.source.as_deref() {
        Some(source) => AudioSource::External(source),
        None if !sequence.is_sequence && media.has_audio() => AudioSource::Primary,
        None => AudioSource::None,
    };
    validate(options, sequence, &audio)?;

    let duration = video_duration(options, media, sequence);
    let mut args = ArgList::default();
    args.arg("-hide_banner");

    // Input stage
    if sequence.is_sequence {
        args.arg("-f").arg("image2");
        args.arg("-framerate").arg(options.frame_rate.to_string());
    }
    args.arg("-i").arg(&sequence.pattern_path);
    if let AudioSource::External(source) = audio {
        args.arg("-i").arg(source);
    }

    // Progress output (structured key=value to stdout)
    args.arg("-progress").arg("-").arg("-nostats");

    // Exactly one video and at most one audio output stream
    args.arg("-map").arg("0:v:0");
    match audio {
        AudioSource::Primary => {
            args.arg("-map").arg("0:a:0");
        }
        AudioSource::External(_) => {
            args.arg("-map").arg("1:a:0");
        }
        AudioSource::None => {}
    }

    if let Some(filter) = video_filter(options, media) {
        args.arg("-vf").arg(filter);
    }

    // External audio is cut to the video length unless stream-copied
    if matches!(audio, AudioSource::External(_)) && !options.audio.is_copy() {
        let duration = duration.ok_or(CompileError::UnknownDuration)?;
        args.arg("-af").arg(format!("atrim=duration={}", duration));
    }

    apply_video_codec(&mut args, options);

    if !matches!(audio, AudioSource::None) {
        apply_audio_codec(&mut args, options);
    }

    for extra in &options.extra_args {
        args.arg(extra);
    }

    args.arg("-y");
    args.arg(&options.output_path);

    Ok(EncodePlan {
        args: args.0,
        total_frames: media.frame_count,
        duration_s: duration,
        output_path: options.output_path.clone(),
    })
}

/// Default output file name, e.g. `clip_1920w_x265_10bit_q16.mp4`.
///
/// Recompute whenever codec, pixel format, profile, resize or quality change.
pub fn derive_output_name(options: &EncodeOptions, sequence: &SequenceInfo) -> String {
    let mut name = sequence.base_name.clone();

    if let Some(size) = options.active_resize().and_then(|r| r.name_tag()) {
        name.push('_');
        name.push_str(&size);
    }

    name.push('_');
    name.push_str(options.codec.name_tag());

    let tag = options.format_tag();
    if !tag.is_empty() {
        name.push('_');
        name.push_str(tag);
    }

    format!("{}_q{}.{}", name, options.quality, options.codec.container())
}

/// Default output path inside `output_dir`
pub fn derive_output_path(
    options: &EncodeOptions,
    sequence: &SequenceInfo,
    output_dir: &Path,
) -> PathBuf {
    output_dir.join(derive_output_name(options, sequence))
}
