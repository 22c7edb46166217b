use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use triada::config::DefaultsConfig;
use triada::engine::{
    AudioCodec, Codec, EncodeOptions, PixelFormatChoice, Preset, ProresProfile, Resize,
    ResizeFilter,
};

#[derive(Parser)]
#[command(name = "triada")]
#[command(
    about = "Encode a video or numbered image sequence with ffmpeg (x264, x265, ProRes)",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug detail to stderr (overrides config)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors (overrides config)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check if ffmpeg and ffprobe are installed
    CheckFfmpeg,

    /// Probe an input (video file or image sequence frame) and show what was found
    Probe {
        /// Video file, or any frame of a numbered image sequence
        file: PathBuf,

        /// Print the probe result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the ffmpeg command without executing it
    DryRun(EncodeArgs),

    /// Run the encode, showing progress. Type q then Enter to stop.
    Encode(EncodeArgs),

    /// Show config status and location, or create default config if missing
    InitConfig,
}

/// Encoding settings; anything not given falls back to the config defaults
#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Video file, or any frame of a numbered image sequence (shot_00001.png)
    pub input: PathBuf,

    /// External audio file replacing the input's audio
    #[arg(long, value_name = "FILE")]
    pub audio: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub codec: Option<Codec>,

    /// Pixel format for x264/x265
    #[arg(long = "pix-fmt", value_enum)]
    pub pixel_format: Option<PixelFormatChoice>,

    #[arg(long, value_enum)]
    pub prores_profile: Option<ProresProfile>,

    /// CRF for x264/x265 (1-51), q:v for ProRes (1-32); lower is better
    #[arg(long)]
    pub quality: Option<u32>,

    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Frame rate for image sequences
    #[arg(long)]
    pub frame_rate: Option<u32>,

    /// Target width (0 or unset keeps the aspect ratio)
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height (0 or unset keeps the aspect ratio)
    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long, value_enum)]
    pub resize_filter: Option<ResizeFilter>,

    #[arg(long, value_enum)]
    pub audio_codec: Option<AudioCodec>,

    /// AAC bitrate in kbps
    #[arg(long, value_name = "KBPS")]
    pub audio_bitrate: Option<u32>,

    /// Copy the audio stream as-is (no re-encode, no trim)
    #[arg(long)]
    pub audio_copy: bool,

    /// Output file (defaults to a name derived from the settings)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the derived output name (overrides config)
    #[arg(long, conflicts_with = "output")]
    pub output_dir: Option<PathBuf>,

    /// Extra ffmpeg arguments, placed before the output path
    #[arg(long, allow_hyphen_values = true, value_name = "ARGS")]
    pub extra_args: Option<String>,
}

impl EncodeArgs {
    /// Config defaults with the command-line overrides applied.
    /// The output path is left for the caller to resolve.
    pub fn to_options(&self, defaults: &DefaultsConfig) -> EncodeOptions {
        let mut options = defaults.encode_options();

        if let Some(codec) = self.codec {
            options.codec = codec;
        }
        if let Some(pixel_format) = self.pixel_format {
            options.pixel_format = pixel_format;
        }
        if let Some(profile) = self.prores_profile {
            options.prores_profile = profile;
        }
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        if let Some(preset) = self.preset {
            options.preset = preset;
        }
        if let Some(frame_rate) = self.frame_rate {
            options.frame_rate = frame_rate;
        }

        let resize = Resize {
            width: self.width.unwrap_or(0),
            height: self.height.unwrap_or(0),
            filter: self.resize_filter.unwrap_or(defaults.resize_filter),
        };
        options.resize = resize.is_active().then_some(resize);

        options.audio.source = self.audio.clone();
        if let Some(codec) = self.audio_codec {
            options.audio.codec = codec;
        }
        if let Some(bitrate) = self.audio_bitrate {
            options.audio.bitrate_kbps = bitrate;
        }
        options.audio.direct_copy = self.audio_copy;

        if let Some(output) = &self.output {
            options.output_path = output.clone();
        }
        if let Some(extra) = &self.extra_args {
            options.set_extra_args(extra);
        }

        options
    }

    /// Where a derived output name goes
    pub fn output_dir(&self, defaults: &DefaultsConfig) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| defaults.output_dir())
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
