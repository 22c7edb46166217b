use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Video codec family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    H264,
    H265,
    #[value(name = "prores")]
    #[serde(rename = "prores")]
    ProRes,
}

impl Codec {
    /// ffmpeg encoder name
    pub fn encoder(self) -> &'static str {
        match self {
            Codec::H264 => "libx264",
            Codec::H265 => "libx265",
            Codec::ProRes => "prores_ks",
        }
    }

    /// Short lowercase name used in output file names
    pub fn name_tag(self) -> &'static str {
        match self {
            Codec::H264 => "x264",
            Codec::H265 => "x265",
            Codec::ProRes => "prores",
        }
    }

    pub fn container(self) -> &'static str {
        match self {
            Codec::ProRes => "mov",
            Codec::H264 | Codec::H265 => "mp4",
        }
    }

    /// Accepted range of the shared quality knob
    pub fn quality_range(self) -> (u32, u32) {
        match self {
            Codec::H264 | Codec::H265 => (1, 51),
            Codec::ProRes => (1, 32),
        }
    }
}

/// Pixel format for H.264/H.265 output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum PixelFormatChoice {
    #[default]
    #[value(name = "8bit")]
    #[serde(rename = "8bit")]
    EightBit420,
    #[value(name = "10bit")]
    #[serde(rename = "10bit")]
    TenBit420,
    #[value(name = "10bit422")]
    #[serde(rename = "10bit422")]
    TenBit422,
}

impl PixelFormatChoice {
    pub fn pix_fmt(self) -> &'static str {
        match self {
            PixelFormatChoice::EightBit420 => "yuv420p",
            PixelFormatChoice::TenBit420 => "yuv420p10",
            PixelFormatChoice::TenBit422 => "yuv422p10",
        }
    }

    /// Output name tag; empty for the 8-bit default
    pub fn name_tag(self) -> &'static str {
        match self {
            PixelFormatChoice::EightBit420 => "",
            PixelFormatChoice::TenBit420 => "10bit",
            PixelFormatChoice::TenBit422 => "10bit422",
        }
    }
}

/// prores_ks profile, in encoder index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProresProfile {
    Proxy,
    Lt,
    #[default]
    Standard,
    Hq,
    #[value(name = "4444")]
    #[serde(rename = "4444")]
    P4444,
    #[value(name = "4444hq")]
    #[serde(rename = "4444hq")]
    P4444Hq,
}

impl ProresProfile {
    pub fn index(self) -> u32 {
        match self {
            ProresProfile::Proxy => 0,
            ProresProfile::Lt => 1,
            ProresProfile::Standard => 2,
            ProresProfile::Hq => 3,
            ProresProfile::P4444 => 4,
            ProresProfile::P4444Hq => 5,
        }
    }

    /// 4444 profiles carry full chroma
    pub fn pix_fmt(self) -> &'static str {
        if self.index() >= 4 {
            "yuv444p10"
        } else {
            "yuv422p10"
        }
    }

    pub fn name_tag(self) -> &'static str {
        match self {
            ProresProfile::Proxy => "proxy",
            ProresProfile::Lt => "lt",
            ProresProfile::Standard => "standard",
            ProresProfile::Hq => "hq",
            ProresProfile::P4444 => "4444",
            ProresProfile::P4444Hq => "4444hq",
        }
    }
}

/// x264/x265 speed preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    #[default]
    Bicubic,
    Lanczos,
    Spline,
}

impl ResizeFilter {
    /// swscale flag name
    pub fn flag(self) -> &'static str {
        match self {
            ResizeFilter::Bicubic => "bicubic",
            ResizeFilter::Lanczos => "lanczos",
            ResizeFilter::Spline => "spline",
        }
    }
}

/// Target size; 0 on either axis keeps the aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub filter: ResizeFilter,
}

impl Resize {
    pub fn is_active(&self) -> bool {
        self.width > 0 || self.height > 0
    }

    /// Size prefix for output names: `WxH`, `Ww` or `Hp`
    pub fn name_tag(&self) -> Option<String> {
        match (self.width, self.height) {
            (0, 0) => None,
            (w, 0) => Some(format!("{}w", w)),
            (0, h) => Some(format!("{}p", h)),
            (w, h) => Some(format!("{}x{}", w, h)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Aac,
    Pcm16,
    Pcm24,
    Copy,
}

impl AudioCodec {
    pub fn encoder(self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Pcm16 => "pcm_s16le",
            AudioCodec::Pcm24 => "pcm_s24le",
            AudioCodec::Copy => "copy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioOptions {
    /// External audio file replacing any audio in the primary input
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub codec: AudioCodec,
    #[serde(default = "default_audio_bitrate_kbps")]
    pub bitrate_kbps: u32,
    /// Re-mux the audio stream without re-encoding or trimming
    #[serde(default)]
    pub direct_copy: bool,
}

pub(crate) fn default_audio_bitrate_kbps() -> u32 {
    192
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            source: None,
            codec: AudioCodec::default(),
            bitrate_kbps: default_audio_bitrate_kbps(),
            direct_copy: false,
        }
    }
}

impl AudioOptions {
    pub fn is_copy(&self) -> bool {
        self.direct_copy || self.codec == AudioCodec::Copy
    }
}

/// Everything the user chose for one encode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub codec: Codec,
    pub pixel_format: PixelFormatChoice,
    pub prores_profile: ProresProfile,
    pub quality: u32,
    pub preset: Preset,
    /// Only consulted for image sequences
    pub frame_rate: u32,
    pub resize: Option<Resize>,
    pub audio: AudioOptions,
    pub output_path: PathBuf,
    /// Extra encoder arguments placed right before the output path
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            codec: Codec::default(),
            pixel_format: PixelFormatChoice::default(),
            prores_profile: ProresProfile::default(),
            quality: 16,
            preset: Preset::default(),
            frame_rate: 30,
            resize: None,
            audio: AudioOptions::default(),
            output_path: PathBuf::new(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodeOptions {
    /// Pixel format handed to the encoder
    pub fn pix_fmt(&self) -> &'static str {
        match self.codec {
            Codec::ProRes => self.prores_profile.pix_fmt(),
            Codec::H264 | Codec::H265 => self.pixel_format.pix_fmt(),
        }
    }

    /// Pixel-format or profile tag for output names
    pub fn format_tag(&self) -> &'static str {
        match self.codec {
            Codec::ProRes => self.prores_profile.name_tag(),
            Codec::H264 | Codec::H265 => self.pixel_format.name_tag(),
        }
    }

    pub fn active_resize(&self) -> Option<&Resize> {
        self.resize.as_ref().filter(|r| r.is_active())
    }

    /// Parse a shell-style argument string into `extra_args`.
    /// Unbalanced quotes fall back to a plain whitespace split.
    pub fn set_extra_args(&mut self, raw: &str) {
        self.extra_args = match shlex::split(raw) {
            Some(args) => args,
            None => raw.split_whitespace().map(str::to_string).collect(),
        };
    }
}
