// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{
    AudioCodec, AudioOptions, Codec, EncodeOptions, PixelFormatChoice, Preset, ProresProfile,
    ResizeFilter, RunnerConfig, StopStrategy,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// ffmpeg binary (name looked up in PATH, or a full path)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// How a running encode is asked to stop: keystroke, interrupt or kill
    #[serde(default)]
    pub stop_strategy: StopStrategy,

    /// Seconds to wait after a stop request before killing the encoder.
    /// Unset waits for the encoder to exit on its own.
    #[serde(default)]
    pub stop_grace_secs: Option<u64>,

    /// Fail any encode that runs longer than this
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub codec: Codec,

    #[serde(default)]
    pub pixel_format: PixelFormatChoice,

    #[serde(default)]
    pub prores_profile: ProresProfile,

    /// CRF for x264/x265, q:v for ProRes (lower is better)
    #[serde(default = "default_quality")]
    pub quality: u32,

    #[serde(default)]
    pub preset: Preset,

    /// Frame rate assumed for image sequences
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default)]
    pub resize_filter: ResizeFilter,

    #[serde(default)]
    pub audio_codec: AudioCodec,

    #[serde(default = "default_audio_bitrate_kbps")]
    pub audio_bitrate_kbps: u32,

    /// Where default output names are placed (Documents folder when unset)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append encoder commands and failure output to triada.log
    #[serde(default)]
    pub debug_log: bool,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_quality() -> u32 {
    16
}

fn default_frame_rate() -> u32 {
    30
}

fn default_audio_bitrate_kbps() -> u32 {
    192
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            stop_strategy: StopStrategy::default(),
            stop_grace_secs: None,
            timeout_secs: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            codec: Codec::default(),
            pixel_format: PixelFormatChoice::default(),
            prores_profile: ProresProfile::default(),
            quality: default_quality(),
            preset: Preset::default(),
            frame_rate: default_frame_rate(),
            resize_filter: ResizeFilter::default(),
            audio_codec: AudioCodec::default(),
            audio_bitrate_kbps: default_audio_bitrate_kbps(),
            output_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            debug_log: false,
        }
    }
}

impl EncoderConfig {
    /// Job runner settings for this encoder
    pub fn runner_config(&self, debug_log: Option<PathBuf>) -> RunnerConfig {
        RunnerConfig {
            program: self.ffmpeg_path.clone(),
            stop_strategy: self.stop_strategy,
            stop_grace: self.stop_grace_secs.map(Duration::from_secs),
            timeout: self.timeout_secs.map(Duration::from_secs),
            debug_log,
        }
    }
}

impl DefaultsConfig {
    /// Starting point for an encode before command-line overrides
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            codec: self.codec,
            pixel_format: self.pixel_format,
            prores_profile: self.prores_profile,
            quality: self.quality,
            preset: self.preset,
            frame_rate: self.frame_rate,
            resize: None,
            audio: AudioOptions {
                codec: self.audio_codec,
                bitrate_kbps: self.audio_bitrate_kbps,
                ..AudioOptions::default()
            },
            ..EncodeOptions::default()
        }
    }

    /// Configured output directory, else Documents, else the current directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::document_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("triada")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("triada")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_at(&Self::config_path()?)
    }

    /// Load `path`, writing a default config there first if it is missing
    pub fn load_at(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }

        let config = Config::default();

        // A read-only config directory is not fatal
        if let Err(e) = config.save_to(path) {
            tracing::warn!(
                error = %format!("{:#}", e),
                "could not create default config file; using built-in defaults \
                 (run 'triada init-config' to create one)"
            );
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }
}
