use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::LazyLock;
use uuid::Uuid;

/// Facts about a source, produced once per input selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub frame_count: u64,
    /// Absent for image sequences until combined with a frame rate
    pub duration: Option<f64>,
    pub audio_stream_count: u32,
    /// Drives the BT.601 -> BT.709 color matrix correction
    pub is_rgb: bool,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_stream_count > 0
    }
}

/// Result of numbered-image detection on an input path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub is_sequence: bool,
    /// Frame pattern (`shot_%05d.png`) for sequences, the input path otherwise
    pub pattern_path: PathBuf,
    /// Default output stem
    pub base_name: String,
    pub digits: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Idle,
    Running,
    Canceling,
    Finished,
    Failed,
    Canceled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Failed | JobState::Canceled
        )
    }
}

/// One encoder execution, owned by the job runner
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub id: Uuid,
    pub state: JobState,
    pub command: Vec<OsString>,
    pub total_frames: u64,
    pub last_frame_seen: u64,
    pub last_error: Option<String>,
}

impl EncodeJob {
    /// Create a new idle job for a compiled command
    pub fn new(command: Vec<OsString>, total_frames: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: JobState::Idle,
            command,
            total_frames,
            last_frame_seen: 0,
            last_error: None,
        }
    }

    /// Progress percentage from the last seen frame, capped at 100
    pub fn progress_pct(&self) -> f64 {
        progress_pct(self.last_frame_seen, self.total_frames)
    }
}

pub fn progress_pct(frame: u64, total_frames: u64) -> f64 {
    if total_frames == 0 {
        return 0.0;
    }
    (frame as f64 / total_frames as f64 * 100.0).min(100.0)
}

static FRAME_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"frame=\s*(\d+)").expect("frame marker regex is valid"));

/// Parser for encoder output lines.
///
/// Picks the frame number out of both the classic stats line
/// (`frame=  120 fps= 24 ...`) and `-progress` key=value lines. The frame number
/// is advisory: it is reported as seen, even when lower than a previous value.
#[derive(Debug, Default, Clone)]
pub struct ProgressParser {
    /// Last frame number seen
    pub frame: Option<u64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line; returns the frame number if the line carried one
    pub fn parse_line(&mut self, line: &str) -> Option<u64> {
        let frame = FRAME_MARKER
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok());
        if frame.is_some() {
            self.frame = frame;
        }
        frame
    }
}
