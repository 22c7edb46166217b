#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Duration;
use triada::engine::{
    EncodeOptions, EncodePlan, JobEvent, MediaInfo, ProbeError, Prober, SequenceInfo, compile,
    detect,
};

/// Probed facts for a regular YUV video file
pub fn yuv_clip(frames: u64, seconds: f64, audio_streams: u32) -> MediaInfo {
    MediaInfo {
        frame_count: frames,
        duration: Some(seconds),
        audio_stream_count: audio_streams,
        is_rgb: false,
    }
}

/// Probed facts for an image sequence
pub fn rgb_sequence(frames: u64) -> MediaInfo {
    MediaInfo {
        frame_count: frames,
        duration: None,
        audio_stream_count: 0,
        is_rgb: true,
    }
}

pub fn options_to(output: &str) -> EncodeOptions {
    EncodeOptions {
        output_path: PathBuf::from(output),
        ..EncodeOptions::default()
    }
}

/// Detect `input`, compile, and return the args as strings
pub fn compile_args(input: &str, options: &EncodeOptions, media: &MediaInfo) -> Vec<String> {
    let sequence = detect(Path::new(input));
    compile_with(options, media, &sequence).args_lossy()
}

pub fn compile_with(
    options: &EncodeOptions,
    media: &MediaInfo,
    sequence: &SequenceInfo,
) -> EncodePlan {
    compile(options, media, sequence).expect("options should compile")
}

/// Create empty numbered frames `<prefix><n:0width>.png` for n in 1..=count
pub fn write_frames(dir: &Path, prefix: &str, width: usize, count: u32) -> PathBuf {
    for n in 1..=count {
        std::fs::write(
            dir.join(format!("{}{:0width$}.png", prefix, n, width = width)),
            b"",
        )
        .unwrap();
    }
    dir.join(format!("{}{:0width$}.png", prefix, 1, width = width))
}

/// Prober returning a fixed answer
pub struct StaticProber(pub Result<MediaInfo, ProbeError>);

impl Prober for StaticProber {
    fn probe(&self, _path: &Path) -> Result<MediaInfo, ProbeError> {
        self.0.clone()
    }
}

/// Plan that runs `body` under `/bin/sh -c`
pub fn shell_plan(body: &str, total_frames: u64) -> EncodePlan {
    EncodePlan::from_args(["-c", body], total_frames)
}

/// Receive events until (and including) the terminal one
pub fn events_until_terminal(rx: &Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("job event within 10s");
        let done = event.is_terminal();
        events.push(event);
        if done {
            return events;
        }
    }
}

pub fn progress_frames(events: &[JobEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Progress(frame) => Some(*frame),
            _ => None,
        })
        .collect()
}
