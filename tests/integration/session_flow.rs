// Input selection through to a compiled plan

use crate::common::assertions::*;
use crate::common::helpers::*;
use std::path::Path;
use triada::engine::{EncodeSession, FfprobeProber, ProbeError, SessionError};

#[test]
fn test_sequence_on_disk_compiles_with_frame_count() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_frames(dir.path(), "plate_v002.", 4, 36);
    std::fs::write(dir.path().join("plate_v002.thumb.png"), b"").unwrap();

    // The sequence path never reaches ffprobe
    let prober = FfprobeProber::new("/nonexistent/ffprobe");
    let mut session = EncodeSession::new();
    let media = session.select_input(&first, &prober).unwrap().clone();
    assert_eq!(media.frame_count, 36);
    assert!(media.is_rgb);

    let mut options = options_to("");
    options.frame_rate = 12;
    options.output_path = session
        .default_output_path(&options, dir.path())
        .unwrap();
    assert_eq!(
        options.output_path,
        dir.path().join("plate_v002_x264_q16.mp4")
    );

    let plan = session.prepare(&options).unwrap();
    assert_eq!(plan.total_frames, 36);
    assert_eq!(plan.duration_s, Some(3.0));

    let args = plan.args_lossy();
    let pattern = dir.path().join("plate_v002.%04d.png");
    assert_flag_value(&args, "-i", &pattern.to_string_lossy());
    assert_flag_value(&args, "-framerate", "12");
}

#[test]
fn test_missing_frames_block_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let prober = FfprobeProber::default();
    let mut session = EncodeSession::new();

    let missing = dir.path().join("shot_0001.png");
    let result = session.select_input(&missing, &prober);
    assert!(matches!(result, Err(ProbeError::EmptySequence { .. })));

    let options = options_to("/out/shot.mp4");
    assert!(matches!(
        session.prepare(&options),
        Err(SessionError::Probe(ProbeError::EmptySequence { .. }))
    ));
}

#[test]
fn test_regular_file_uses_prober_result() {
    let prober = StaticProber(Ok(yuv_clip(300, 12.5, 1)));
    let mut session = EncodeSession::new();
    session
        .select_input(Path::new("/media/take3.mxf"), &prober)
        .unwrap();

    let sequence = &session.selection().unwrap().sequence;
    assert!(!sequence.is_sequence);
    assert_eq!(sequence.base_name, "take3");

    let plan = session.prepare(&options_to("/out/take3.mp4")).unwrap();
    assert_eq!(plan.total_frames, 300);
    assert_eq!(plan.duration_s, Some(12.5));
    assert_eq!(
        get_flag_values(&plan.args_lossy(), "-map"),
        vec!["0:v:0", "0:a:0"]
    );
}

#[test]
fn test_unsupported_extension_is_a_regular_file() {
    let prober = StaticProber(Err(ProbeError::NoStreams));
    let mut session = EncodeSession::new();
    let _ = session.select_input("/renders/render_0001.exr", &prober);

    let selection = session.selection().unwrap();
    assert!(!selection.sequence.is_sequence);
    assert_eq!(selection.sequence.base_name, "render_0001");
}
