// Compiled ffmpeg argument lists for realistic inputs

use crate::common::assertions::*;
use crate::common::helpers::*;
use std::path::{Path, PathBuf};
use triada::engine::{
    AudioCodec, Codec, CompileError, PixelFormatChoice, ProresProfile, Resize, ResizeFilter,
    compile, derive_output_name, detect,
};

#[test]
fn test_h264_clip_keeps_its_audio() {
    let options = options_to("/out/clip_x264_q16.mp4");
    let args = compile_args("/media/clip.mov", &options, &yuv_clip(240, 10.0, 1));

    assert_flag_value(&args, "-i", "/media/clip.mov");
    assert_eq!(get_flag_values(&args, "-map"), vec!["0:v:0", "0:a:0"]);
    assert_flag_value(&args, "-c:v", "libx264");
    assert_flag_value(&args, "-crf", "16");
    assert_flag_value(&args, "-preset", "medium");
    assert_flag_value(&args, "-pix_fmt", "yuv420p");
    assert_flag_value(&args, "-movflags", "+faststart");
    assert_flag_value(&args, "-c:a", "aac");
    assert_flag_value(&args, "-b:a", "192k");
    assert_args_not_contain(&args, "scale=");
    assert_args_not_contain(&args, "atrim");
    assert_eq!(args.last().map(String::as_str), Some("/out/clip_x264_q16.mp4"));
    assert_eq!(args[args.len() - 2], "-y");
}

#[test]
fn test_video_without_audio_has_no_audio_arguments() {
    let options = options_to("/out/silent.mp4");
    let args = compile_args("/media/silent.mp4", &options, &yuv_clip(100, 4.0, 0));

    assert_eq!(get_flag_values(&args, "-map"), vec!["0:v:0"]);
    assert_args_not_contain(&args, "-c:a");
    assert_args_not_contain(&args, "-b:a");
    assert_args_not_contain(&args, "0:a");
}

#[test]
fn test_sequence_with_external_audio_is_trimmed_to_video_length() {
    let mut options = options_to("/out/shot.mp4");
    options.frame_rate = 24;
    options.audio.source = Some(PathBuf::from("/audio/score.wav"));

    let args = compile_args("/renders/shot_0001.png", &options, &rgb_sequence(48));

    assert_flag_value(&args, "-f", "image2");
    assert_flag_value(&args, "-framerate", "24");
    assert_eq!(
        get_flag_values(&args, "-i"),
        vec!["/renders/shot_%04d.png", "/audio/score.wav"]
    );
    assert_eq!(get_flag_values(&args, "-map"), vec!["0:v:0", "1:a:0"]);
    assert_flag_value(&args, "-af", "atrim=duration=2");
    assert_flag_value(
        &args,
        "-vf",
        "scale=in_color_matrix=bt601:out_color_matrix=bt709",
    );
    assert_arg_before(&args, "-framerate", "-i");
}

#[test]
fn test_external_audio_overrides_primary_audio() {
    let mut options = options_to("/out/dub.mp4");
    options.audio.source = Some(PathBuf::from("/audio/dub.m4a"));
    options.audio.direct_copy = true;

    let args = compile_args("/media/clip.mov", &options, &yuv_clip(240, 10.0, 2));

    assert_eq!(get_flag_values(&args, "-map"), vec!["0:v:0", "1:a:0"]);
    assert_flag_value(&args, "-c:a", "copy");
    assert_args_not_contain(&args, "-b:a");
    // Stream copy cannot be trimmed
    assert_args_not_contain(&args, "atrim");
}

#[test]
fn test_rgb_source_with_resize_carries_color_matrices() {
    let mut options = options_to("/out/grade.mov");
    options.codec = Codec::ProRes;
    options.quality = 11;
    options.prores_profile = ProresProfile::Hq;
    options.resize = Some(Resize {
        width: 0,
        height: 1080,
        filter: ResizeFilter::Spline,
    });
    let mut media = yuv_clip(96, 4.0, 0);
    media.is_rgb = true;

    let args = compile_args("/media/grade.mov", &options, &media);

    assert_flag_value(
        &args,
        "-vf",
        "scale=-1:1080:flags=spline:in_color_matrix=bt601:out_color_matrix=bt709",
    );
    assert_flag_value(&args, "-c:v", "prores_ks");
    assert_flag_value(&args, "-q:v", "11");
    assert_flag_value(&args, "-profile:v", "3");
    assert_flag_value(&args, "-pix_fmt", "yuv422p10");
    assert_flag_value(&args, "-vendor", "apl0");
    assert_args_not_contain(&args, "-crf");
    assert_args_not_contain(&args, "-preset");
}

#[test]
fn test_every_codec_tags_bt709() {
    for codec in [Codec::H264, Codec::H265, Codec::ProRes] {
        let mut options = options_to("/out/x.mov");
        options.codec = codec;
        let args = compile_args("/media/clip.mov", &options, &yuv_clip(10, 1.0, 0));

        assert_flag_value(&args, "-colorspace", "bt709");
        assert_flag_value(&args, "-color_trc", "bt709");
        assert_flag_value(&args, "-color_primaries", "bt709");
    }
}

#[test]
fn test_pcm_audio_has_no_bitrate() {
    let mut options = options_to("/out/pcm.mov");
    options.audio.codec = AudioCodec::Pcm16;
    let args = compile_args("/media/clip.mov", &options, &yuv_clip(10, 1.0, 1));

    assert_flag_value(&args, "-c:a", "pcm_s16le");
    assert_args_not_contain(&args, "-b:a");
}

#[test]
fn test_contradictory_options_are_rejected() {
    let sequence = detect(Path::new("/renders/shot_0001.png"));

    let mut zero_rate = options_to("/out/shot.mp4");
    zero_rate.frame_rate = 0;
    assert_eq!(
        compile(&zero_rate, &rgb_sequence(10), &sequence),
        Err(CompileError::InvalidFrameRate)
    );

    let mut prores_q = options_to("/out/shot.mov");
    prores_q.codec = Codec::ProRes;
    prores_q.quality = 40;
    assert!(matches!(
        compile(&prores_q, &rgb_sequence(10), &sequence),
        Err(CompileError::QualityOutOfRange { max: 32, .. })
    ));

    let overwrite_input = options_to("/renders/shot_%04d.png");
    assert!(matches!(
        compile(&overwrite_input, &rgb_sequence(10), &sequence),
        Err(CompileError::OutputIsInput(_))
    ));
}

#[test]
fn test_output_names_follow_settings() {
    let sequence = detect(Path::new("/media/interview.mov"));

    let mut options = options_to("");
    options.codec = Codec::H265;
    options.pixel_format = PixelFormatChoice::TenBit420;
    assert_eq!(
        derive_output_name(&options, &sequence),
        "interview_x265_10bit_q16.mp4"
    );

    options.resize = Some(Resize {
        width: 1280,
        height: 720,
        filter: ResizeFilter::Bicubic,
    });
    options.quality = 23;
    assert_eq!(
        derive_output_name(&options, &sequence),
        "interview_1280x720_x265_10bit_q23.mp4"
    );

    options.codec = Codec::ProRes;
    options.prores_profile = ProresProfile::P4444;
    options.quality = 9;
    assert_eq!(
        derive_output_name(&options, &sequence),
        "interview_1280x720_prores_4444_q9.mov"
    );
}
