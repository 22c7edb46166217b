use crate::cli::{Cli, Commands, EncodeArgs};
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};
use triada::config::Config;
use triada::engine::{
    self, CancelToken, EncodePlan, EncodeSession, FfprobeProber, JobEvent, JobRunner, JobState,
};

/// Exit code for an encode stopped by the user
const EXIT_CANCELED: i32 = 130;

pub fn run(cli: Cli, config: Config) {
    let result = match cli.command {
        Commands::CheckFfmpeg => handle_check_ffmpeg(&config),
        Commands::Probe { file, json } => handle_probe(&config, file, json),
        Commands::DryRun(args) => handle_dry_run(&config, &args),
        Commands::Encode(args) => match handle_encode(&config, &args) {
            Ok(JobState::Finished) => Ok(()),
            Ok(JobState::Canceled) => process::exit(EXIT_CANCELED),
            Ok(_) => process::exit(1),
            Err(e) => Err(e),
        },
        Commands::InitConfig => {
            handle_init_config();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn handle_check_ffmpeg(config: &Config) -> Result<()> {
    let version = engine::ffmpeg_version(&config.encoder.ffmpeg_path)?;
    println!("ffmpeg found: {}", version);
    let probe_version = engine::ffprobe_version(&config.encoder.ffprobe_path)?;
    println!("ffprobe found: {}", probe_version);
    Ok(())
}

fn handle_probe(config: &Config, file: PathBuf, json: bool) -> Result<()> {
    let prober = FfprobeProber::new(&config.encoder.ffprobe_path);
    let mut session = EncodeSession::new();
    let result = session.select_input(&file, &prober).cloned();
    let selection = session
        .selection()
        .context("Input selection was not recorded")?;

    if json {
        let report = serde_json::json!({
            "input": selection.path,
            "sequence": selection.sequence,
            "media": result.as_ref().ok(),
            "error": result.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return result.map(|_| ()).map_err(Into::into);
    }

    let media = result.with_context(|| format!("Failed to probe {}", file.display()))?;
    if selection.sequence.is_sequence {
        println!(
            "Image sequence: {}",
            selection.sequence.pattern_path.display()
        );
    }
    println!("Base name: {}", selection.sequence.base_name);
    println!("Frames: {}", media.frame_count);
    match media.duration {
        Some(duration) => println!("Duration: {:.2} seconds", duration),
        None => println!("Duration: from frame rate"),
    }
    println!("Audio streams: {}", media.audio_stream_count);
    println!("Color model: {}", if media.is_rgb { "RGB" } else { "YUV" });
    Ok(())
}

/// Probe the input and compile the plan for these arguments
fn build_plan(config: &Config, args: &EncodeArgs) -> Result<EncodePlan> {
    let prober = FfprobeProber::new(&config.encoder.ffprobe_path);
    let mut session = EncodeSession::new();
    session
        .select_input(&args.input, &prober)
        .with_context(|| format!("Cannot encode {}", args.input.display()))?;

    let mut options = args.to_options(&config.defaults);
    if options.output_path.as_os_str().is_empty() {
        let dir = args.output_dir(&config.defaults);
        options.output_path = session
            .default_output_path(&options, &dir)
            .context("No input selected")?;
    }

    debug!(options = ?options, "compiling encode plan");
    Ok(session.prepare(&options)?)
}

fn handle_dry_run(config: &Config, args: &EncodeArgs) -> Result<()> {
    let plan = build_plan(config, args)?;
    println!("{}", plan.format_command(&config.encoder.ffmpeg_path));
    Ok(())
}

fn handle_encode(config: &Config, args: &EncodeArgs) -> Result<JobState> {
    let plan = build_plan(config, args)?;
    let output = plan.output_path.clone();
    let total_frames = plan.total_frames;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }
    if output.exists() {
        warn!(path = %output.display(), "output exists and will be overwritten");
    }

    let debug_log = if config.logging.debug_log || cfg!(feature = "dev-logging") {
        engine::default_log_path().ok()
    } else {
        None
    };
    let runner = JobRunner::new(config.encoder.runner_config(debug_log));

    let (tx, rx) = mpsc::channel();
    let handle = runner.start(plan, tx)?;
    watch_for_quit(handle.cancel_token());

    println!(
        "Encoding: {} → {}",
        args.input.display(),
        output.display()
    );
    println!("Type q then Enter to stop.");

    for event in rx {
        match event {
            JobEvent::Started => debug!(job = %handle.id(), "encoder started"),
            JobEvent::Output(line) => debug!(target: "triada::encoder", "{}", line),
            JobEvent::Progress(frame) => {
                if total_frames > 0 {
                    print!(
                        "\rProgress: {:.1}% ({}/{} frames)",
                        engine::progress_pct(frame, total_frames),
                        frame,
                        total_frames
                    );
                } else {
                    print!("\rFrame: {}", frame);
                }
                io::stdout().flush().ok();
            }
            JobEvent::Finished => {
                println!();
                println!("✓ Completed: {}", output.display());
                break;
            }
            JobEvent::Failed(error) => {
                println!();
                eprintln!("✗ Encoding failed: {}", error);
                if let Some(details) = error.diagnostics() {
                    eprintln!("{}", details);
                }
                break;
            }
            JobEvent::Canceled => {
                println!();
                println!("Canceled; partial output kept at {}", output.display());
                break;
            }
        }
    }

    Ok(handle.join())
}

/// Cancel the job when the user types `q` and Enter
fn watch_for_quit(token: CancelToken) {
    let spawned = thread::Builder::new()
        .name("quit-watcher".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines().map_while(Result::ok) {
                if line.trim().eq_ignore_ascii_case("q") {
                    token.cancel();
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not watch stdin; the encode cannot be stopped from here");
    }
}

fn handle_init_config() {
    match Config::config_path() {
        Ok(path) if path.exists() => match Config::load_from(&path) {
            Ok(cfg) => {
                println!("Config loaded successfully from {}", path.display());
                println!("{:#?}", cfg);
            }
            Err(e) => {
                eprintln!("Config invalid: {:#}", e);
                process::exit(1);
            }
        },
        Ok(path) => {
            println!("Config missing, creating default...");
            if let Err(err) = Config::default().save_to(&path) {
                eprintln!("Failed to save default config: {:#}", err);
                process::exit(1);
            }
            println!("Default config saved to {}", path.display());
        }
        Err(e) => {
            eprintln!("Config path unknown: {:#}", e);
            process::exit(1);
        }
    }
}
