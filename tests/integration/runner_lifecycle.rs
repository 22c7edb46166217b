// Job runner driven by stand-in encoders (shell scripts speaking ffmpeg's progress format)
#![cfg(unix)]

use crate::common::helpers::*;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use triada::engine::{
    JobError, JobEvent, JobListener, JobRunner, JobState, RunnerConfig, RunnerError, StopStrategy,
};

fn sh_runner(strategy: StopStrategy) -> JobRunner {
    JobRunner::new(RunnerConfig {
        program: PathBuf::from("/bin/sh"),
        stop_strategy: strategy,
        stop_grace: Some(Duration::from_secs(5)),
        ..RunnerConfig::default()
    })
}

/// Emits `-progress -` blocks for frames 10, 20, 30 plus banner noise on stderr
const FAKE_ENCODE: &str = r#"
echo "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mov':" >&2
for f in 10 20 30; do
  printf 'frame=%s\nfps=24.0\nout_time_us=%s000\nspeed=1.2x\nprogress=continue\n' "$f" "$f"
done
printf 'frame=30\nprogress=end\n'
"#;

/// Records callback names in order
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }
}

impl JobListener for Recorder {
    fn on_started(&mut self) {
        self.push("started".to_string());
    }

    fn on_progress(&mut self, frame: u64) {
        self.push(format!("progress {}", frame));
    }

    fn on_finished(&mut self) {
        self.push("finished".to_string());
    }

    fn on_failed(&mut self, error: &JobError) {
        self.push(format!("failed {}", error));
    }

    fn on_canceled(&mut self) {
        self.push("canceled".to_string());
    }
}

#[test]
fn test_listener_sees_progress_in_order_then_one_terminal_call() {
    let runner = sh_runner(StopStrategy::Keystroke);
    let recorder = Recorder::default();
    let handle = runner
        .start(shell_plan(FAKE_ENCODE, 30), recorder.clone())
        .unwrap();

    assert_eq!(handle.join(), JobState::Finished);
    assert_eq!(
        recorder.calls(),
        vec![
            "started",
            "progress 10",
            "progress 20",
            "progress 30",
            "progress 30",
            "finished"
        ]
    );
}

#[test]
fn test_carriage_return_stats_lines_report_progress() {
    let runner = sh_runner(StopStrategy::Keystroke);
    let (tx, rx) = mpsc::channel();
    let handle = runner
        .start(
            shell_plan(
                r"printf 'frame=   12 fps=24 q=28.0\rframe=   25 fps=24 q=28.0\rframe=   24 fps=24\n' >&2",
                50,
            ),
            tx,
        )
        .unwrap();

    let events = events_until_terminal(&rx);
    // A lower frame number is passed through untouched
    assert_eq!(progress_frames(&events), vec![12, 25, 24]);
    assert_eq!(handle.join(), JobState::Finished);
}

#[test]
fn test_cancel_mid_run_yields_canceled_not_finished() {
    let runner = sh_runner(StopStrategy::Keystroke);
    let (tx, rx) = mpsc::channel();
    let handle = runner
        .start(
            shell_plan(
                "echo frame=1; while read -r key; do [ \"$key\" = q ] && exit 0; done; exit 0",
                100,
            ),
            tx,
        )
        .unwrap();

    loop {
        let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        if event == JobEvent::Progress(1) {
            break;
        }
    }
    handle.cancel();
    assert_eq!(handle.snapshot().last_frame_seen, 1);

    let events = events_until_terminal(&rx);
    let terminals: Vec<&JobEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminals, vec![&JobEvent::Canceled]);
    assert_eq!(handle.join(), JobState::Canceled);
}

#[test]
fn test_spawn_failure_is_reported_not_raised() {
    let runner = JobRunner::new(RunnerConfig {
        program: PathBuf::from("/definitely/not/ffmpeg"),
        ..RunnerConfig::default()
    });
    let recorder = Recorder::default();
    let handle = runner.start(shell_plan("true", 1), recorder.clone()).unwrap();

    assert_eq!(handle.join(), JobState::Failed);
    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("failed failed to start /definitely/not/ffmpeg"));
    assert!(!runner.is_busy());
}

#[test]
fn test_runner_rejects_rather_than_queues() {
    let runner = sh_runner(StopStrategy::Kill);
    let (tx, rx) = mpsc::channel();
    let running = runner.start(shell_plan("exec sleep 30", 1), tx).unwrap();

    let (tx2, rx2) = mpsc::channel();
    assert!(matches!(
        runner.start(shell_plan("echo frame=1", 1), tx2),
        Err(RunnerError::Busy)
    ));
    // The rejected job never ran
    assert!(rx2.recv_timeout(Duration::from_millis(300)).is_err());

    running.cancel();
    assert_eq!(events_until_terminal(&rx).pop(), Some(JobEvent::Canceled));
    assert_eq!(running.join(), JobState::Canceled);
    assert!(!runner.is_busy());
}

#[test]
fn test_independent_runners_do_not_share_a_slot() {
    let first = sh_runner(StopStrategy::Kill);
    let second = sh_runner(StopStrategy::Kill);

    let (tx1, rx1) = mpsc::channel();
    let (tx2, rx2) = mpsc::channel();
    let a = first.start(shell_plan("echo frame=1", 1), tx1).unwrap();
    let b = second.start(shell_plan("echo frame=1", 1), tx2).unwrap();

    assert_eq!(events_until_terminal(&rx1).pop(), Some(JobEvent::Finished));
    assert_eq!(events_until_terminal(&rx2).pop(), Some(JobEvent::Finished));
    a.join();
    b.join();
}
