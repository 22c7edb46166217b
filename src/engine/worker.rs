// Job runner: supervises one encoder process at a time on a background thread

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::core::{EncodeJob, EncodePlan, JobState, ProgressParser, write_debug_log};

/// How often the worker re-checks cancellation while the encoder is silent
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Output lines kept for failure diagnostics
const TAIL_LINES: usize = 20;

/// Upper bound on collecting already-produced output once the encoder has exited
const EXIT_DRAIN: Duration = Duration::from_secs(1);

/// How a running encoder is asked to stop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStrategy {
    /// Write `q` to the encoder's stdin and close it (ffmpeg's interactive quit)
    #[default]
    Keystroke,
    /// SIGINT on Unix; a hard kill elsewhere
    Interrupt,
    /// Hard kill
    Kill,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub program: PathBuf,
    pub stop_strategy: StopStrategy,
    /// Hard-kill an encoder that has not exited this long after a stop request.
    /// `None` waits indefinitely.
    pub stop_grace: Option<Duration>,
    /// Kill the encoder and fail the job after this long
    pub timeout: Option<Duration>,
    /// Append commands and failure output here
    pub debug_log: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            stop_strategy: StopStrategy::default(),
            stop_grace: None,
            timeout: None,
            debug_log: None,
        }
    }
}

/// Cooperative cancellation flag shared between the caller and the worker
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a job ended in `Failed`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("encoder failed ({status})")]
    Exited {
        status: String,
        /// Last lines of merged encoder output
        tail: String,
    },

    #[error("encoder timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("I/O error while supervising encoder: {0}")]
    Io(String),
}

impl JobError {
    /// Captured encoder output, when there is any
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            JobError::Exited { tail, .. } if !tail.is_empty() => Some(tail),
            _ => None,
        }
    }
}

/// Why a job could not be started
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("an encode job is already running")]
    Busy,

    #[error("failed to spawn worker thread: {0}")]
    Thread(String),
}

/// Observer for one job. Exactly one of the terminal callbacks
/// (`on_finished`, `on_failed`, `on_canceled`) is called, and it is called last.
pub trait JobListener: Send {
    /// The encoder process was spawned
    fn on_started(&mut self) {}

    /// Every line of merged encoder output, progress lines included
    fn on_output(&mut self, _line: &str) {}

    /// Frame number parsed from a progress line. Advisory: may go backwards.
    fn on_progress(&mut self, frame: u64);

    fn on_finished(&mut self);

    fn on_failed(&mut self, error: &JobError);

    fn on_canceled(&mut self);
}

/// Channel form of the listener callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started,
    Output(String),
    Progress(u64),
    Finished,
    Failed(JobError),
    Canceled,
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Finished | JobEvent::Failed(_) | JobEvent::Canceled
        )
    }
}

// A closed receiver means nobody is watching; the job still runs to completion
impl JobListener for Sender<JobEvent> {
    fn on_started(&mut self) {
        let _ = self.send(JobEvent::Started);
    }

    fn on_output(&mut self, line: &str) {
        let _ = self.send(JobEvent::Output(line.to_string()));
    }

    fn on_progress(&mut self, frame: u64) {
        let _ = self.send(JobEvent::Progress(frame));
    }

    fn on_finished(&mut self) {
        let _ = self.send(JobEvent::Finished);
    }

    fn on_failed(&mut self, error: &JobError) {
        let _ = self.send(JobEvent::Failed(error.clone()));
    }

    fn on_canceled(&mut self) {
        let _ = self.send(JobEvent::Canceled);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs at most one encode job at a time
#[derive(Debug)]
pub struct JobRunner {
    config: RunnerConfig,
    active: Arc<Mutex<Option<Uuid>>>,
}

impl JobRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Id of the job occupying the runner, if any
    pub fn active_job(&self) -> Option<Uuid> {
        *lock(&self.active)
    }

    pub fn is_busy(&self) -> bool {
        self.active_job().is_some()
    }

    /// Start a compiled plan on a background worker.
    ///
    /// Rejected with [`RunnerError::Busy`] while another job occupies the runner.
    /// Spawn failures of the encoder itself are reported through `listener`.
    pub fn start<L>(&self, plan: EncodePlan, listener: L) -> Result<JobHandle, RunnerError>
    where
        L: JobListener + 'static,
    {
        let mut job = EncodeJob::new(plan.args.clone(), plan.total_frames);
        let id = job.id;

        {
            let mut active = lock(&self.active);
            if active.is_some() {
                return Err(RunnerError::Busy);
            }
            *active = Some(id);
        }

        job.state = JobState::Running;
        let job = Arc::new(Mutex::new(job));
        let token = CancelToken::new();

        let worker = Worker {
            config: self.config.clone(),
            plan,
            job: job.clone(),
            token: token.clone(),
            slot: SlotGuard(self.active.clone()),
        };

        let thread = thread::Builder::new()
            .name(format!("encode-{}", &id.simple().to_string()[..8]))
            .spawn(move || worker.run(listener))
            .map_err(|e| {
                // The closure (and its slot guard) was dropped with the failed spawn
                *lock(&self.active) = None;
                RunnerError::Thread(e.to_string())
            })?;

        Ok(JobHandle {
            id,
            job,
            token,
            thread,
        })
    }
}

/// Caller's view of a started job
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    job: Arc<Mutex<EncodeJob>>,
    token: CancelToken,
    thread: JoinHandle<JobState>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request a stop; the worker applies the configured [`StopStrategy`]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Copy of the job's current state and progress
    pub fn snapshot(&self) -> EncodeJob {
        lock(&self.job).clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and return the terminal state
    pub fn join(self) -> JobState {
        self.thread.join().unwrap_or(JobState::Failed)
    }
}

/// Frees the runner slot when dropped, including when a listener panics
struct SlotGuard(Arc<Mutex<Option<Uuid>>>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        *lock(&self.0) = None;
    }
}

enum Outcome {
    Finished,
    Canceled,
    Failed(JobError),
}

enum Interrupt {
    Canceled,
    TimedOut,
}

/// Forwards encoder output to the listener and keeps the diagnostic tail
#[derive(Default)]
struct OutputLog {
    parser: ProgressParser,
    tail: VecDeque<String>,
}

impl OutputLog {
    fn record<L: JobListener>(&mut self, line: String, job: &Mutex<EncodeJob>, listener: &mut L) {
        if let Some(frame) = self.parser.parse_line(&line) {
            lock(job).last_frame_seen = frame;
            listener.on_progress(frame);
        }
        listener.on_output(&line);
        if self.tail.len() == TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line);
    }

    /// Collect output still in flight after exit. Stops when the pipes close,
    /// when they go quiet for one poll interval, or after [`EXIT_DRAIN`].
    fn drain<L: JobListener>(
        &mut self,
        rx: &mpsc::Receiver<String>,
        job: &Mutex<EncodeJob>,
        listener: &mut L,
    ) {
        let until = Instant::now() + EXIT_DRAIN;
        while Instant::now() < until {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => self.record(line, job, listener),
                Err(_) => break,
            }
        }
    }

    fn tail(&self) -> String {
        self.tail
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Worker {
    config: RunnerConfig,
    plan: EncodePlan,
    job: Arc<Mutex<EncodeJob>>,
    token: CancelToken,
    slot: SlotGuard,
}

impl Worker {
    fn run<L: JobListener>(self, mut listener: L) -> JobState {
        let prior_output = output_mtime(&self.plan.output_path);
        let outcome = self.supervise(&mut listener);

        let state = match &outcome {
            Outcome::Finished => JobState::Finished,
            Outcome::Canceled => JobState::Canceled,
            Outcome::Failed(_) => JobState::Failed,
        };

        if let Outcome::Failed(error) = &outcome {
            warn!(job = %self.id(), error = %error, "encode failed");
            if let Some(log_path) = &self.config.debug_log {
                let details = error.diagnostics().unwrap_or_default();
                write_debug_log(log_path, &format!("✗ {}\n{}", error, details)).ok();
            }
            self.remove_partial_output(prior_output);
        } else {
            info!(job = %self.id(), state = ?state, "encode ended");
        }

        {
            let mut job = lock(&self.job);
            job.state = state;
            if let Outcome::Failed(error) = &outcome {
                job.last_error = Some(error.to_string());
            }
        }

        // Free the slot first so the terminal callback may start the next job
        drop(self.slot);

        match outcome {
            Outcome::Finished => listener.on_finished(),
            Outcome::Canceled => listener.on_canceled(),
            Outcome::Failed(error) => listener.on_failed(&error),
        }

        state
    }

    fn id(&self) -> Uuid {
        lock(&self.job).id
    }

    fn supervise<L: JobListener>(&self, listener: &mut L) -> Outcome {
        let mut cmd = self.plan.to_command(&self.config.program);
        cmd.stdin(match self.config.stop_strategy {
            StopStrategy::Keystroke => Stdio::piped(),
            _ => Stdio::null(),
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let shown = self.plan.format_command(&self.config.program);
        debug!(command = %shown, "spawning encoder");
        if let Some(log_path) = &self.config.debug_log {
            write_debug_log(log_path, &format!("\n=== Encode Job ===\n{}\n", shown)).ok();
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Outcome::Failed(JobError::Spawn {
                    program: self.config.program.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        listener.on_started();

        let (tx, rx) = mpsc::channel();
        let readers = [
            child.stdout.take().map(|out| spawn_reader(out, tx.clone())),
            child.stderr.take().map(|err| spawn_reader(err, tx.clone())),
        ];
        drop(tx);
        if let Some(Err(e)) = readers.into_iter().flatten().find(|r| r.is_err()) {
            let _ = child.kill();
            let _ = child.wait();
            return Outcome::Failed(JobError::Io(e.to_string()));
        }

        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let mut output = OutputLog::default();
        let mut streams_open = true;

        let interrupt = loop {
            if self.token.is_canceled() {
                break Some(Interrupt::Canceled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break Some(Interrupt::TimedOut);
            }

            if streams_open {
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(line) => output.record(line, &self.job, listener),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => streams_open = false,
                }
            } else {
                thread::sleep(POLL_INTERVAL);
            }

            // Exit is decided by the process, not by its pipes: a detached
            // descendant may hold them open long after the encoder is gone
            match child.try_wait() {
                Ok(Some(_)) => break None,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    return Outcome::Failed(JobError::Io(e.to_string()));
                }
            }
        };

        if interrupt.is_none() && streams_open {
            output.drain(&rx, &self.job, listener);
        }

        match interrupt {
            Some(Interrupt::Canceled) => {
                lock(&self.job).state = JobState::Canceling;
                info!(job = %self.id(), strategy = ?self.config.stop_strategy, "stopping encoder");
                request_stop(&mut child, self.config.stop_strategy);
                if let Err(e) = wait_with_grace(&mut child, self.config.stop_grace) {
                    warn!(error = %e, "failed to reap canceled encoder");
                }
                Outcome::Canceled
            }
            Some(Interrupt::TimedOut) => {
                let after = self.config.timeout.unwrap_or_default();
                let _ = child.kill();
                let _ = child.wait();
                Outcome::Failed(JobError::TimedOut { after })
            }
            None => match child.wait() {
                Ok(status) if status.success() => Outcome::Finished,
                Ok(status) => Outcome::Failed(JobError::Exited {
                    status: describe_status(status),
                    tail: output.tail(),
                }),
                Err(e) => Outcome::Failed(JobError::Io(e.to_string())),
            },
        }
    }

    /// Remove an output this job wrote before failing. A file that was already
    /// there and left untouched is kept.
    fn remove_partial_output(&self, prior: Option<SystemTime>) {
        let output = &self.plan.output_path;
        let Some(current) = output_mtime(output) else {
            return;
        };
        if prior == Some(current) {
            return;
        }

        match fs::remove_file(output) {
            Ok(()) => debug!(path = %output.display(), "removed partial output"),
            Err(e) => warn!(path = %output.display(), error = %e, "failed to remove partial output"),
        }
    }
}

fn output_mtime(path: &Path) -> Option<SystemTime> {
    if path.as_os_str().is_empty() {
        return None;
    }
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => status.to_string(),
    }
}

fn request_stop(child: &mut Child, strategy: StopStrategy) {
    match strategy {
        StopStrategy::Keystroke => {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(b"q").and_then(|_| stdin.flush()) {
                    debug!(error = %e, "encoder stdin already closed");
                }
                // Dropping stdin closes it, which also ends interactive reads
            }
        }
        StopStrategy::Interrupt => interrupt(child),
        StopStrategy::Kill => {
            let _ = child.kill();
        }
    }
}

#[cfg(unix)]
fn interrupt(child: &mut Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGINT) {
        debug!(error = %e, "SIGINT delivery failed");
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) {
    let _ = child.kill();
}

/// Wait for exit, hard-killing after `grace` when one is set
fn wait_with_grace(child: &mut Child, grace: Option<Duration>) -> io::Result<ExitStatus> {
    let Some(grace) = grace else {
        return child.wait();
    };

    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!(grace_ms = grace.as_millis() as u64, "encoder ignored stop request; killing");
            let _ = child.kill();
            return child.wait();
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R>(stream: R, tx: Sender<String>) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("encode-output".to_string())
        .spawn(move || split_lines(stream, |line| tx.send(line).is_ok()))
}

/// Split a byte stream into lines on `\n` or `\r`, skipping empty lines.
///
/// Encoders redraw status lines with bare carriage returns, so both count as
/// terminators. Stops early once `emit` returns false.
pub fn split_lines<R: Read>(stream: R, mut emit: impl FnMut(String) -> bool) {
    let mut reader = BufReader::new(stream);
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let buf = match reader.fill_buf() {
            Ok([]) => break,
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };

        let len = buf.len();
        for &byte in buf {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    if !emit(line) {
                        return;
                    }
                }
            } else {
                pending.push(byte);
            }
        }
        reader.consume(len);
    }

    if !pending.is_empty() {
        emit(String::from_utf8_lossy(&pending).into_owned());
    }
}
