// Encoding engine - independent of the command-line front end

pub mod core;
pub mod probe;
pub mod session;
pub mod worker;

pub use core::*;
pub use probe::{FfprobeProber, Prober};
pub use session::{EncodeSession, Selection, SessionError};
pub use worker::{
    CancelToken, JobError, JobEvent, JobHandle, JobListener, JobRunner, RunnerConfig,
    RunnerError, StopStrategy,
};
