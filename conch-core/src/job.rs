//! Job controller: at most one active backend job per console.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use conch_script::InterruptHandle;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::backend::Backend;
use crate::queue::{ConsoleHandle, OutputSink};

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Interpreter,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

// ════════════════════════════════════════════════════════════════════
// Outcomes & errors
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        exit_code: Option<i32>,
        elapsed: Duration,
    },
    Interrupted,
    Failed(JobError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Evaluation(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("program not found: {0}")]
    ProgramNotFound(String),

    #[error("not an executable file: {}", .0.display())]
    NotExecutable(PathBuf),

    #[error("no such directory: {}", .0.display())]
    NoSuchDirectory(PathBuf),

    #[error("failed to spawn process: {0}")]
    Spawn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("a job is already running")]
    AlreadyRunning,

    #[error(transparent)]
    LaunchRejected(#[from] LaunchError),
}

// ════════════════════════════════════════════════════════════════════
// Cancellation
// ════════════════════════════════════════════════════════════════════

/// How a running job is asked to stop. Handed back by a backend that
/// accepted a request.
#[derive(Debug, Default)]
pub enum JobControl {
    /// Trips an interpreter's instruction hook.
    Interrupt(InterruptHandle),
    /// Wakes the process supervisor, which owns the child.
    Signal(Option<oneshot::Sender<()>>),
    /// Not cancellable.
    #[default]
    Detached,
}

impl JobControl {
    pub fn signal() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (JobControl::Signal(Some(tx)), rx)
    }

    /// Forwards a stop request. Returns `false` if nothing could be
    /// signalled (already signalled, or not cancellable).
    pub fn stop(&mut self) -> bool {
        match self {
            JobControl::Interrupt(handle) => {
                handle.interrupt();
                true
            }
            JobControl::Signal(tx) => match tx.take() {
                Some(tx) => tx.send(()).is_ok(),
                None => false,
            },
            JobControl::Detached => false,
        }
    }
}

#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub kind: BackendKind,
    pub started_at: DateTime<Local>,
    started: Instant,
    control: JobControl,
}

impl Job {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

// ════════════════════════════════════════════════════════════════════
// Controller
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct JobController {
    active: Option<Job>,
}

impl JobController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JobState {
        if self.active.is_some() {
            JobState::Running
        } else {
            JobState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// The stop control is enabled exactly while a job runs.
    pub fn can_stop(&self) -> bool {
        self.is_running()
    }

    pub fn active(&self) -> Option<&Job> {
        self.active.as_ref()
    }

    /// Idle → Running, but only if `backend` accepts `request`.
    pub fn start<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        request: B::Request,
        handle: &ConsoleHandle,
    ) -> Result<JobId, StartError> {
        if let Some(job) = &self.active {
            tracing::debug!(active = %job.id, "start refused, job already running");
            return Err(StartError::AlreadyRunning);
        }

        let id = Uuid::new_v4();
        // Recorded before the backend runs; an in-process backend may
        // finish inside `start`.
        let started = Instant::now();
        let started_at = Local::now();
        let sink = OutputSink::new(handle.clone(), id);

        match backend.start(request, sink) {
            Ok(control) => {
                tracing::info!(job = %id, kind = ?backend.kind(), "job started");
                self.active = Some(Job {
                    id,
                    kind: backend.kind(),
                    started_at,
                    started,
                    control,
                });
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "launch rejected");
                Err(StartError::LaunchRejected(e))
            }
        }
    }

    /// Forwards an interrupt to the active job. Never changes state.
    pub fn stop(&mut self) -> bool {
        match self.active.as_mut() {
            Some(job) => {
                tracing::info!(job = %job.id, "stop requested");
                job.control.stop()
            }
            None => false,
        }
    }

    /// Running → Idle, driven by the backend's terminal callback. Stale ids
    /// are ignored.
    pub fn finish(&mut self, id: JobId) -> Option<Job> {
        match &self.active {
            Some(job) if job.id == id => {
                let job = self.active.take();
                tracing::info!(job = %id, "job finished");
                job
            }
            _ => {
                tracing::debug!(job = %id, "ignoring terminal callback for inactive job");
                None
            }
        }
    }
}
