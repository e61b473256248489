//! Marshaling onto the owning thread.
//!
//! The buffer is owned by exactly one thread. Backends running elsewhere
//! hold a [`ConsoleHandle`] (or a per-job [`OutputSink`]) and post
//! [`ConsoleTask`]s; the owner applies them in order from `pump()`.

use tokio::sync::mpsc;

use crate::job::{JobError, JobId, JobOutcome, LaunchError};
use crate::style::StyleTag;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleTask {
    Append {
        text: String,
        tag: StyleTag,
        /// Whether a trailing newline is ensured (`append` vs `append_raw`).
        newline: bool,
    },
    Finished {
        job: JobId,
        outcome: JobOutcome,
    },
}

/// Cloneable, `Send` entry point into a console's task queue.
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    tx: mpsc::UnboundedSender<ConsoleTask>,
}

pub type TaskReceiver = mpsc::UnboundedReceiver<ConsoleTask>;

/// Creates a queue: the handle goes to producers, the receiver stays with
/// the console.
pub fn task_queue() -> (ConsoleHandle, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ConsoleHandle { tx }, rx)
}

impl ConsoleHandle {
    /// Posts a task. Returns `false` once the console is gone.
    pub fn post(&self, task: ConsoleTask) -> bool {
        match self.tx.send(task) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("console dropped, task discarded");
                false
            }
        }
    }

    pub fn append(&self, text: impl Into<String>, tag: StyleTag) -> bool {
        self.post(ConsoleTask::Append {
            text: text.into(),
            tag,
            newline: true,
        })
    }

    pub fn append_raw(&self, text: impl Into<String>, tag: StyleTag) -> bool {
        self.post(ConsoleTask::Append {
            text: text.into(),
            tag,
            newline: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The per-job output channel a backend writes through.
///
/// It delivers exactly one terminal outcome: either the one passed to
/// [`OutputSink::finish`], or a failure if the sink is dropped unfinished.
#[derive(Debug)]
pub struct OutputSink {
    handle: ConsoleHandle,
    job: JobId,
    finished: bool,
}

impl OutputSink {
    pub fn new(handle: ConsoleHandle, job: JobId) -> Self {
        Self {
            handle,
            job,
            finished: false,
        }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    /// A plain handle for helper tasks that only stream output.
    pub fn handle(&self) -> ConsoleHandle {
        self.handle.clone()
    }

    pub fn stdout(&self, line: impl Into<String>) {
        self.handle.append(line, StyleTag::Stdout);
    }

    pub fn stderr(&self, line: impl Into<String>) {
        self.handle.append(line, StyleTag::Stderr);
    }

    pub fn emit(&self, line: impl Into<String>, tag: StyleTag) {
        self.handle.append(line, tag);
    }

    /// Consumes a sink whose request was rejected: no job exists, so no
    /// outcome is posted.
    pub fn reject(mut self, error: LaunchError) -> LaunchError {
        self.finished = true;
        error
    }

    pub fn finish(mut self, outcome: JobOutcome) {
        self.finished = true;
        self.handle.post(ConsoleTask::Finished {
            job: self.job,
            outcome,
        });
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(job = %self.job, "backend dropped its sink without finishing");
            self.handle.post(ConsoleTask::Finished {
                job: self.job,
                outcome: JobOutcome::Failed(JobError::Io("backend stopped unexpectedly".into())),
            });
        }
    }
}
