//! External-process backend.
//!
//! Each accepted launch gets a supervisor task on the host's tokio runtime.
//! The supervisor exclusively owns the child: it waits for exit or a stop
//! signal, kills on stop, drains both output streams and only then posts
//! the terminal outcome. A stop that arrives while the streams are still
//! held open by background members of the process group kills the group.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::Backend;
use crate::job::{BackendKind, JobControl, JobError, JobOutcome, LaunchError};
use crate::queue::{ConsoleHandle, OutputSink};
use crate::style::StyleTag;

/// Everything needed to launch one external program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Inherit the parent environment and add `env` on top (otherwise
    /// `env` replaces it).
    pub append_env: bool,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            append_env: true,
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn append_env(mut self, append: bool) -> Self {
        self.append_env = append;
        self
    }

    /// Checks launch preconditions without spawning anything. Returns the
    /// resolved program path.
    pub fn validate(&self) -> Result<PathBuf, LaunchError> {
        let program = resolve_program(&self.program)?;

        if !program.is_file() {
            return Err(if program.exists() {
                LaunchError::NotExecutable(program)
            } else {
                LaunchError::ProgramNotFound(self.program.clone())
            });
        }
        if !is_executable(&program) {
            return Err(LaunchError::NotExecutable(program));
        }

        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(LaunchError::NoSuchDirectory(dir.clone()));
            }
        }
        Ok(program)
    }

    /// The full command line, for titles and logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn resolve_program(program: &str) -> Result<PathBuf, LaunchError> {
    if program.trim().is_empty() {
        return Err(LaunchError::ProgramNotFound(program.to_string()));
    }
    let has_separator = program.contains('/') || (cfg!(windows) && program.contains('\\'));
    if has_separator {
        return Ok(PathBuf::from(program));
    }
    which::which(program).map_err(|e| {
        tracing::debug!(%program, error = %e, "PATH lookup failed");
        LaunchError::ProgramNotFound(program.to_string())
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ════════════════════════════════════════════════════════════════════
// Backend
// ════════════════════════════════════════════════════════════════════

/// Launches processes on a tokio runtime supplied by the host. Stateless
/// between runs.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    runtime: Handle,
}

impl ProcessBackend {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime of the calling context.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

impl Backend for ProcessBackend {
    type Request = LaunchSpec;

    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    fn start(&mut self, spec: LaunchSpec, sink: OutputSink) -> Result<JobControl, LaunchError> {
        let program = match spec.validate() {
            Ok(program) => program,
            Err(e) => return Err(sink.reject(e)),
        };

        let mut command = Command::new(&program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }
        if !spec.append_env {
            command.env_clear();
        }
        command.envs(&spec.env);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let spawned = {
            let _guard = self.runtime.enter();
            command.spawn()
        };
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return Err(sink.reject(LaunchError::Spawn(e.to_string()))),
        };
        tracing::info!(command = %spec.display(), pid = ?child.id(), "process spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (control, cancel) = JobControl::signal();
        self.runtime
            .spawn(supervise(child, stdout, stderr, cancel, sink, started));
        Ok(control)
    }
}

async fn supervise(
    mut child: Child,
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    mut cancel: oneshot::Receiver<()>,
    sink: OutputSink,
    started: Instant,
) {
    // The group outlives the child while background members hold the pipes.
    let pgid = child.id();
    let readers: Vec<JoinHandle<()>> = [
        stdout.map(|out| tokio::spawn(stream_lines(out, sink.handle(), StyleTag::Stdout))),
        stderr.map(|err| tokio::spawn(stream_lines(err, sink.handle(), StyleTag::Stderr))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut interrupted = false;
    let mut listening = true;
    let status = tokio::select! {
        status = child.wait() => status,
        signal = &mut cancel => {
            listening = false;
            // A dropped sender means the console went away; keep waiting.
            if signal.is_ok() {
                interrupted = true;
                terminate(&mut child, pgid);
            }
            child.wait().await
        }
    };

    let drain = join_readers(readers);
    tokio::pin!(drain);
    if listening {
        tokio::select! {
            () = &mut drain => {}
            signal = &mut cancel => {
                if signal.is_ok() {
                    interrupted = true;
                    tracing::debug!(?pgid, "stop while draining, killing leftover group");
                    kill_group(pgid);
                }
                drain.await;
            }
        }
    } else {
        drain.await;
    }

    let outcome = if interrupted {
        JobOutcome::Interrupted
    } else {
        match status {
            Ok(status) => JobOutcome::Completed {
                exit_code: status.code(),
                elapsed: started.elapsed(),
            },
            Err(e) => {
                tracing::error!(error = %e, "waiting on child failed");
                JobOutcome::Failed(JobError::Io(e.to_string()))
            }
        }
    };
    sink.finish(outcome);
}

async fn join_readers(readers: Vec<JoinHandle<()>>) {
    for reader in readers {
        if let Err(e) = reader.await {
            tracing::error!(error = %e, "output reader task failed");
        }
    }
}

/// Kills the child and, on Unix, its whole process group.
fn terminate(child: &mut Child, pgid: Option<u32>) {
    if kill_group(pgid) {
        return;
    }
    if let Err(e) = child.start_kill() {
        tracing::error!(error = %e, "failed to kill child");
    }
}

/// SIGKILLs the process group led by `pgid`. False when nothing was signalled.
fn kill_group(pgid: Option<u32>) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pid) = pgid.and_then(|pid| i32::try_from(pid).ok()) {
            match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) => return true,
                Err(e) => tracing::warn!(pid, error = %e, "killpg failed"),
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
    false
}

async fn stream_lines<R: AsyncRead + Unpin>(reader: R, handle: ConsoleHandle, tag: StyleTag) {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                handle.append(String::from_utf8_lossy(&line).into_owned(), tag);
            }
            Err(e) => {
                tracing::error!(error = %e, ?tag, "reading child output failed");
                break;
            }
        }
    }
}
