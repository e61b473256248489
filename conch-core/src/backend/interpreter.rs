//! In-process interpreter backend.

use std::rc::Rc;
use std::time::Instant;

use conch_script::{Binding, Interpreter, InterpreterProvider, OutputStream, ScriptError};

use super::Backend;
use crate::host::HostContext;
use crate::job::{BackendKind, JobControl, JobError, JobOutcome, LaunchError};
use crate::queue::{ConsoleHandle, OutputSink};
use crate::style::StyleTag;

/// Global names rebound before every evaluation.
pub const HOST_BINDING: &str = "host";
pub const DOCUMENT_BINDING: &str = "document";

enum SessionState {
    Uninitialized,
    Ready(Box<dyn Interpreter>),
    Failed(String),
}

/// The persistent interpreter owned by one console.
///
/// Built on first use; a failed build is remembered so every later
/// submission reports the same "unavailable" message.
pub struct InterpreterSession {
    provider: Rc<dyn InterpreterProvider>,
    language: String,
    output: ConsoleHandle,
    state: SessionState,
}

impl std::fmt::Debug for InterpreterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready(_) => "ready",
            SessionState::Failed(_) => "failed",
        };
        f.debug_struct("InterpreterSession")
            .field("language", &self.language)
            .field("state", &state)
            .finish()
    }
}

impl InterpreterSession {
    pub fn new(provider: Rc<dyn InterpreterProvider>, language: &str, output: ConsoleHandle) -> Self {
        Self {
            provider,
            language: language.to_lowercase(),
            output,
            state: SessionState::Uninitialized,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.state, SessionState::Uninitialized)
    }

    /// The interpreter, building it on first call.
    pub fn interpreter(&mut self) -> Result<&mut Box<dyn Interpreter>, String> {
        if let SessionState::Uninitialized = self.state {
            self.state = match self.provider.create(&self.language) {
                Ok(mut interp) => {
                    let out = self.output.clone();
                    interp.set_output(
                        OutputStream::Stdout,
                        Box::new(move |text| {
                            out.append(text, StyleTag::Stdout);
                        }),
                    );
                    let err = self.output.clone();
                    interp.set_output(
                        OutputStream::Stderr,
                        Box::new(move |text| {
                            err.append(text, StyleTag::Stderr);
                        }),
                    );
                    tracing::info!(language = %self.language, "interpreter session created");
                    SessionState::Ready(interp)
                }
                Err(e) => {
                    tracing::warn!(language = %self.language, error = %e, "interpreter unavailable");
                    SessionState::Failed(e.to_string())
                }
            };
        }
        match &mut self.state {
            SessionState::Ready(interp) => Ok(interp),
            SessionState::Failed(message) => Err(message.clone()),
            SessionState::Uninitialized => Err(ScriptError::Unavailable(self.language.clone()).to_string()),
        }
    }

    /// Reads a global back, if the session is live.
    pub fn binding(&self, name: &str) -> Option<Binding> {
        match &self.state {
            SessionState::Ready(interp) => interp.binding(name),
            _ => None,
        }
    }
}

pub struct InterpreterBackend {
    session: InterpreterSession,
    host: Rc<dyn HostContext>,
}

impl std::fmt::Debug for InterpreterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterBackend")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl InterpreterBackend {
    pub fn new(session: InterpreterSession, host: Rc<dyn HostContext>) -> Self {
        Self { session, host }
    }

    pub fn session(&self) -> &InterpreterSession {
        &self.session
    }
}

impl Backend for InterpreterBackend {
    type Request = String;

    fn kind(&self) -> BackendKind {
        BackendKind::Interpreter
    }

    /// Evaluates synchronously on the calling thread; the outcome is queued
    /// before this returns.
    fn start(&mut self, code: String, sink: OutputSink) -> Result<JobControl, LaunchError> {
        let started = Instant::now();
        let host = self.host.clone();

        let interp = match self.session.interpreter() {
            Ok(interp) => interp,
            Err(message) => {
                sink.stderr(message.clone());
                sink.finish(JobOutcome::Failed(JobError::Unavailable(message)));
                return Ok(JobControl::Detached);
            }
        };
        let control = interp
            .interrupt_handle()
            .map(JobControl::Interrupt)
            .unwrap_or_default();

        if let Err(e) = rebind_context(host.as_ref(), interp.as_mut()) {
            let message = e.to_string();
            sink.emit(message.clone(), StyleTag::Exception);
            sink.finish(JobOutcome::Failed(JobError::Evaluation(message)));
            return Ok(control);
        }

        let result = interp.eval(&code);
        interp.flush();

        let outcome = match result {
            Ok(value) => {
                if let Some(value) = value {
                    sink.emit(value, StyleTag::Result);
                }
                JobOutcome::Completed {
                    exit_code: None,
                    elapsed: started.elapsed(),
                }
            }
            Err(ScriptError::Interrupted) => JobOutcome::Interrupted,
            Err(ScriptError::Unavailable(language)) => {
                let message = ScriptError::Unavailable(language).to_string();
                sink.stderr(message.clone());
                JobOutcome::Failed(JobError::Unavailable(message))
            }
            Err(e @ ScriptError::Binding { .. }) => {
                let message = e.to_string();
                sink.emit(message.clone(), StyleTag::Exception);
                JobOutcome::Failed(JobError::Evaluation(message))
            }
            Err(ScriptError::Syntax(message) | ScriptError::Runtime(message)) => {
                sink.stderr(message.clone());
                JobOutcome::Failed(JobError::Evaluation(message))
            }
        };
        sink.finish(outcome);
        Ok(control)
    }
}

fn rebind_context(host: &dyn HostContext, interp: &mut dyn Interpreter) -> Result<(), ScriptError> {
    interp.bind(HOST_BINDING, Binding::from(&host.application()))?;
    let document = host
        .active_document()
        .map(|doc| Binding::from(&doc))
        .unwrap_or(Binding::Nil);
    interp.bind(DOCUMENT_BINDING, document)
}
