//! Execution backends.
//!
//! A backend either rejects a request up front (nothing runs, no job is
//! created) or accepts it and later reports exactly one terminal outcome
//! through the [`OutputSink`] it was handed.

pub mod interpreter;
pub mod process;

pub use interpreter::{InterpreterBackend, InterpreterSession};
pub use process::{LaunchSpec, ProcessBackend};

use crate::job::{BackendKind, JobControl, LaunchError};
use crate::queue::OutputSink;

pub trait Backend {
    type Request;

    fn kind(&self) -> BackendKind;

    /// Accepts or rejects `request`. On `Ok`, the sink must eventually
    /// receive a terminal outcome; on `Err`, it is consumed with
    /// [`OutputSink::reject`].
    fn start(&mut self, request: Self::Request, sink: OutputSink) -> Result<JobControl, LaunchError>;
}
