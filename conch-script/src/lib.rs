//! # Conch Script
//!
//! The interpreter layer behind script consoles.
//! A console never talks to a scripting engine directly: it asks an
//! [`InterpreterProvider`] for an [`Interpreter`] by language id, wires the
//! interpreter's stdout/stderr into line-buffered sinks, and evaluates one
//! submission at a time.

pub mod binding;
pub mod highlight;
#[cfg(feature = "lua")]
pub mod lua;
pub mod sink;

pub use binding::Binding;
pub use highlight::{Highlighter, TokenKind, TokenSpan, highlighter_for};
pub use sink::{LineSink, SharedSink};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Errors raised by the interpreter layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("no interpreter is available for '{0}' on this platform")]
    Unavailable(String),

    #[error("{0}")]
    Syntax(String),

    #[error("{0}")]
    Runtime(String),

    #[error("evaluation interrupted")]
    Interrupted,

    #[error("cannot bind '{name}': {reason}")]
    Binding { name: String, reason: String },
}

/// Which captured stream a sink is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

// ════════════════════════════════════════════════════════════════════
// Cooperative interruption
// ════════════════════════════════════════════════════════════════════

/// A thread-safe request flag checked by a running evaluation.
///
/// Tripping the handle does not stop anything by itself: the interpreter
/// polls it at instruction checkpoints and aborts the evaluation with
/// [`ScriptError::Interrupted`].
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ════════════════════════════════════════════════════════════════════
// Interpreter contract
// ════════════════════════════════════════════════════════════════════

/// An in-process script engine with persistent global bindings.
///
/// Implementations are used from a single thread and need no internal
/// locking.
pub trait Interpreter {
    /// Language id this interpreter was created for, e.g. `"lua"`.
    fn language(&self) -> &str;

    /// Redirects one of the captured streams. Output written before an
    /// emitter is installed is discarded.
    fn set_output(&mut self, stream: OutputStream, emit: Box<dyn FnMut(String)>);

    /// Sets a global binding, replacing any previous value.
    fn bind(&mut self, name: &str, value: Binding) -> Result<(), ScriptError>;

    /// Reads a global binding back. `None` when the name is unbound.
    fn binding(&self, name: &str) -> Option<Binding>;

    /// Evaluates `code` and renders a non-nil result as text.
    fn eval(&mut self, code: &str) -> Result<Option<String>, ScriptError>;

    /// Emits any partial line still pending in the stdout/stderr sinks.
    fn flush(&mut self);

    /// Handle that aborts a running evaluation, when the engine supports it.
    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        None
    }
}

/// Builds interpreters by language id.
pub trait InterpreterProvider {
    fn create(&self, language: &str) -> Result<Box<dyn Interpreter>, ScriptError>;
}

pub type InterpreterFactory = Box<dyn Fn() -> Result<Box<dyn Interpreter>, ScriptError>>;

/// The default [`InterpreterProvider`]: a table of factories keyed by
/// lower-case language id.
#[derive(Default)]
pub struct InterpreterRegistry {
    factories: BTreeMap<String, InterpreterFactory>,
}

impl std::fmt::Debug for InterpreterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

impl InterpreterRegistry {
    /// An empty registry; every language is unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every engine compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "lua")]
        registry.register("lua", || {
            let interpreter = lua::LuaInterpreter::new()?;
            Ok(Box::new(interpreter) as Box<dyn Interpreter>)
        });

        registry
    }

    pub fn register<F>(&mut self, language: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn Interpreter>, ScriptError> + 'static,
    {
        self.factories
            .insert(language.to_lowercase(), Box::new(factory));
    }

    pub fn languages(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn supports(&self, language: &str) -> bool {
        self.factories.contains_key(&language.to_lowercase())
    }
}

impl InterpreterProvider for InterpreterRegistry {
    fn create(&self, language: &str) -> Result<Box<dyn Interpreter>, ScriptError> {
        match self.factories.get(&language.to_lowercase()) {
            Some(factory) => factory(),
            None => {
                tracing::warn!(%language, "no interpreter registered");
                Err(ScriptError::Unavailable(language.to_string()))
            }
        }
    }
}
