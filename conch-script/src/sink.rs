//! Line-buffered output capture.
//!
//! Scripts write to stdout/stderr in arbitrary fragments (`io.write("a")`,
//! `print` per value, ...). Forwarding every fragment to the console would
//! create one styled run per fragment, so a sink accumulates text and only
//! emits on a newline or an explicit flush.

use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle used by engine callbacks (e.g. a Lua `print` closure).
pub type SharedSink = Rc<RefCell<LineSink>>;

#[derive(Default)]
pub struct LineSink {
    pending: String,
    emit: Option<Box<dyn FnMut(String)>>,
}

impl std::fmt::Debug for LineSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSink")
            .field("pending", &self.pending)
            .field("attached", &self.emit.is_some())
            .finish()
    }
}

impl LineSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_emitter(emit: impl FnMut(String) + 'static) -> Self {
        Self {
            pending: String::new(),
            emit: Some(Box::new(emit)),
        }
    }

    pub fn shared() -> SharedSink {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn set_emitter(&mut self, emit: Box<dyn FnMut(String)>) {
        self.emit = Some(emit);
    }

    /// Buffers `text`. Everything up to and including the last newline is
    /// emitted as one chunk, without its final `\n`.
    pub fn write(&mut self, text: &str) {
        self.pending.push_str(text);
        let Some(last_newline) = self.pending.rfind('\n') else {
            return;
        };
        let rest = self.pending.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.pending, rest);
        complete.pop();
        self.deliver(complete);
    }

    /// Emits the pending partial line, if any.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        self.deliver(text);
    }

    /// Text written since the last emit.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    fn deliver(&mut self, text: String) {
        match self.emit.as_mut() {
            Some(emit) => emit(text),
            None => tracing::trace!(len = text.len(), "sink not attached, dropping output"),
        }
    }
}
