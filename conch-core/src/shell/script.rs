//! Script shell: evaluates submissions in a persistent interpreter.

use std::rc::Rc;

use conch_script::InterpreterProvider;

use super::{Shell, ShellConsole};
use crate::backend::{InterpreterBackend, InterpreterSession};
use crate::console::Console;
use crate::host::HostContext;
use crate::job::JobOutcome;
use crate::style::StyleTag;

#[derive(Debug)]
pub struct ScriptShell {
    backend: InterpreterBackend,
    language: String,
}

impl ScriptShell {
    /// The session's output goes to `console`'s queue.
    pub fn new(
        console: &Console,
        provider: Rc<dyn InterpreterProvider>,
        language: &str,
        host: Rc<dyn HostContext>,
    ) -> Self {
        let session = InterpreterSession::new(provider, language, console.handle());
        Self {
            backend: InterpreterBackend::new(session, host),
            language: language.to_lowercase(),
        }
    }

    /// Builds a ready-to-use script console.
    pub fn console(
        console: Console,
        provider: Rc<dyn InterpreterProvider>,
        language: &str,
        host: Rc<dyn HostContext>,
    ) -> ShellConsole {
        let shell = ScriptShell::new(&console, provider, language, host);
        ShellConsole::new(console, Box::new(shell))
    }

    pub fn backend(&self) -> &InterpreterBackend {
        &self.backend
    }

    fn display_language(&self) -> String {
        let mut chars = self.language.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Shell for ScriptShell {
    fn name(&self) -> String {
        self.display_language()
    }

    fn language(&self) -> Option<&str> {
        Some(&self.language)
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.language.to_uppercase())
    }

    fn usage_note(&self) -> Option<String> {
        Some(format!(
            "{} shell. `host` and `document` describe the editor; print() writes to stdout, eprint() to stderr.",
            self.display_language()
        ))
    }

    fn submit(&mut self, console: &mut Console, text: &str) {
        if let Err(e) = console.start(&mut self.backend, text.to_string()) {
            console.append(&e.to_string(), StyleTag::Exception);
            self.show_prompt(console);
        }
    }

    fn finished(&mut self, console: &mut Console, outcome: &JobOutcome) {
        if let JobOutcome::Interrupted = outcome {
            console.append("Evaluation interrupted", StyleTag::Exception);
        }
        self.show_prompt(console);
    }
}
