//! Shell consoles: a [`Console`] driven by a command language.

pub mod complete;
pub mod script;
pub mod system;

pub use script::ScriptShell;
pub use system::SystemShell;

use crate::console::Console;
use crate::editor::{EditOutcome, Gesture, Rejection};
use crate::job::JobOutcome;
use crate::style::StyleTag;

/// The language-specific half of a shell console.
pub trait Shell {
    /// Display name, e.g. for a tab label.
    fn name(&self) -> String;

    /// Highlighter id for live input.
    fn language(&self) -> Option<&str>;

    fn prompt(&self) -> String;

    fn usage_note(&self) -> Option<String> {
        None
    }

    /// Handles one trimmed, non-empty submission.
    fn submit(&mut self, console: &mut Console, text: &str);

    /// Called once per retired job.
    fn finished(&mut self, console: &mut Console, outcome: &JobOutcome);

    /// Tab completion.
    fn complete(&mut self, _console: &mut Console) -> EditOutcome {
        EditOutcome::Rejected(Rejection::Unsupported)
    }

    fn show_prompt(&self, console: &mut Console) {
        console.append_raw(&self.prompt(), StyleTag::Prompt);
    }

    /// Usage note followed by a fresh prompt.
    fn greet(&self, console: &mut Console) {
        if let Some(note) = self.usage_note() {
            console.append(&note, StyleTag::Stdin);
        }
        self.show_prompt(console);
    }
}

pub struct ShellConsole {
    console: Console,
    shell: Box<dyn Shell>,
}

impl std::fmt::Debug for ShellConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellConsole")
            .field("shell", &self.shell.name())
            .field("console", &self.console)
            .finish()
    }
}

impl ShellConsole {
    pub fn new(mut console: Console, shell: Box<dyn Shell>) -> Self {
        console.set_language(shell.language());
        shell.greet(&mut console);
        Self { console, shell }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn shell(&self) -> &dyn Shell {
        self.shell.as_ref()
    }

    pub fn name(&self) -> String {
        self.shell.name()
    }

    pub fn is_running(&self) -> bool {
        self.console.is_running()
    }

    /// Routes a gesture. Submissions reach the shell; blank submissions
    /// just get a new prompt.
    pub fn gesture(&mut self, gesture: Gesture) -> EditOutcome {
        if gesture == Gesture::Complete {
            if self.console.editor().is_read_only() {
                return EditOutcome::Rejected(Rejection::ReadOnly);
            }
            return self.shell.complete(&mut self.console);
        }

        let outcome = self.console.apply_gesture(gesture);
        match &outcome {
            EditOutcome::Submitted(text) => {
                tracing::debug!(shell = %self.shell.name(), command = %text, "submit");
                self.console.notify_submit(text);
                self.shell.submit(&mut self.console, text);
                self.pump();
            }
            EditOutcome::EmptySubmit => self.shell.show_prompt(&mut self.console),
            _ => {}
        }
        outcome
    }

    /// Types `text` and presses Enter.
    pub fn submit_text(&mut self, text: &str) -> EditOutcome {
        let typed = self.gesture(Gesture::Insert(text.to_string()));
        if let EditOutcome::Rejected(_) = typed {
            return typed;
        }
        self.gesture(Gesture::Submit)
    }

    /// Drains queued output and hands retired jobs to the shell. Returns
    /// how many jobs finished.
    pub fn pump(&mut self) -> usize {
        let outcomes = self.console.pump();
        for outcome in &outcomes {
            self.shell.finished(&mut self.console, outcome);
        }
        outcomes.len()
    }

    pub fn stop(&mut self) -> bool {
        self.console.stop()
    }

    /// Empties the console and greets again.
    pub fn clear(&mut self) {
        self.console.clear();
        self.shell.greet(&mut self.console);
    }
}
