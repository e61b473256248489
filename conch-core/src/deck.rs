//! Several shell consoles with one of them primary.

use crate::editor::{EditOutcome, Gesture};
use crate::shell::ShellConsole;
use crate::theme::Theme;

#[derive(Debug, Default)]
pub struct ConsoleDeck {
    consoles: Vec<ShellConsole>,
    primary: usize,
}

impl ConsoleDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a console and returns its index. The first console added
    /// becomes primary.
    pub fn push(&mut self, console: ShellConsole) -> usize {
        self.consoles.push(console);
        self.consoles.len() - 1
    }

    pub fn len(&self) -> usize {
        self.consoles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consoles.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.consoles.iter().map(ShellConsole::name).collect()
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn primary(&self) -> Option<&ShellConsole> {
        self.consoles.get(self.primary)
    }

    pub fn primary_mut(&mut self) -> Option<&mut ShellConsole> {
        self.consoles.get_mut(self.primary)
    }

    pub fn get(&self, index: usize) -> Option<&ShellConsole> {
        self.consoles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ShellConsole> {
        self.consoles.get_mut(index)
    }

    /// Makes `index` primary. Consoles keep their buffers and sessions.
    pub fn set_primary(&mut self, index: usize) -> bool {
        if index >= self.consoles.len() {
            return false;
        }
        if index != self.primary {
            tracing::debug!(from = self.primary, to = index, "switching primary console");
        }
        self.primary = index;
        true
    }

    /// Cycles to the next console.
    pub fn switch(&mut self) -> usize {
        if !self.consoles.is_empty() {
            self.set_primary((self.primary + 1) % self.consoles.len());
        }
        self.primary
    }

    /// Sends a gesture to the primary console.
    pub fn gesture(&mut self, gesture: Gesture) -> Option<EditOutcome> {
        self.primary_mut().map(|console| console.gesture(gesture))
    }

    pub fn clear_all(&mut self) {
        for console in &mut self.consoles {
            console.clear();
        }
    }

    pub fn apply_theme(&mut self, theme: &Theme) {
        for console in &mut self.consoles {
            console.console_mut().apply_theme(theme.clone());
        }
    }

    /// Pumps every console, including hidden ones, so background jobs keep
    /// streaming. Returns the total number of finished jobs.
    pub fn pump_all(&mut self) -> usize {
        self.consoles.iter_mut().map(ShellConsole::pump).sum()
    }
}
