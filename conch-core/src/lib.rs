//! # Conch Core
//!
//! An embeddable interactive console: a styled text buffer whose tail is a
//! live, protected input line, driven either by an in-process interpreter
//! or by external processes.
//!
//! A [`Console`] is owned by a single thread. Work that happens elsewhere
//! (process readers, supervisors) reaches it through a [`ConsoleHandle`]
//! and is applied in order by [`Console::pump`].

pub mod backend;
pub mod buffer;
pub mod config;
pub mod console;
pub mod deck;
pub mod editor;
pub mod history;
pub mod host;
pub mod job;
pub mod queue;
pub mod shell;
pub mod style;
pub mod theme;
pub mod tool;
pub mod tool_console;

pub use backend::{Backend, InterpreterBackend, InterpreterSession, LaunchSpec, ProcessBackend};
pub use buffer::{BufferError, ConsoleBuffer};
pub use config::{ConfigError, ConsoleConfig};
pub use console::Console;
pub use deck::ConsoleDeck;
pub use editor::{EditOutcome, Gesture, InputController, Rejection};
pub use history::CommandHistory;
pub use host::{DetachedHost, DocumentInfo, HostContext, HostInfo};
pub use job::{JobController, JobError, JobId, JobOutcome, JobState, LaunchError, StartError};
pub use queue::{ConsoleHandle, ConsoleTask, OutputSink};
pub use shell::{ScriptShell, Shell, ShellConsole, SystemShell};
pub use style::{Rgb, StyleTag, TextStyle};
pub use theme::{Theme, ThemeName, ThemeProvider};
pub use tool::Tool;
pub use tool_console::ToolConsole;
