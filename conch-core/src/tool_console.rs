//! Output pane for configured external tools.

use std::rc::Rc;

use crate::backend::ProcessBackend;
use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::job::{JobId, JobOutcome, StartError};
use crate::shell::system::PROCESS_TERMINATED;
use crate::style::StyleTag;
use crate::theme::Theme;
use crate::tool::Tool;
use crate::host::HostContext;

pub const IDLE_TITLE: &str = "Tool Output";

/// A read-only console that shows one tool run at a time, with a title
/// describing the run's progress.
pub struct ToolConsole {
    console: Console,
    backend: ProcessBackend,
    host: Rc<dyn HostContext>,
    title: String,
    running: Option<String>,
}

impl std::fmt::Debug for ToolConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConsole")
            .field("title", &self.title)
            .field("running", &self.running)
            .field("console", &self.console)
            .finish_non_exhaustive()
    }
}

impl ToolConsole {
    pub fn new(config: &ConsoleConfig, backend: ProcessBackend, host: Rc<dyn HostContext>) -> Self {
        let mut console = Console::new(config);
        console.set_highlight_input(false);
        Self {
            console,
            backend,
            host,
            title: IDLE_TITLE.to_string(),
            running: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// The stop control is enabled only while a tool runs.
    pub fn can_stop(&self) -> bool {
        self.console.jobs().can_stop()
    }

    pub fn is_running(&self) -> bool {
        self.console.is_running()
    }

    /// Launches `tool` against the host's active document. A rejected
    /// launch leaves the pane untouched.
    pub fn run_tool(&mut self, tool: &Tool) -> Result<JobId, StartError> {
        if self.console.is_running() {
            tracing::warn!(tool = %tool.name, "tool already running");
            return Err(StartError::AlreadyRunning);
        }

        let document = self.host.active_document();
        let spec = tool.launch_spec(document.as_ref());
        if let Err(e) = spec.validate() {
            tracing::warn!(tool = %tool.name, error = %e, "tool launch rejected");
            return Err(e.into());
        }

        self.console.clear();
        let id = self.console.start(&mut self.backend, spec)?;
        let started = self
            .console
            .jobs()
            .active()
            .map(|job| job.started_at)
            .unwrap_or_else(chrono::Local::now);
        self.title = format!(
            "Running {} (started {})",
            tool.name,
            started.format("%Y-%m-%d %H:%M:%S")
        );
        self.running = Some(tool.name.clone());
        Ok(id)
    }

    pub fn stop(&mut self) -> bool {
        self.console.stop()
    }

    /// Applies queued output and renders completion. Returns how many runs
    /// finished.
    pub fn pump(&mut self) -> usize {
        let outcomes = self.console.pump();
        for outcome in &outcomes {
            self.finished(outcome);
        }
        outcomes.len()
    }

    pub fn apply_theme(&mut self, theme: Theme) {
        self.console.apply_theme(theme);
    }

    fn finished(&mut self, outcome: &JobOutcome) {
        let name = self.running.take().unwrap_or_default();
        match outcome {
            JobOutcome::Completed { exit_code, elapsed } => {
                let rc = exit_code.map_or_else(|| "none".to_string(), |c| c.to_string());
                self.title = format!(
                    "{name} completed with exit code {rc} in {:.2}s",
                    elapsed.as_secs_f32()
                );
                tracing::info!(tool = %name, exit_code = ?exit_code, "tool finished");
            }
            JobOutcome::Interrupted => {
                self.title = format!("{name} was terminated");
                self.console.append(PROCESS_TERMINATED, StyleTag::Exception);
            }
            JobOutcome::Failed(e) => {
                self.title = format!("{name} failed");
                self.console.append(&e.to_string(), StyleTag::Exception);
            }
        }
    }
}
