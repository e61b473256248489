//! A single console: buffer, input controller, job controller, theme and
//! task queue, owned by one thread.

use conch_script::{Highlighter, highlighter_for};

use crate::backend::Backend;
use crate::buffer::ConsoleBuffer;
use crate::config::ConsoleConfig;
use crate::editor::{self, EditOutcome, Gesture, InputController};
use crate::job::{JobController, JobId, JobOutcome, StartError};
use crate::queue::{ConsoleHandle, ConsoleTask, TaskReceiver, task_queue};
use crate::style::{StyleTag, TextStyle};
use crate::theme::{Theme, ThemeProvider};

pub type SubmitListener = Box<dyn FnMut(&str)>;

pub struct Console {
    buffer: ConsoleBuffer,
    editor: InputController,
    jobs: JobController,
    theme: Theme,
    handle: ConsoleHandle,
    tasks: TaskReceiver,
    highlighter: Option<Box<dyn Highlighter>>,
    highlight_input: bool,
    submit_listeners: Vec<SubmitListener>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("len", &self.buffer.len())
            .field("boundary", &self.buffer.boundary())
            .field("running", &self.jobs.is_running())
            .field("theme", &self.theme.name())
            .finish_non_exhaustive()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(&ConsoleConfig::default())
    }
}

impl Console {
    pub fn new(config: &ConsoleConfig) -> Self {
        let (handle, tasks) = task_queue();
        Self {
            buffer: ConsoleBuffer::new(config.max_lines),
            editor: InputController::new(config.history_size),
            jobs: JobController::new(),
            theme: config.theme(),
            handle,
            tasks,
            highlighter: None,
            highlight_input: config.syntax_highlight_input,
            submit_listeners: Vec::new(),
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Accessors
    // ────────────────────────────────────────────────────────────────

    pub fn buffer(&self) -> &ConsoleBuffer {
        &self.buffer
    }

    pub fn editor(&self) -> &InputController {
        &self.editor
    }

    pub fn jobs(&self) -> &JobController {
        &self.jobs
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// A `Send` handle for posting output from other threads.
    pub fn handle(&self) -> ConsoleHandle {
        self.handle.clone()
    }

    pub fn current_input(&self) -> Option<String> {
        self.buffer.current_input()
    }

    pub fn is_running(&self) -> bool {
        self.jobs.is_running()
    }

    // ────────────────────────────────────────────────────────────────
    // Output
    // ────────────────────────────────────────────────────────────────

    /// Appends a line on the owning thread. Off-thread producers use
    /// [`Console::handle`] instead.
    pub fn append(&mut self, text: &str, tag: StyleTag) {
        let style = self.theme.resolve(TextStyle::new(tag));
        self.buffer.append(text, style);
        self.editor.move_to_end(&self.buffer);
    }

    pub fn append_raw(&mut self, text: &str, tag: StyleTag) {
        let style = self.theme.resolve(TextStyle::new(tag));
        self.buffer.append_raw(text, style);
        if tag == StyleTag::Stdin {
            self.refresh_input_styles();
        }
        self.editor.move_to_end(&self.buffer);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.editor.move_to_end(&self.buffer);
    }

    /// Applies every queued task in submission order. Returns the outcomes
    /// of jobs retired along the way.
    pub fn pump(&mut self) -> Vec<JobOutcome> {
        let mut finished = Vec::new();
        while let Ok(task) = self.tasks.try_recv() {
            match task {
                ConsoleTask::Append { text, tag, newline } => {
                    if newline {
                        self.append(&text, tag);
                    } else {
                        self.append_raw(&text, tag);
                    }
                }
                ConsoleTask::Finished { job, outcome } => {
                    if self.retire(job) {
                        finished.push(outcome);
                    }
                }
            }
        }
        finished
    }

    fn retire(&mut self, job: JobId) -> bool {
        let retired = self.jobs.finish(job).is_some();
        if retired {
            self.editor.set_read_only(false);
        }
        retired
    }

    // ────────────────────────────────────────────────────────────────
    // Jobs
    // ────────────────────────────────────────────────────────────────

    /// Starts a job; the console is read-only until its terminal outcome
    /// is pumped.
    pub fn start<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        request: B::Request,
    ) -> Result<JobId, StartError> {
        let id = self.jobs.start(backend, request, &self.handle)?;
        self.editor.set_read_only(true);
        Ok(id)
    }

    /// Forwards a stop request to the active job.
    pub fn stop(&mut self) -> bool {
        self.jobs.stop()
    }

    // ────────────────────────────────────────────────────────────────
    // Input
    // ────────────────────────────────────────────────────────────────

    pub fn on_submit(&mut self, listener: impl FnMut(&str) + 'static) {
        self.submit_listeners.push(Box::new(listener));
    }

    pub(crate) fn notify_submit(&mut self, text: &str) {
        for listener in &mut self.submit_listeners {
            listener(text);
        }
    }

    /// Runs one edit gesture through the input controller.
    pub fn apply_gesture(&mut self, gesture: Gesture) -> EditOutcome {
        let outcome = self.editor.apply(&mut self.buffer, gesture);
        if outcome == EditOutcome::Applied {
            self.refresh_input_styles();
        }
        outcome
    }

    pub(crate) fn editor_mut(&mut self) -> (&mut InputController, &mut ConsoleBuffer) {
        (&mut self.editor, &mut self.buffer)
    }

    // ────────────────────────────────────────────────────────────────
    // Styling
    // ────────────────────────────────────────────────────────────────

    /// Selects the input highlighter by language id (`None` for plain).
    pub fn set_language(&mut self, language: Option<&str>) {
        self.highlighter = language.and_then(highlighter_for);
        self.refresh_input_styles();
    }

    pub fn set_highlight_input(&mut self, enabled: bool) {
        self.highlight_input = enabled;
        self.refresh_input_styles();
    }

    pub fn highlight_input(&self) -> bool {
        self.highlight_input
    }

    pub fn apply_theme(&mut self, theme: Theme) {
        tracing::debug!(theme = ?theme.name(), "applying theme");
        self.theme = theme;
        self.buffer.apply_theme(&self.theme);
    }

    pub fn refresh_input_styles(&mut self) {
        let highlighter = if self.highlight_input {
            self.highlighter.as_deref()
        } else {
            None
        };
        editor::restyle_input(&mut self.buffer, highlighter, &self.theme);
    }
}
