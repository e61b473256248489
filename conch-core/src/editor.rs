//! Input editor controller.
//!
//! Translates edit gestures into buffer mutations while keeping history
//! (everything before the boundary) untouchable. A rejected gesture never
//! fails loudly: it comes back as [`EditOutcome::Rejected`] and the host
//! turns that into a beep or flash.

use conch_script::Highlighter;

use crate::buffer::ConsoleBuffer;
use crate::history::CommandHistory;
use crate::style::{StyleTag, TextStyle};
use crate::theme::ThemeProvider;

/// Caret plus anchor. The selection is empty when `dot == mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Selection {
    pub dot: usize,
    pub mark: usize,
}

impl Selection {
    pub fn caret(offset: usize) -> Self {
        Self {
            dot: offset,
            mark: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.dot.min(self.mark)
    }

    pub fn end(&self) -> usize {
        self.dot.max(self.mark)
    }

    pub fn is_empty(&self) -> bool {
        self.dot == self.mark
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// Typing or paste.
    Insert(String),
    Backspace,
    DeletePreviousWord,
    Delete,
    Home,
    ShiftHome,
    End,
    Left,
    Right,
    SelectAll,
    Submit,
    HistoryPrevious,
    HistoryNext,
    /// Host-driven caret placement (mouse click).
    MoveTo(usize),
    /// Filename completion; handled by shells that support it.
    Complete,
}

impl Gesture {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Gesture::Home
                | Gesture::ShiftHome
                | Gesture::End
                | Gesture::Left
                | Gesture::Right
                | Gesture::SelectAll
                | Gesture::MoveTo(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The edit would touch text before the boundary.
    Protected,
    /// Nothing to delete at the caret.
    NothingToDelete,
    /// History navigation ran off either end.
    HistoryExhausted,
    /// The line cap evicted part of the input; the console waits for the
    /// next output to re-establish a prompt.
    BoundaryLost,
    /// A job is running.
    ReadOnly,
    /// The console has no handler for this gesture.
    Unsupported,
    /// Completion found nothing.
    NoMatches,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Rejected(Rejection),
    /// Trimmed, non-empty input was submitted and recorded in history.
    Submitted(String),
    /// Enter on blank input; the console should redraw its prompt.
    EmptySubmit,
}

#[derive(Debug, Default)]
pub struct InputController {
    selection: Selection,
    history: CommandHistory,
    read_only: bool,
}

impl InputController {
    pub fn new(history_size: usize) -> Self {
        Self {
            selection: Selection::default(),
            history: CommandHistory::new(history_size),
            read_only: false,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn caret(&self) -> usize {
        self.selection.dot
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Collapses the selection to the end of the buffer.
    pub fn move_to_end(&mut self, buffer: &ConsoleBuffer) {
        self.selection = Selection::caret(buffer.len());
    }

    pub fn set_selection(&mut self, buffer: &ConsoleBuffer, selection: Selection) {
        let len = buffer.len();
        self.selection = Selection {
            dot: selection.dot.min(len),
            mark: selection.mark.min(len),
        };
    }

    pub fn apply(&mut self, buffer: &mut ConsoleBuffer, gesture: Gesture) -> EditOutcome {
        if gesture.mutates() {
            if self.read_only {
                return self.reject(Rejection::ReadOnly);
            }
            if buffer.boundary().is_none() {
                self.move_to_end(buffer);
                return self.reject(Rejection::BoundaryLost);
            }
        }
        // Any caret the buffer shrank out from under is pulled back in.
        self.set_selection(buffer, self.selection);
        let boundary = buffer.boundary().unwrap_or(buffer.len());

        match gesture {
            Gesture::Insert(text) => self.insert(buffer, boundary, &text),
            Gesture::Backspace => self.backspace(buffer, boundary, false),
            Gesture::DeletePreviousWord => self.backspace(buffer, boundary, true),
            Gesture::Delete => self.delete(buffer, boundary),
            Gesture::Home => {
                self.home(buffer, boundary, false);
                EditOutcome::Applied
            }
            Gesture::ShiftHome => {
                self.home(buffer, boundary, true);
                EditOutcome::Applied
            }
            Gesture::End => {
                self.move_to_end(buffer);
                EditOutcome::Applied
            }
            Gesture::Left => {
                let to = if self.selection.is_empty() {
                    self.selection.dot.saturating_sub(1)
                } else {
                    self.selection.start()
                };
                self.selection = Selection::caret(to);
                EditOutcome::Applied
            }
            Gesture::Right => {
                let to = if self.selection.is_empty() {
                    (self.selection.dot + 1).min(buffer.len())
                } else {
                    self.selection.end()
                };
                self.selection = Selection::caret(to);
                EditOutcome::Applied
            }
            Gesture::MoveTo(offset) => {
                self.selection = Selection::caret(offset.min(buffer.len()));
                EditOutcome::Applied
            }
            Gesture::SelectAll => {
                let (mark, dot) = if self.selection.start() >= boundary {
                    (boundary, buffer.len())
                } else {
                    (0, buffer.len())
                };
                self.selection = Selection { dot, mark };
                EditOutcome::Applied
            }
            Gesture::Submit => self.submit(buffer, boundary),
            Gesture::HistoryPrevious => self.recall(buffer, -1),
            Gesture::HistoryNext => self.recall(buffer, 1),
            Gesture::Complete => self.reject(Rejection::Unsupported),
        }
    }

    /// The run of `is_part` chars ending at the caret, with its offset.
    /// `None` if the caret is outside the input or text is selected.
    pub fn fragment_before_caret(
        &self,
        buffer: &ConsoleBuffer,
        is_part: impl Fn(char) -> bool,
    ) -> Option<(usize, String)> {
        let boundary = buffer.boundary()?;
        let caret = self.selection.dot;
        if caret < boundary || !self.selection.is_empty() {
            return None;
        }
        let typed: Vec<char> = buffer.slice(boundary..caret).chars().collect();
        let start = typed
            .iter()
            .rposition(|c| !is_part(*c))
            .map(|i| i + 1)
            .unwrap_or(0);
        let fragment: String = typed[start..].iter().collect();
        Some((boundary + start, fragment))
    }

    /// Replaces `range` of the live input with `text` and parks the caret
    /// after it.
    pub fn replace_input_range(
        &mut self,
        buffer: &mut ConsoleBuffer,
        range: std::ops::Range<usize>,
        text: &str,
    ) -> EditOutcome {
        let start = range.start;
        let result = buffer
            .remove(range)
            .and_then(|_| buffer.insert(start, text, TextStyle::new(StyleTag::Stdin)));
        match result {
            Ok(()) => {
                self.selection = Selection::caret(start + text.chars().count());
                EditOutcome::Applied
            }
            Err(e) => {
                tracing::debug!(error = %e, "input replacement refused");
                self.reject(Rejection::Protected)
            }
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Gestures
    // ────────────────────────────────────────────────────────────────

    fn insert(&mut self, buffer: &mut ConsoleBuffer, boundary: usize, text: &str) -> EditOutcome {
        if self.selection.start() < boundary {
            self.move_to_end(buffer);
        }
        let range = self.selection.start()..self.selection.end();
        self.replace_input_range(buffer, range, text)
    }

    fn backspace(&mut self, buffer: &mut ConsoleBuffer, boundary: usize, word: bool) -> EditOutcome {
        let start = self.selection.start();
        if start >= boundary && !self.selection.is_empty() {
            return self.delete_selection(buffer);
        }
        if start <= boundary {
            if start < boundary {
                self.move_to_end(buffer);
                return self.reject(Rejection::Protected);
            }
            return self.reject(Rejection::NothingToDelete);
        }

        let from = if word {
            previous_word_start(&buffer.slice(boundary..start), boundary)
        } else {
            start - 1
        };
        self.remove(buffer, from..start)
    }

    fn delete(&mut self, buffer: &mut ConsoleBuffer, boundary: usize) -> EditOutcome {
        let start = self.selection.start();
        if start < boundary {
            self.move_to_end(buffer);
            return self.reject(Rejection::Protected);
        }
        if !self.selection.is_empty() {
            return self.delete_selection(buffer);
        }
        if start >= buffer.len() {
            return self.reject(Rejection::NothingToDelete);
        }
        self.remove(buffer, start..start + 1)
    }

    fn home(&mut self, buffer: &ConsoleBuffer, boundary: usize, select: bool) {
        let dot = self.selection.dot;
        let target = if dot >= boundary {
            boundary
        } else {
            buffer.line_start(dot)
        };
        self.selection = if select {
            Selection {
                dot: target,
                mark: self.selection.mark,
            }
        } else {
            Selection::caret(target)
        };
    }

    fn submit(&mut self, buffer: &mut ConsoleBuffer, boundary: usize) -> EditOutcome {
        if self.selection.dot < boundary {
            self.move_to_end(buffer);
            return self.reject(Rejection::Protected);
        }

        let raw = buffer.current_input().unwrap_or_default();
        buffer.append_raw("\n", TextStyle::new(StyleTag::Stdin));
        buffer.commit_input();
        self.move_to_end(buffer);

        let text = raw.trim();
        if text.is_empty() {
            self.history.reset_cursor();
            return EditOutcome::EmptySubmit;
        }
        self.history.push(text);
        EditOutcome::Submitted(text.to_string())
    }

    fn recall(&mut self, buffer: &mut ConsoleBuffer, step: i32) -> EditOutcome {
        let entry = if step < 0 {
            self.history.previous().map(str::to_string)
        } else {
            self.history.next().map(str::to_string)
        };
        let Some(entry) = entry else {
            return self.reject(Rejection::HistoryExhausted);
        };
        match buffer.replace_editable_region(&entry) {
            Ok(()) => {
                self.move_to_end(buffer);
                EditOutcome::Applied
            }
            Err(e) => {
                tracing::debug!(error = %e, "history recall refused");
                self.reject(Rejection::Protected)
            }
        }
    }

    fn delete_selection(&mut self, buffer: &mut ConsoleBuffer) -> EditOutcome {
        let range = self.selection.start()..self.selection.end();
        self.remove(buffer, range)
    }

    fn remove(&mut self, buffer: &mut ConsoleBuffer, range: std::ops::Range<usize>) -> EditOutcome {
        let start = range.start;
        match buffer.remove(range) {
            Ok(()) => {
                self.selection = Selection::caret(start);
                EditOutcome::Applied
            }
            Err(e) => {
                tracing::debug!(error = %e, "delete refused");
                self.reject(Rejection::Protected)
            }
        }
    }

    fn reject(&self, why: Rejection) -> EditOutcome {
        tracing::debug!(?why, caret = self.selection.dot, "gesture rejected");
        EditOutcome::Rejected(why)
    }
}

/// Start of the word ending at the end of `typed`; `base` is the absolute
/// offset of `typed[0]`.
fn previous_word_start(typed: &str, base: usize) -> usize {
    let chars: Vec<char> = typed.chars().collect();
    let mut i = chars.len();
    while i > 0 && chars[i - 1].is_whitespace() {
        i -= 1;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    if i > 0 && is_word(chars[i - 1]) {
        while i > 0 && is_word(chars[i - 1]) {
            i -= 1;
        }
    } else {
        while i > 0 && !is_word(chars[i - 1]) && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
    }
    base + i
}

/// Re-tags the live input: highlighted tokens when `highlighter` is given,
/// plain stdin otherwise.
pub fn restyle_input(
    buffer: &mut ConsoleBuffer,
    highlighter: Option<&dyn Highlighter>,
    theme: &dyn ThemeProvider,
) {
    let Some(boundary) = buffer.boundary() else {
        return;
    };
    let end = buffer.len();
    if boundary == end {
        return;
    }
    let plain = theme.resolve(TextStyle::new(StyleTag::Stdin));
    if buffer.restyle_range(boundary..end, plain).is_err() {
        return;
    }
    let Some(highlighter) = highlighter else {
        return;
    };
    let input = buffer.slice(boundary..end);
    for span in highlighter.highlight(&input) {
        let range = boundary + span.start..boundary + span.start + span.len;
        let _ = buffer.restyle_range(range, theme.resolve(TextStyle::token(span.kind)));
    }
}
